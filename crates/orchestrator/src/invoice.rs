use chrono::Utc;
use tracing::info;

use tripdesk_core::{airports, compute_gst, BookingId, BookingStatus, TaxInvoice};
use tripdesk_db::repositories::RepositoryError;

use crate::error::BookingError;
use crate::service::BookingOrchestrator;

impl BookingOrchestrator {
    /// Computes and stores the GST invoice for a booked trip, or returns
    /// the invoice already on record. Amounts on an issued invoice are
    /// final: repeat calls never recompute, even if the tax configuration
    /// has changed since.
    pub async fn compute_tax_invoice(
        &self,
        booking_id: &BookingId,
    ) -> Result<TaxInvoice, BookingError> {
        let booking = self
            .repositories
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| BookingError::UnknownBooking { id: booking_id.0.clone() })?;

        if let Some(existing) = self.repositories.invoices.find_by_booking(&booking.id).await? {
            return Ok(existing);
        }

        if booking.status != BookingStatus::Booked {
            return Err(BookingError::InvoiceUnavailable {
                detail: format!(
                    "booking `{}` is {}; invoices are issued for booked trips only",
                    booking.id.0,
                    booking.status.as_str()
                ),
            });
        }
        if booking.is_sample_data() {
            return Err(BookingError::InvoiceUnavailable {
                detail: format!(
                    "booking `{}` was made from sample fare data and carries no real tax liability",
                    booking.id.0
                ),
            });
        }

        // Place of supply follows the origin airport's state. An origin we
        // cannot map is billed as inter-state with the raw code recorded.
        let origin_state = airports::tax_state(&booking.offer.origin);
        let interstate = match origin_state {
            Some(state) => !state.eq_ignore_ascii_case(&self.settings.registered_state),
            None => true,
        };
        let place_of_supply =
            origin_state.map(str::to_string).unwrap_or_else(|| booking.offer.origin.clone());

        let breakdown = compute_gst(booking.amount, self.settings.gst_rate, interstate);
        let invoice = TaxInvoice::from_breakdown(
            booking.id.clone(),
            breakdown,
            booking.amount,
            place_of_supply,
            self.settings.registered_state.clone(),
            Utc::now(),
        );

        let inserted = self.repositories.invoices.create(invoice.clone()).await?;
        if inserted {
            info!(
                event_name = "invoice.issued",
                booking_id = %booking.id.0,
                invoice_id = %invoice.id.0,
                total_gst = %invoice.total_gst,
                interstate,
            );
            return Ok(invoice);
        }

        // Lost the insert race; the stored row wins.
        self.repositories
            .invoices
            .find_by_booking(&booking.id)
            .await?
            .ok_or_else(|| {
                BookingError::Persistence(RepositoryError::Conflict(format!(
                    "invoice for booking `{}` vanished between insert and read",
                    booking.id.0
                )))
            })
    }
}

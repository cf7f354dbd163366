use chrono::Utc;
use tracing::{info, warn};

use tripdesk_core::{BookingId, BookingStatus, TravelerId};

use crate::effects::Notification;
use crate::error::BookingError;
use crate::outcome::CancellationOutcome;
use crate::service::BookingOrchestrator;

impl BookingOrchestrator {
    /// Cancels a booking on behalf of the traveler or an elevated member.
    /// The supplier-side cancellation is best effort: an upstream failure
    /// is logged and the local record still moves to `cancelled`, because
    /// a traveler who asked to cancel must never stay booked locally.
    pub async fn cancel_booking(
        &self,
        booking_id: &BookingId,
        actor_id: &TravelerId,
        reason: Option<String>,
    ) -> Result<CancellationOutcome, BookingError> {
        let now = Utc::now();

        let mut booking = self
            .repositories
            .bookings
            .find_by_id(booking_id)
            .await?
            .ok_or_else(|| BookingError::UnknownBooking { id: booking_id.0.clone() })?;
        let actor = self
            .repositories
            .travelers
            .find_by_id(actor_id)
            .await?
            .ok_or_else(|| BookingError::UnknownTraveler { id: actor_id.0.clone() })?;
        if !actor.active {
            return Err(BookingError::NotAuthorized {
                detail: format!("traveler `{}` is deactivated", actor.id.0),
            });
        }
        if actor.id != booking.traveler_id && !actor.role.is_elevated() {
            return Err(BookingError::NotAuthorized {
                detail: format!(
                    "traveler `{}` can neither cancel their own booking nor act for others",
                    actor.id.0
                ),
            });
        }

        let mut supplier_cancelled = false;
        let mut refund_amount = None;
        if let Some(order_ref) = booking.supplier_order_ref.clone() {
            match self.supplier.cancel(&booking.offer.id, &order_ref).await {
                Ok(outcome) => {
                    supplier_cancelled = outcome.cancelled;
                    refund_amount = outcome.refund_amount;
                }
                Err(cancel_error) => {
                    warn!(
                        event_name = "booking.supplier_cancel_failed",
                        booking_id = %booking.id.0,
                        supplier_order_ref = %order_ref,
                        error = %cancel_error,
                    );
                }
            }
        }

        booking.transition_to(BookingStatus::Cancelled)?;
        booking.updated_at = now;
        self.repositories.bookings.save(booking.clone()).await?;

        if let Some(approval) =
            self.repositories.approvals.find_pending_for_booking(&booking.id).await?
        {
            self.repositories.approvals.expire_if_pending(&approval.id, now).await?;
        }

        info!(
            event_name = "booking.cancelled",
            booking_id = %booking.id.0,
            cancelled_by = %actor.id.0,
            supplier_cancelled,
            reason = reason.as_deref().unwrap_or("none given"),
        );
        self.notifier.notify(Notification::BookingCancelled {
            traveler_id: booking.traveler_id.clone(),
            booking_id: booking.id.clone(),
            refund_amount,
        });

        Ok(CancellationOutcome { booking, supplier_cancelled, refund_amount })
    }
}

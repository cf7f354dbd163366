use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::{error, info};

use tripdesk_core::{AppConfig, Booking, BookingId, Incident, IncidentKind, Traveler};
use tripdesk_db::repositories::{
    ApprovalRepository, BookingRepository, IncidentRepository, InvoiceRepository,
    PolicyRepository, RepositoryError, TravelerRepository,
};
use tripdesk_payment::PaymentGateway;
use tripdesk_supplier::{ConfirmationSource, SupplierConfirmation, SupplierGateway};

use crate::effects::{Notifier, PreferenceSink};
use crate::error::RefundStatus;

/// Copies a supplier confirmation onto the booking. Manual confirmations
/// set the marker that later satisfies the `booked` gate in place of a
/// supplier order reference.
pub(crate) fn apply_confirmation(booking: &mut Booking, confirmation: &SupplierConfirmation) {
    booking.confirmation_code = Some(confirmation.confirmation_code.clone());
    booking.supplier_order_ref = confirmation.supplier_order_ref.clone();
    if confirmation.source == ConfirmationSource::Manual {
        booking.manually_confirmed = true;
    }
}

/// The stores one orchestrator instance works against. Production wiring
/// hands in the SQL implementations; tests hand in the in-memory ones.
#[derive(Clone)]
pub struct Repositories {
    pub bookings: Arc<dyn BookingRepository>,
    pub approvals: Arc<dyn ApprovalRepository>,
    pub policies: Arc<dyn PolicyRepository>,
    pub travelers: Arc<dyn TravelerRepository>,
    pub invoices: Arc<dyn InvoiceRepository>,
    pub incidents: Arc<dyn IncidentRepository>,
}

/// Orchestrator knobs lifted out of [`AppConfig`].
#[derive(Clone)]
pub struct OrchestratorSettings {
    /// Merchant secret for capture-signature verification. Bookings that
    /// arrive with a payment capture fail when this is absent.
    pub payment_key_secret: Option<SecretString>,
    pub gst_rate: Decimal,
    pub registered_state: String,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            payment_key_secret: config.payment.key_secret.clone(),
            gst_rate: config.tax.gst_rate,
            registered_state: config.tax.registered_state.clone(),
        }
    }
}

/// The booking transaction service. One instance owns every seam a booking
/// touches: the stores, the supplier and payment gateways, the notifier and
/// the preference feed. Operations live in sibling modules, one per verb.
pub struct BookingOrchestrator {
    pub(crate) repositories: Repositories,
    pub(crate) supplier: Arc<dyn SupplierGateway>,
    pub(crate) payments: Arc<dyn PaymentGateway>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) preferences: Arc<dyn PreferenceSink>,
    pub(crate) settings: OrchestratorSettings,
}

impl BookingOrchestrator {
    pub fn new(
        repositories: Repositories,
        supplier: Arc<dyn SupplierGateway>,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        preferences: Arc<dyn PreferenceSink>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self { repositories, supplier, payments, notifier, preferences, settings }
    }

    /// Designated approver when set and still active, otherwise the first
    /// active elevated member of the org who is not the requester.
    pub(crate) async fn resolve_approver(
        &self,
        requester: &Traveler,
    ) -> Result<Option<Traveler>, RepositoryError> {
        if let Some(designated_id) = &requester.approver_id {
            if let Some(designated) =
                self.repositories.travelers.find_by_id(designated_id).await?
            {
                if designated.active {
                    return Ok(Some(designated));
                }
            }
        }

        let elevated = self
            .repositories
            .travelers
            .find_active_with_elevated_role(&requester.org_id)
            .await?;
        Ok(elevated.into_iter().find(|candidate| candidate.id != requester.id))
    }

    /// Refunds the captured payment on a booking, if any. A failed refund is
    /// recorded as an incident and reported; it is never retried inline.
    pub(crate) async fn refund_captured_payment(
        &self,
        booking: &Booking,
        cause: &str,
    ) -> RefundStatus {
        let Some(payment) = &booking.payment else {
            return RefundStatus::NotCharged;
        };

        match self.payments.refund(&payment.payment_id, booking.amount).await {
            Ok(receipt) => {
                info!(
                    event_name = "payment.refunded",
                    booking_id = %booking.id.0,
                    payment_id = %payment.payment_id,
                    refund_id = %receipt.refund_id,
                    cause,
                );
                RefundStatus::Refunded
            }
            Err(refund_error) => {
                error!(
                    event_name = "payment.refund_failed",
                    booking_id = %booking.id.0,
                    payment_id = %payment.payment_id,
                    error = %refund_error,
                    cause,
                );
                self.record_incident(
                    IncidentKind::RefundFailed,
                    Some(booking.id.clone()),
                    format!(
                        "refund of {} {} failed during {cause}",
                        booking.amount, booking.currency
                    ),
                    serde_json::json!({
                        "payment_id": payment.payment_id,
                        "order_id": payment.order_id,
                        "error": refund_error.to_string(),
                    }),
                )
                .await;
                RefundStatus::RefundFailed
            }
        }
    }

    /// Append-only operational trail. A failed append is logged, not
    /// propagated.
    pub(crate) async fn record_incident(
        &self,
        kind: IncidentKind,
        booking_id: Option<BookingId>,
        detail: String,
        context: serde_json::Value,
    ) {
        let incident = Incident::new(kind, booking_id, detail, context, Utc::now());
        if let Err(append_error) = self.repositories.incidents.append(incident).await {
            error!(error = %append_error, kind = kind.as_str(), "could not record incident");
        }
    }
}

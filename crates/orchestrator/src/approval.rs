use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use tripdesk_core::{ApprovalId, ApprovalStatus, Booking, BookingStatus, IncidentKind, TravelerId};
use tripdesk_supplier::{generate_confirmation_code, BookingRequest};

use crate::effects::{BookingSignal, Notification};
use crate::error::BookingError;
use crate::service::{apply_confirmation, BookingOrchestrator};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

impl BookingOrchestrator {
    /// Decides a pending approval request. The decision itself is a
    /// compare-and-set against the stored status, so concurrent responders
    /// and double submissions resolve to exactly one winner; everyone else
    /// gets the typed not-pending error.
    pub async fn respond_to_approval(
        &self,
        approval_id: &ApprovalId,
        decision: ApprovalDecision,
        responder_id: &TravelerId,
        reason: Option<String>,
    ) -> Result<Booking, BookingError> {
        let now = Utc::now();

        let approval = self
            .repositories
            .approvals
            .find_by_id(approval_id)
            .await?
            .ok_or_else(|| BookingError::UnknownApproval { id: approval_id.0.clone() })?;
        let mut booking = self
            .repositories
            .bookings
            .find_by_id(&approval.booking_id)
            .await?
            .ok_or_else(|| BookingError::UnknownBooking { id: approval.booking_id.0.clone() })?;

        let responder = self
            .repositories
            .travelers
            .find_by_id(responder_id)
            .await?
            .ok_or_else(|| BookingError::UnknownTraveler { id: responder_id.0.clone() })?;
        if !responder.active {
            return Err(BookingError::NotAuthorized {
                detail: format!("traveler `{}` is deactivated", responder.id.0),
            });
        }
        if responder.id == approval.requester_id {
            return Err(BookingError::NotAuthorized {
                detail: "requesters cannot decide their own approval request".to_string(),
            });
        }
        if responder.id != approval.approver_id && !responder.role.is_elevated() {
            return Err(BookingError::NotAuthorized {
                detail: format!(
                    "traveler `{}` is neither the assigned approver nor an elevated role",
                    responder.id.0
                ),
            });
        }

        if approval.is_overdue(now) {
            self.repositories.approvals.expire_if_pending(&approval.id, now).await?;
            return Err(BookingError::ApprovalExpired {
                id: approval.id.0.clone(),
                expired_at: approval.expires_at,
            });
        }
        if approval.status != ApprovalStatus::Pending {
            return Err(BookingError::NotPending { id: approval.id.0.clone() });
        }

        let target = match decision {
            ApprovalDecision::Approve => ApprovalStatus::Approved,
            ApprovalDecision::Reject => ApprovalStatus::Rejected,
        };
        let won_the_decision = self
            .repositories
            .approvals
            .decide_if_pending(&approval.id, target, &responder.id, reason.clone(), now)
            .await?;
        if !won_the_decision {
            return Err(BookingError::NotPending { id: approval.id.0.clone() });
        }

        match decision {
            ApprovalDecision::Reject => {
                booking.transition_to(BookingStatus::Rejected)?;
                let refund = self.refund_captured_payment(&booking, "approval rejection").await;
                booking.updated_at = now;
                self.repositories.bookings.save(booking.clone()).await?;

                info!(
                    event_name = "booking.rejected",
                    booking_id = %booking.id.0,
                    approval_id = %approval.id.0,
                    decided_by = %responder.id.0,
                    refund = %refund,
                );
                self.notifier.notify(Notification::BookingRejected {
                    traveler_id: booking.traveler_id.clone(),
                    booking_id: booking.id.clone(),
                    reason: reason.unwrap_or_else(|| "no reason given".to_string()),
                    refund,
                });
                Ok(booking)
            }
            ApprovalDecision::Approve => self.book_approved(booking, &approval.id).await,
        }
    }

    /// Books an approved trip from its creation-time snapshot. An approved
    /// booking never falls back to `pending_approval`: when the supplier
    /// leg fails the trip still books under a manually issued code and a
    /// reconciliation flag.
    async fn book_approved(
        &self,
        mut booking: Booking,
        approval_id: &ApprovalId,
    ) -> Result<Booking, BookingError> {
        let contact_email = match self.repositories.travelers.find_by_id(&booking.traveler_id).await?
        {
            Some(requester) => requester.email,
            None => booking.passengers.first().map(|p| p.email.clone()).unwrap_or_default(),
        };
        let supplier_request = BookingRequest {
            offer_id: booking.offer.id.clone(),
            passengers: booking.passengers.clone(),
            contact_email,
        };

        match self.supplier.book(&supplier_request).await {
            Ok(confirmation) => {
                apply_confirmation(&mut booking, &confirmation);
                booking.transition_to(BookingStatus::Booked)?;
            }
            Err(supplier_error) => {
                warn!(
                    event_name = "booking.manual_confirmation_issued",
                    booking_id = %booking.id.0,
                    approval_id = %approval_id.0,
                    error = %supplier_error,
                );
                booking.confirmation_code = Some(generate_confirmation_code());
                booking.manually_confirmed = true;
                booking.needs_reconciliation = true;
                booking.transition_to(BookingStatus::Booked)?;
                self.record_incident(
                    IncidentKind::ManualConfirmationIssued,
                    Some(booking.id.clone()),
                    "supplier booking failed after approval; manual confirmation issued"
                        .to_string(),
                    serde_json::json!({
                        "supplier_error": supplier_error.to_string(),
                        "supplier_status": supplier_error.status(),
                    }),
                )
                .await;
            }
        }

        booking.updated_at = Utc::now();
        if let Err(save_error) = self.repositories.bookings.save(booking.clone()).await {
            // The confirmation is already real on the supplier side, so it
            // is surfaced regardless; operations chases the missing row.
            error!(
                event_name = "booking.save_failed_after_confirmation",
                booking_id = %booking.id.0,
                error = %save_error,
            );
            self.record_incident(
                IncidentKind::DbSaveFailed,
                Some(booking.id.clone()),
                "approved booking could not be persisted after confirmation".to_string(),
                serde_json::json!({
                    "confirmation_code": booking.confirmation_code,
                    "error": save_error.to_string(),
                }),
            )
            .await;
        }

        let confirmation_code = booking.confirmation_code.clone().unwrap_or_default();
        info!(
            event_name = "booking.booked",
            booking_id = %booking.id.0,
            confirmation_code = %confirmation_code,
            manual = booking.manually_confirmed,
        );
        self.preferences.record(BookingSignal::from_booking(&booking));
        self.notifier.notify(Notification::BookingConfirmed {
            traveler_id: booking.traveler_id.clone(),
            booking_id: booking.id.clone(),
            confirmation_code,
            manually_confirmed: booking.manually_confirmed,
        });
        Ok(booking)
    }
}

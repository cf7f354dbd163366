use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use tripdesk_core::{
    evaluate_policy, ApprovalId, ApprovalRequest, ApprovalStatus, Booking, BookingStatus,
    IncidentKind, Offer, Passenger, PaymentRef, PolicyVerdict, TravelerId,
};
use tripdesk_payment::verify_payment_signature;
use tripdesk_supplier::{BookingRequest, SupplierConfirmation, SupplierError};

use crate::effects::{BookingSignal, Notification};
use crate::error::{BookingError, RefundStatus};
use crate::outcome::BookingOutcome;
use crate::service::{apply_confirmation, BookingOrchestrator};

/// A client-side payment capture presented with a booking. The signature is
/// verified against the merchant secret and then discarded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PaymentCapture {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateBookingRequest {
    pub traveler_id: TravelerId,
    /// The priced offer exactly as returned by search. Booked from this
    /// snapshot; never re-fetched.
    pub offer: Offer,
    /// The verdict shown to the traveler at selection time. Re-evaluated
    /// here when the policy has moved on since.
    pub verdict: PolicyVerdict,
    pub passengers: Vec<Passenger>,
    pub payment: Option<PaymentCapture>,
}

impl BookingOrchestrator {
    /// Creates a booking from a selected offer. Compliant, under-threshold
    /// requests book against the supplier immediately; everything else is
    /// parked `pending_approval` behind a single approval request.
    pub async fn create_booking(
        &self,
        request: CreateBookingRequest,
    ) -> Result<BookingOutcome, BookingError> {
        let now = Utc::now();

        if request.offer.is_expired(now) {
            return Err(BookingError::OfferExpired { expired_at: request.offer.expires_at });
        }
        if request.offer.price <= Decimal::ZERO {
            return Err(BookingError::Validation("offer price must be positive".to_string()));
        }
        if request.passengers.is_empty() {
            return Err(BookingError::Validation(
                "at least one passenger is required".to_string(),
            ));
        }

        let traveler = self
            .repositories
            .travelers
            .find_by_id(&request.traveler_id)
            .await?
            .ok_or_else(|| BookingError::UnknownTraveler { id: request.traveler_id.0.clone() })?;
        if !traveler.active {
            return Err(BookingError::InactiveTraveler { id: traveler.id.0 });
        }

        // Signature verification happens before any write. A forged or
        // garbled capture leaves no trace in the stores.
        let payment_ref = match &request.payment {
            Some(capture) => {
                let key_secret = self.settings.payment_key_secret.as_ref().ok_or_else(|| {
                    BookingError::Configuration(
                        "a payment capture was supplied but payment.key_secret is not configured"
                            .to_string(),
                    )
                })?;
                if !verify_payment_signature(
                    &capture.order_id,
                    &capture.payment_id,
                    key_secret,
                    &capture.signature,
                ) {
                    warn!(
                        event_name = "booking.signature_mismatch",
                        order_id = %capture.order_id,
                        traveler_id = %traveler.id.0,
                    );
                    return Err(BookingError::SignatureMismatch);
                }
                Some(PaymentRef {
                    order_id: capture.order_id.clone(),
                    payment_id: capture.payment_id.clone(),
                })
            }
            None => None,
        };

        let policy = self
            .repositories
            .policies
            .find_active(&traveler.org_id)
            .await?
            .ok_or_else(|| {
                BookingError::Configuration(format!(
                    "org `{}` has no active travel policy",
                    traveler.org_id.0
                ))
            })?;

        let mut verdict = request.verdict;
        if verdict.policy_version != policy.version {
            info!(
                event_name = "booking.verdict_refreshed",
                supplied_version = verdict.policy_version,
                active_version = policy.version,
                traveler_id = %traveler.id.0,
            );
            verdict = evaluate_policy(&request.offer, &traveler, &policy, now);
        }

        let mut booking = Booking::draft(
            traveler.org_id.clone(),
            traveler.id.clone(),
            request.offer,
            verdict,
            request.passengers,
            payment_ref,
            now,
        );

        if booking.verdict.needs_approval {
            booking.transition_to(BookingStatus::PendingApproval)?;
            self.repositories.bookings.save(booking.clone()).await?;

            let Some(approver) = self.resolve_approver(&traveler).await? else {
                // Money first: give the capture back before reporting the
                // org misconfiguration, then park the unapprovable booking.
                let refund =
                    self.refund_captured_payment(&booking, "approver resolution failure").await;
                booking.transition_to(BookingStatus::Cancelled)?;
                booking.updated_at = Utc::now();
                if let Err(save_error) = self.repositories.bookings.save(booking.clone()).await {
                    error!(
                        error = %save_error,
                        booking_id = %booking.id.0,
                        "could not park the unapprovable booking as cancelled"
                    );
                }
                return Err(BookingError::Configuration(format!(
                    "no active approver could be resolved for traveler `{}` in org `{}`; \
                     payment status: {refund}",
                    traveler.id.0, traveler.org_id.0
                )));
            };

            let approval = ApprovalRequest {
                id: ApprovalId::generate(),
                booking_id: booking.id.clone(),
                requester_id: traveler.id.clone(),
                approver_id: approver.id.clone(),
                status: ApprovalStatus::Pending,
                reason: booking.verdict.summary(),
                decision_reason: None,
                decided_by: None,
                decided_at: None,
                expires_at: now + Duration::hours(i64::from(policy.approval_expiry_hours)),
                created_at: now,
                updated_at: now,
            };
            self.repositories.approvals.save(approval.clone()).await?;

            info!(
                event_name = "booking.approval_requested",
                booking_id = %booking.id.0,
                approval_id = %approval.id.0,
                approver_id = %approver.id.0,
                reason = %approval.reason,
            );
            self.notifier.notify(Notification::ApprovalRequested {
                approver_id: approver.id,
                requester_id: traveler.id,
                booking_id: booking.id.clone(),
                reason: approval.reason.clone(),
                expires_at: approval.expires_at,
            });

            return Ok(BookingOutcome::PendingApproval { booking, approval });
        }

        booking.transition_to(BookingStatus::AutoApproved)?;
        self.repositories.bookings.save(booking.clone()).await?;

        let supplier_request = BookingRequest {
            offer_id: booking.offer.id.clone(),
            passengers: booking.passengers.clone(),
            contact_email: traveler.email.clone(),
        };
        match self.supplier.book(&supplier_request).await {
            Ok(confirmation) => self.finish_automated_booking(booking, confirmation).await,
            Err(supplier_error) => {
                self.compensate_supplier_failure(booking, supplier_error).await
            }
        }
    }

    /// Supplier said yes: the confirmation is real even if persisting it is
    /// not possible right now, so this path never returns an error.
    async fn finish_automated_booking(
        &self,
        mut booking: Booking,
        confirmation: SupplierConfirmation,
    ) -> Result<BookingOutcome, BookingError> {
        apply_confirmation(&mut booking, &confirmation);
        booking.transition_to(BookingStatus::Booked)?;
        booking.updated_at = Utc::now();

        let mut warnings = Vec::new();
        if let Err(save_error) = self.repositories.bookings.save(booking.clone()).await {
            error!(
                event_name = "booking.save_failed_after_confirmation",
                booking_id = %booking.id.0,
                confirmation_code = %confirmation.confirmation_code,
                error = %save_error,
            );
            self.record_incident(
                IncidentKind::DbSaveFailed,
                Some(booking.id.clone()),
                "booked trip could not be persisted after supplier confirmation".to_string(),
                serde_json::json!({
                    "confirmation_code": confirmation.confirmation_code,
                    "supplier_order_ref": booking.supplier_order_ref,
                    "error": save_error.to_string(),
                }),
            )
            .await;
            warnings.push(
                "the booking is confirmed with the supplier but could not be saved; operations \
                 has been alerted"
                    .to_string(),
            );
        }

        info!(
            event_name = "booking.booked",
            booking_id = %booking.id.0,
            confirmation_code = %confirmation.confirmation_code,
            manual = booking.manually_confirmed,
        );
        self.preferences.record(BookingSignal::from_booking(&booking));
        self.notifier.notify(Notification::BookingConfirmed {
            traveler_id: booking.traveler_id.clone(),
            booking_id: booking.id.clone(),
            confirmation_code: confirmation.confirmation_code.clone(),
            manually_confirmed: booking.manually_confirmed,
        });

        Ok(BookingOutcome::Confirmed {
            booking,
            confirmation_code: confirmation.confirmation_code,
            warnings,
        })
    }

    /// The saga's compensation arm. The booking row is kept as a record of
    /// the attempt; its parked status and the returned error both state
    /// where the money stands.
    async fn compensate_supplier_failure(
        &self,
        mut booking: Booking,
        supplier_error: SupplierError,
    ) -> Result<BookingOutcome, BookingError> {
        warn!(
            event_name = "booking.supplier_failed",
            booking_id = %booking.id.0,
            offer_id = %booking.offer.id.0,
            error = %supplier_error,
            payment_captured = booking.payment_captured(),
        );

        if !booking.payment_captured() {
            booking.transition_to(BookingStatus::Pending)?;
            booking.updated_at = Utc::now();
            self.repositories.bookings.save(booking.clone()).await?;
            return Err(BookingError::SupplierFailed {
                booking_id: booking.id.0,
                refund: RefundStatus::NotCharged,
                source: supplier_error,
            });
        }

        let refund = self.refund_captured_payment(&booking, "supplier booking failure").await;
        self.record_incident(
            IncidentKind::PaymentBookingMismatch,
            Some(booking.id.clone()),
            "payment was captured but the supplier booking failed".to_string(),
            serde_json::json!({
                "supplier_error": supplier_error.to_string(),
                "supplier_status": supplier_error.status(),
                "amount": booking.amount.to_string(),
                "refund": refund.to_string(),
            }),
        )
        .await;

        match refund {
            RefundStatus::Refunded => booking.transition_to(BookingStatus::Cancelled)?,
            RefundStatus::NotCharged | RefundStatus::RefundFailed => {
                booking.transition_to(BookingStatus::Pending)?;
                booking.needs_reconciliation = true;
            }
        }
        booking.updated_at = Utc::now();
        self.repositories.bookings.save(booking.clone()).await?;

        Err(BookingError::SupplierFailed { booking_id: booking.id.0, refund, source: supplier_error })
    }
}

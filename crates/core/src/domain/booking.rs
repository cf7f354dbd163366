use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::compliance::PolicyVerdict;
use crate::domain::offer::{DataSource, Offer};
use crate::domain::traveler::{Passenger, TravelerId};
use crate::domain::OrgId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl BookingId {
    pub fn generate() -> Self {
        Self(format!("bkg-{}", Uuid::new_v4()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Draft,
    PendingApproval,
    AutoApproved,
    Booked,
    /// Supplier leg failed after the booking was cleared; waiting on manual
    /// follow-up by operations.
    Pending,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::AutoApproved => "auto_approved",
            Self::Booked => "booked",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Cancelled)
    }
}

/// Reference to a captured payment. The signature presented at creation is
/// verified and discarded, never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRef {
    pub order_id: String,
    pub payment_id: String,
}

/// A booking owns snapshot copies of the offer, the verdict and the
/// passenger list taken at creation; later policy or profile edits never
/// change what was decided. The money amount is fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub org_id: OrgId,
    pub traveler_id: TravelerId,
    pub status: BookingStatus,
    pub offer: Offer,
    pub verdict: PolicyVerdict,
    pub passengers: Vec<Passenger>,
    pub amount: Decimal,
    pub currency: String,
    pub supplier_order_ref: Option<String>,
    pub confirmation_code: Option<String>,
    pub manually_confirmed: bool,
    pub needs_reconciliation: bool,
    pub payment: Option<PaymentRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn draft(
        org_id: OrgId,
        traveler_id: TravelerId,
        offer: Offer,
        verdict: PolicyVerdict,
        passengers: Vec<Passenger>,
        payment: Option<PaymentRef>,
        at: DateTime<Utc>,
    ) -> Self {
        let amount = offer.price;
        let currency = offer.currency.clone();
        Self {
            id: BookingId::generate(),
            org_id,
            traveler_id,
            status: BookingStatus::Draft,
            offer,
            verdict,
            passengers,
            amount,
            currency,
            supplier_order_ref: None,
            confirmation_code: None,
            manually_confirmed: false,
            needs_reconciliation: false,
            payment,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (&self.status, next),
            (BookingStatus::Draft, BookingStatus::PendingApproval)
                | (BookingStatus::Draft, BookingStatus::AutoApproved)
                | (BookingStatus::AutoApproved, BookingStatus::Booked)
                | (BookingStatus::AutoApproved, BookingStatus::Pending)
                | (BookingStatus::PendingApproval, BookingStatus::Booked)
                | (BookingStatus::PendingApproval, BookingStatus::Rejected)
                | (BookingStatus::Pending, BookingStatus::Booked)
                | (
                    BookingStatus::Draft
                        | BookingStatus::PendingApproval
                        | BookingStatus::AutoApproved
                        | BookingStatus::Pending
                        | BookingStatus::Booked,
                    BookingStatus::Cancelled,
                )
        )
    }

    /// The single authority for status changes. Entering `booked` requires a
    /// supplier order reference or the manual-confirmation marker, so no
    /// booking can read as confirmed while holding neither.
    pub fn transition_to(&mut self, next: BookingStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidBookingTransition { from: self.status, to: next });
        }

        if next == BookingStatus::Booked
            && self.supplier_order_ref.is_none()
            && !self.manually_confirmed
        {
            return Err(DomainError::InvariantViolation(
                "booking cannot enter `booked` without a supplier order reference or a manual \
                 confirmation marker"
                    .to_string(),
            ));
        }

        self.status = next;
        Ok(())
    }

    pub fn is_sample_data(&self) -> bool {
        self.offer.data_source == DataSource::Sample
    }

    pub fn payment_captured(&self) -> bool {
        self.payment.is_some()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use crate::compliance::PolicyVerdict;
    use crate::domain::offer::{CabinClass, DataSource, Offer, OfferId};
    use crate::domain::policy::EnforcementMode;
    use crate::domain::traveler::{Passenger, TravelerId};
    use crate::domain::OrgId;
    use crate::errors::DomainError;

    use super::{Booking, BookingStatus};

    fn verdict() -> PolicyVerdict {
        PolicyVerdict {
            compliant: true,
            violations: Vec::new(),
            needs_approval: false,
            mode: EnforcementMode::Soft,
            policy_version: 1,
            evaluated_at: Utc::now(),
        }
    }

    fn offer() -> Offer {
        Offer {
            id: OfferId("ah:OF-7".to_string()),
            carrier: "AI".to_string(),
            origin: "BOM".to_string(),
            destination: "DEL".to_string(),
            departs_at: Utc::now() + Duration::days(7),
            cabin: CabinClass::Economy,
            stops: 0,
            refundable: true,
            price: Decimal::new(6_200_00, 2),
            currency: "INR".to_string(),
            expires_at: Utc::now() + Duration::minutes(15),
            data_source: DataSource::Api,
        }
    }

    fn booking(status: BookingStatus) -> Booking {
        let mut booking = Booking::draft(
            OrgId("org-1".to_string()),
            TravelerId("trv-1".to_string()),
            offer(),
            verdict(),
            vec![Passenger {
                first_name: "Asha".to_string(),
                last_name: "Rao".to_string(),
                email: "asha@example.in".to_string(),
            }],
            None,
            Utc::now(),
        );
        booking.status = status;
        booking
    }

    #[test]
    fn draft_snapshots_amount_from_the_offer() {
        let subject = booking(BookingStatus::Draft);
        assert_eq!(subject.amount, Decimal::new(6_200_00, 2));
        assert_eq!(subject.currency, "INR");
    }

    #[test]
    fn auto_approved_path_reaches_booked_with_supplier_ref() {
        let mut subject = booking(BookingStatus::Draft);
        subject.transition_to(BookingStatus::AutoApproved).expect("draft -> auto_approved");
        subject.supplier_order_ref = Some("AH-88121".to_string());
        subject.confirmation_code = Some("Q7WXM2".to_string());
        subject.transition_to(BookingStatus::Booked).expect("auto_approved -> booked");
        assert_eq!(subject.status, BookingStatus::Booked);
    }

    #[test]
    fn booked_requires_supplier_ref_or_manual_marker() {
        let mut bare = booking(BookingStatus::AutoApproved);
        let error = bare.transition_to(BookingStatus::Booked).expect_err("no confirmation source");
        assert!(matches!(error, DomainError::InvariantViolation(_)));
        assert_eq!(bare.status, BookingStatus::AutoApproved);

        let mut manual = booking(BookingStatus::PendingApproval);
        manual.manually_confirmed = true;
        manual.confirmation_code = Some("M4NU4L".to_string());
        manual.transition_to(BookingStatus::Booked).expect("manual marker satisfies the gate");
    }

    #[test]
    fn supplier_failure_parks_auto_approved_as_pending() {
        let mut subject = booking(BookingStatus::AutoApproved);
        subject.transition_to(BookingStatus::Pending).expect("auto_approved -> pending");
        assert_eq!(subject.status, BookingStatus::Pending);
    }

    #[test]
    fn terminal_states_accept_no_further_transitions() {
        for terminal in [BookingStatus::Rejected, BookingStatus::Cancelled] {
            let subject = booking(terminal);
            for next in [
                BookingStatus::Draft,
                BookingStatus::PendingApproval,
                BookingStatus::AutoApproved,
                BookingStatus::Booked,
                BookingStatus::Pending,
                BookingStatus::Rejected,
                BookingStatus::Cancelled,
            ] {
                assert!(!subject.can_transition_to(next), "{terminal:?} -> {next:?} must be blocked");
            }
        }
    }

    #[test]
    fn cancel_is_reachable_from_every_non_terminal_state() {
        for status in [
            BookingStatus::Draft,
            BookingStatus::PendingApproval,
            BookingStatus::AutoApproved,
            BookingStatus::Pending,
            BookingStatus::Booked,
        ] {
            assert!(booking(status).can_transition_to(BookingStatus::Cancelled));
        }
    }

    #[test]
    fn rejected_is_only_reachable_from_pending_approval() {
        assert!(booking(BookingStatus::PendingApproval).can_transition_to(BookingStatus::Rejected));
        assert!(!booking(BookingStatus::Draft).can_transition_to(BookingStatus::Rejected));
        assert!(!booking(BookingStatus::AutoApproved).can_transition_to(BookingStatus::Rejected));
        assert!(!booking(BookingStatus::Booked).can_transition_to(BookingStatus::Rejected));
    }

    #[test]
    fn invalid_transition_names_both_endpoints() {
        let mut subject = booking(BookingStatus::Booked);
        let error =
            subject.transition_to(BookingStatus::Draft).expect_err("booked -> draft is illegal");
        assert!(matches!(
            error,
            DomainError::InvalidBookingTransition {
                from: BookingStatus::Booked,
                to: BookingStatus::Draft
            }
        ));
    }
}

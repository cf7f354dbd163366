use chrono::{DateTime, Utc};
use thiserror::Error;

use tripdesk_core::DomainError;
use tripdesk_db::repositories::RepositoryError;
use tripdesk_payment::PaymentError;
use tripdesk_supplier::SupplierError;

/// Where the traveler's money stands after a failed operation. Every error
/// surfaced after a capture names one of these explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefundStatus {
    NotCharged,
    Refunded,
    RefundFailed,
}

impl std::fmt::Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::NotCharged => "not charged",
            Self::Refunded => "refunded",
            Self::RefundFailed => "refund failed, flagged for manual reconciliation",
        })
    }
}

#[derive(Debug, Error)]
pub enum BookingError {
    /// Terminal: supplier offers cannot be revived once their hold lapses.
    #[error("offer expired at {expired_at}; run a new search for current fares")]
    OfferExpired { expired_at: DateTime<Utc> },
    #[error("invalid booking request: {0}")]
    Validation(String),
    #[error("no traveler `{id}` exists")]
    UnknownTraveler { id: String },
    #[error("traveler `{id}` is deactivated and cannot book travel")]
    InactiveTraveler { id: String },
    #[error("payment capture signature did not verify; nothing was created")]
    SignatureMismatch,
    #[error("no booking `{id}` exists")]
    UnknownBooking { id: String },
    #[error("no approval request `{id}` exists")]
    UnknownApproval { id: String },
    #[error("{detail}")]
    NotAuthorized { detail: String },
    /// The compare-and-set found the request already decided or expired. A
    /// second decision on the same request lands here.
    #[error("approval request `{id}` is not pending")]
    NotPending { id: String },
    #[error("approval request `{id}` expired at {expired_at}; the booking needs a fresh request")]
    ApprovalExpired { id: String, expired_at: DateTime<Utc> },
    /// The supplier leg failed after the booking was cleared. The booking is
    /// parked, and `refund` states where the money stands.
    #[error("supplier booking failed for `{booking_id}` ({source}); payment status: {refund}")]
    SupplierFailed { booking_id: String, refund: RefundStatus, source: SupplierError },
    #[error("tax invoice unavailable: {detail}")]
    InvoiceUnavailable { detail: String },
    #[error("configuration problem: {0}")]
    Configuration(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage failure: {0}")]
    Persistence(#[from] RepositoryError),
    #[error("payment gateway failure: {0}")]
    Payment(#[from] PaymentError),
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use tripdesk_supplier::SupplierError;

    use super::{BookingError, RefundStatus};

    #[test]
    fn supplier_failure_message_names_the_money_status() {
        let error = BookingError::SupplierFailed {
            booking_id: "bkg-1".to_string(),
            refund: RefundStatus::Refunded,
            source: SupplierError::OfferGone { detail: "hold lapsed".to_string() },
        };
        let message = error.to_string();
        assert!(message.contains("bkg-1"));
        assert!(message.contains("payment status: refunded"));
    }

    #[test]
    fn refund_failure_wording_points_at_reconciliation() {
        assert_eq!(
            RefundStatus::RefundFailed.to_string(),
            "refund failed, flagged for manual reconciliation"
        );
        assert_eq!(RefundStatus::NotCharged.to_string(), "not charged");
    }

    #[test]
    fn expired_offer_error_tells_the_caller_to_search_again() {
        let error = BookingError::OfferExpired { expired_at: Utc::now() };
        assert!(error.to_string().contains("new search"));
    }
}

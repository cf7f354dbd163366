use thiserror::Error;

use crate::domain::approval::ApprovalStatus;
use crate::domain::booking::BookingStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid booking transition from {from:?} to {to:?}")]
    InvalidBookingTransition { from: BookingStatus, to: BookingStatus },
    #[error("invalid approval transition from {from:?} to {to:?}")]
    InvalidApprovalTransition { from: ApprovalStatus, to: ApprovalStatus },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::BookingId;
use crate::domain::traveler::TravelerId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

impl ApprovalId {
    pub fn generate() -> Self {
        Self(format!("apr-{}", Uuid::new_v4()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
        }
    }
}

/// One human decision per booking. Only a pending request can be decided or
/// expired; decisions race through a compare-and-set at the store, this table
/// is the in-memory mirror of the same rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalId,
    pub booking_id: BookingId,
    pub requester_id: TravelerId,
    pub approver_id: TravelerId,
    pub status: ApprovalStatus,
    pub reason: String,
    pub decision_reason: Option<String>,
    pub decided_by: Option<TravelerId>,
    pub decided_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn can_transition_to(&self, next: ApprovalStatus) -> bool {
        matches!(
            (&self.status, next),
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
                | (ApprovalStatus::Pending, ApprovalStatus::Rejected)
                | (ApprovalStatus::Pending, ApprovalStatus::Expired)
        )
    }

    pub fn transition_to(&mut self, next: ApprovalStatus) -> Result<(), DomainError> {
        if !self.can_transition_to(next) {
            return Err(DomainError::InvalidApprovalTransition { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }

    pub fn is_overdue(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }
}

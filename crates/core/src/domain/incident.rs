use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::BookingId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(pub String);

impl IncidentId {
    pub fn generate() -> Self {
        Self(format!("inc-{}", Uuid::new_v4()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    /// Payment captured but the supplier leg failed.
    PaymentBookingMismatch,
    /// A compensating refund could not be issued.
    RefundFailed,
    /// Supplier confirmed but the booking row could not be saved.
    DbSaveFailed,
    /// Approval granted but the supplier leg failed; a manual confirmation
    /// code was issued and the booking needs reconciliation.
    ManualConfirmationIssued,
}

impl IncidentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PaymentBookingMismatch => "payment_booking_mismatch",
            Self::RefundFailed => "refund_failed",
            Self::DbSaveFailed => "db_save_failed",
            Self::ManualConfirmationIssued => "manual_confirmation_issued",
        }
    }
}

/// Append-only operational record for human follow-up. Incidents are never
/// updated or deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub booking_id: Option<BookingId>,
    pub kind: IncidentKind,
    pub detail: String,
    pub context: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Incident {
    pub fn new(
        kind: IncidentKind,
        booking_id: Option<BookingId>,
        detail: impl Into<String>,
        context: serde_json::Value,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IncidentId::generate(),
            booking_id,
            kind,
            detail: detail.into(),
            context,
            created_at: at,
        }
    }
}

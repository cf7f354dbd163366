use rust_decimal::Decimal;
use serde::Serialize;

use tripdesk_core::{ApprovalRequest, Booking};

/// What `create_booking` hands back. A confirmed outcome always carries a
/// usable confirmation code; warnings flag confirmations that could not be
/// persisted and are being chased by operations.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BookingOutcome {
    Confirmed { booking: Booking, confirmation_code: String, warnings: Vec<String> },
    PendingApproval { booking: Booking, approval: ApprovalRequest },
}

impl BookingOutcome {
    pub fn booking(&self) -> &Booking {
        match self {
            Self::Confirmed { booking, .. } | Self::PendingApproval { booking, .. } => booking,
        }
    }

    pub fn is_pending_approval(&self) -> bool {
        matches!(self, Self::PendingApproval { .. })
    }

    pub fn confirmation_code(&self) -> Option<&str> {
        match self {
            Self::Confirmed { confirmation_code, .. } => Some(confirmation_code),
            Self::PendingApproval { .. } => None,
        }
    }
}

/// Result of a cancellation. `refund_amount` is whatever the supplier
/// reported; local-only cancellations report none.
#[derive(Clone, Debug, Serialize)]
pub struct CancellationOutcome {
    pub booking: Booking,
    pub supplier_cancelled: bool,
    pub refund_amount: Option<Decimal>,
}

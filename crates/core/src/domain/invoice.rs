use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::booking::BookingId;
use crate::gst::GstBreakdown;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceId(pub String);

impl InvoiceId {
    pub fn generate() -> Self {
        Self(format!("inv-{}", Uuid::new_v4()))
    }
}

/// GST invoice for a booked trip. 1:1 with its booking and immutable once
/// written; the repository only ever inserts these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxInvoice {
    pub id: InvoiceId,
    pub booking_id: BookingId,
    pub base_amount: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_gst: Decimal,
    pub total_amount: Decimal,
    pub gst_rate: Decimal,
    pub interstate: bool,
    /// GST state of the origin airport, or the raw airport code when the
    /// origin is outside the domestic table.
    pub place_of_supply: String,
    pub registered_state: String,
    pub created_at: DateTime<Utc>,
}

impl TaxInvoice {
    pub fn from_breakdown(
        booking_id: BookingId,
        breakdown: GstBreakdown,
        total_amount: Decimal,
        place_of_supply: String,
        registered_state: String,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: InvoiceId::generate(),
            booking_id,
            base_amount: breakdown.base_amount,
            cgst: breakdown.cgst,
            sgst: breakdown.sgst,
            igst: breakdown.igst,
            total_gst: breakdown.total_gst,
            total_amount,
            gst_rate: breakdown.rate,
            interstate: breakdown.interstate,
            place_of_supply,
            registered_state,
            created_at: at,
        }
    }
}

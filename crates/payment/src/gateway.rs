use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub payment_id: String,
    /// Refunded amount in the payment currency (rupees, not paise).
    pub amount: Decimal,
    pub status: String,
}

/// The seam saga compensation and rejection refunds go through.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn refund(
        &self,
        payment_id: &str,
        amount: Decimal,
    ) -> Result<RefundReceipt, PaymentError>;
}

/// Stand-in wired when `payment.enabled` is false. Captures cannot verify
/// without a key secret, so no booking should ever reach a refund here;
/// one that does gets a not-configured error rather than a silent no-op.
pub struct DisabledPayments;

#[async_trait]
impl PaymentGateway for DisabledPayments {
    async fn refund(
        &self,
        _payment_id: &str,
        _amount: Decimal,
    ) -> Result<RefundReceipt, PaymentError> {
        Err(PaymentError::NotConfigured("payments are disabled".to_string()))
    }
}

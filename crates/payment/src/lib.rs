//! Payment gateway - capture verification and refunds
//!
//! Captures are made client-side at checkout; this crate verifies their
//! HMAC signatures before any booking side effect and issues refunds when a
//! saga compensates or an approver rejects a paid booking.

pub mod error;
pub mod gateway;
pub mod razorpay;
pub mod signature;

pub use error::PaymentError;
pub use gateway::{DisabledPayments, PaymentGateway, RefundReceipt};
pub use razorpay::RazorpayClient;
pub use signature::{sign_payment, verify_payment_signature};

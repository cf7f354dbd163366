use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("payment signature verification failed")]
    SignatureMismatch,
    #[error("payment gateway rejected the request (status {status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("payment gateway transport failure: {0}")]
    Transport(String),
    #[error("could not decode payment gateway response: {0}")]
    Decode(String),
    #[error("payment gateway is not configured: {0}")]
    NotConfigured(String),
}

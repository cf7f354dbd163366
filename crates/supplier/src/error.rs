use thiserror::Error;

/// Normalized supplier failure. Every backend maps its own failure shapes
/// into this enum so callers never see raw HTTP plumbing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SupplierError {
    /// The offer is no longer bookable (expired, sold out, repriced).
    /// Terminal: the caller must search again.
    #[error("offer is no longer available: {detail}")]
    OfferGone { detail: String },
    #[error("supplier rejected the access token")]
    Unauthorized,
    #[error("supplier rejected the request (status {status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("supplier rate limit hit")]
    RateLimited,
    #[error("supplier upstream failure (status {status}): {detail}")]
    Upstream { status: u16, detail: String },
    #[error("supplier request timed out after {seconds}s")]
    Timeout { seconds: u64 },
    #[error("supplier transport failure: {0}")]
    Transport(String),
    #[error("could not decode supplier response: {0}")]
    Decode(String),
    #[error("token refresh failed: {0}")]
    TokenRefresh(String),
}

impl SupplierError {
    /// HTTP-like status view of the failure, for logging and for callers
    /// that branch on status families.
    pub fn status(&self) -> u16 {
        match self {
            Self::OfferGone { .. } => 410,
            Self::Unauthorized => 401,
            Self::Rejected { status, .. } | Self::Upstream { status, .. } => *status,
            Self::RateLimited => 429,
            Self::Timeout { .. } => 504,
            Self::Transport(_) | Self::Decode(_) | Self::TokenRefresh(_) => 502,
        }
    }

    /// Whether a retry with backoff could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Upstream { .. } | Self::Timeout { .. } | Self::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::SupplierError;

    #[test]
    fn offer_gone_keeps_its_status_distinguishable() {
        let error = SupplierError::OfferGone { detail: "offer expired upstream".to_string() };
        assert_eq!(error.status(), 410);
        assert!(!error.is_transient());
    }

    #[test]
    fn transient_classification_covers_retryable_failures() {
        assert!(SupplierError::RateLimited.is_transient());
        assert!(SupplierError::Timeout { seconds: 20 }.is_transient());
        assert!(SupplierError::Upstream { status: 503, detail: "maintenance".into() }
            .is_transient());
        assert!(!SupplierError::Unauthorized.is_transient());
        assert!(!SupplierError::Rejected { status: 422, detail: "bad passenger".into() }
            .is_transient());
    }
}

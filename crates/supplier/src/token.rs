use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::SecretString;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SupplierError;

/// Seconds before the advertised expiry at which a cached token is already
/// treated as expired, so in-flight requests never race the real expiry.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Clone, Debug)]
pub struct AccessToken {
    pub value: SecretString,
    pub expires_at: DateTime<Utc>,
}

/// Where fresh tokens come from. The live backend implements this with its
/// auth endpoint; tests script it.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<AccessToken, SupplierError>;
}

/// Process-wide token slot shared by every request to one backend.
///
/// Refresh is serialized on the slot mutex and idempotent, so two tasks
/// racing a refresh both end up with a valid token (last writer wins).
pub struct TokenCache {
    source: Arc<dyn TokenSource>,
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self { source, slot: Mutex::new(None) }
    }

    /// The current token, fetching a fresh one when the slot is empty or
    /// the cached token is within the refresh margin.
    pub async fn current(&self) -> Result<AccessToken, SupplierError> {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if !is_stale(token, Utc::now()) {
                return Ok(token.clone());
            }
        }

        debug!("refreshing supplier access token");
        let fresh = self.source.fetch().await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    /// Drop the cached token so the next `current` call re-fetches.
    /// Called after a 401 to force exactly one re-authentication.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }
}

fn is_stale(token: &AccessToken, now: DateTime<Utc>) -> bool {
    now + Duration::seconds(REFRESH_MARGIN_SECS) >= token.expires_at
}

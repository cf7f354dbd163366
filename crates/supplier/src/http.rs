use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use tripdesk_core::{
    CabinClass, DataSource, Offer, OfferId, Passenger, SupplierConfig, DEFAULT_CURRENCY,
};

use crate::error::SupplierError;
use crate::gateway::{
    BookingRequest, CancelOutcome, ConfirmationSource, SearchCriteria, SupplierBackend,
    SupplierConfirmation, AEROHUB_PREFIX,
};
use crate::token::{AccessToken, TokenCache, TokenSource};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl RetryPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Live HTTP backend for the Aerohub flight supply API.
///
/// All requests share one [`TokenCache`]. Transient failures (429, 5xx,
/// timeouts) retry with exponential backoff per the policy; a 401 triggers
/// exactly one forced token refresh and replay before becoming terminal.
pub struct AerohubBackend {
    http: Client,
    base_url: String,
    tokens: TokenCache,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl AerohubBackend {
    pub fn from_config(config: &SupplierConfig) -> Result<Self, SupplierError> {
        let base_url = config
            .base_url
            .as_deref()
            .ok_or_else(|| SupplierError::Transport("supplier.base_url is not set".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| SupplierError::Transport("supplier.api_key is not set".to_string()))?;
        let api_secret = config.api_secret.clone().ok_or_else(|| {
            SupplierError::Transport("supplier.api_secret is not set".to_string())
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| SupplierError::Transport(err.to_string()))?;

        let source = AerohubTokenSource {
            http: http.clone(),
            base_url: base_url.clone(),
            api_key,
            api_secret,
        };

        Ok(Self {
            http,
            base_url,
            tokens: TokenCache::new(Arc::new(source)),
            timeout_secs: config.timeout_secs,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay_ms: config.backoff_base_ms,
                ..RetryPolicy::default()
            },
        })
    }
}

#[async_trait]
impl SupplierBackend for AerohubBackend {
    fn prefix(&self) -> &'static str {
        AEROHUB_PREFIX
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<Offer>, SupplierError> {
        let wire: SearchWire = send_with_policy(&self.tokens, &self.retry, |token| {
            let depart_date = criteria.depart_date.to_string();
            let passengers = criteria.passengers.to_string();
            let mut request = self
                .http
                .get(format!("{}/v1/offers", self.base_url))
                .query(&[
                    ("origin", criteria.origin.as_str()),
                    ("destination", criteria.destination.as_str()),
                    ("depart_date", depart_date.as_str()),
                    ("passengers", passengers.as_str()),
                ]);
            if let Some(cabin) = criteria.cabin {
                request = request.query(&[("cabin", cabin.as_str())]);
            }
            execute_json(request.bearer_auth(token.value.expose_secret()), self.timeout_secs)
        })
        .await?;

        Ok(wire.offers.into_iter().map(offer_from_wire).collect())
    }

    async fn book(&self, request: &BookingRequest) -> Result<SupplierConfirmation, SupplierError> {
        let offer_token = supplier_token(&request.offer_id);
        let wire: OrderWire = send_with_policy(&self.tokens, &self.retry, |token| {
            let body = BookWire {
                offer_id: offer_token,
                passengers: &request.passengers,
                contact_email: &request.contact_email,
            };
            let builder = self
                .http
                .post(format!("{}/v1/orders", self.base_url))
                .bearer_auth(token.value.expose_secret())
                .json(&body);
            execute_json(builder, self.timeout_secs)
        })
        .await?;

        Ok(SupplierConfirmation {
            confirmation_code: wire.confirmation_code,
            supplier_order_ref: Some(wire.order_ref),
            source: ConfirmationSource::Supplier,
        })
    }

    async fn cancel(
        &self,
        _offer_id: &OfferId,
        supplier_order_ref: &str,
    ) -> Result<CancelOutcome, SupplierError> {
        let wire: CancelWire = send_with_policy(&self.tokens, &self.retry, |token| {
            let builder = self
                .http
                .post(format!("{}/v1/orders/{}/cancel", self.base_url, supplier_order_ref))
                .bearer_auth(token.value.expose_secret());
            execute_json(builder, self.timeout_secs)
        })
        .await?;

        Ok(CancelOutcome { cancelled: true, refund_amount: wire.refund_amount })
    }
}

/// Drives one logical request through the token cache and retry policy.
///
/// The closure is invoked once per transport attempt with a current token.
/// A 401 invalidates the cached token and replays once; transient failures
/// back off and retry up to the policy budget; everything else fails fast.
async fn send_with_policy<T, F, Fut>(
    tokens: &TokenCache,
    retry: &RetryPolicy,
    mut attempt_call: F,
) -> Result<T, SupplierError>
where
    F: FnMut(AccessToken) -> Fut,
    Fut: std::future::Future<Output = Result<T, SupplierError>>,
{
    let mut reauthed = false;
    let mut attempt = 0;

    loop {
        let token = tokens.current().await?;
        match attempt_call(token).await {
            Ok(value) => return Ok(value),
            Err(SupplierError::Unauthorized) if !reauthed => {
                warn!("supplier returned 401; invalidating token and replaying once");
                tokens.invalidate().await;
                reauthed = true;
            }
            Err(error) if error.is_transient() && attempt < retry.max_retries => {
                let delay = retry.backoff(attempt);
                warn!(
                    attempt,
                    max_retries = retry.max_retries,
                    error = %error,
                    "transient supplier failure; backing off before retry"
                );
                attempt += 1;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
            Err(error) => return Err(error),
        }
    }
}

async fn execute_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    timeout_secs: u64,
) -> Result<T, SupplierError> {
    let response = request.send().await.map_err(|err| map_transport_error(err, timeout_secs))?;

    if response.status().is_success() {
        response.json::<T>().await.map_err(|err| SupplierError::Decode(err.to_string()))
    } else {
        Err(error_from_response(response).await)
    }
}

fn map_transport_error(error: reqwest::Error, timeout_secs: u64) -> SupplierError {
    if error.is_timeout() {
        SupplierError::Timeout { seconds: timeout_secs }
    } else {
        SupplierError::Transport(error.to_string())
    }
}

async fn error_from_response(response: reqwest::Response) -> SupplierError {
    let status = response.status().as_u16();
    let detail = response.text().await.unwrap_or_default();

    match status {
        401 => SupplierError::Unauthorized,
        410 => SupplierError::OfferGone { detail },
        429 => SupplierError::RateLimited,
        500..=599 => SupplierError::Upstream { status, detail },
        _ => SupplierError::Rejected { status, detail },
    }
}

fn supplier_token(offer_id: &OfferId) -> &str {
    offer_id.0.split_once(':').map(|(_, token)| token).unwrap_or(offer_id.0.as_str())
}

fn offer_from_wire(wire: OfferWire) -> Offer {
    Offer {
        id: OfferId(format!("{AEROHUB_PREFIX}:{}", wire.id)),
        carrier: wire.carrier,
        origin: wire.origin,
        destination: wire.destination,
        departs_at: wire.departs_at,
        cabin: wire.cabin,
        stops: wire.stops,
        refundable: wire.refundable,
        price: wire.price,
        currency: wire.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        expires_at: wire.expires_at,
        data_source: DataSource::Api,
    }
}

struct AerohubTokenSource {
    http: Client,
    base_url: String,
    api_key: SecretString,
    api_secret: SecretString,
}

#[async_trait]
impl TokenSource for AerohubTokenSource {
    async fn fetch(&self) -> Result<AccessToken, SupplierError> {
        let response = self
            .http
            .post(format!("{}/v1/auth/token", self.base_url))
            .json(&serde_json::json!({
                "api_key": self.api_key.expose_secret(),
                "api_secret": self.api_secret.expose_secret(),
            }))
            .send()
            .await
            .map_err(|err| SupplierError::TokenRefresh(err.to_string()))?;

        if !response.status().is_success() {
            return Err(SupplierError::TokenRefresh(format!(
                "auth endpoint returned status {}",
                response.status().as_u16()
            )));
        }

        let wire: TokenWire = response
            .json()
            .await
            .map_err(|err| SupplierError::TokenRefresh(err.to_string()))?;

        Ok(AccessToken {
            value: wire.access_token.into(),
            expires_at: Utc::now() + chrono::Duration::seconds(wire.expires_in),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenWire {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct SearchWire {
    offers: Vec<OfferWire>,
}

#[derive(Debug, Deserialize)]
struct OfferWire {
    id: String,
    carrier: String,
    origin: String,
    destination: String,
    departs_at: DateTime<Utc>,
    cabin: CabinClass,
    #[serde(default)]
    stops: u32,
    #[serde(default)]
    refundable: bool,
    price: Decimal,
    currency: Option<String>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct BookWire<'a> {
    offer_id: &'a str,
    passengers: &'a [Passenger],
    contact_email: &'a str,
}

#[derive(Debug, Deserialize)]
struct OrderWire {
    order_ref: String,
    confirmation_code: String,
}

#[derive(Debug, Deserialize)]
struct CancelWire {
    #[serde(default)]
    refund_amount: Option<Decimal>,
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;

use tripdesk_core::PaymentConfig;

use crate::error::PaymentError;
use crate::gateway::{PaymentGateway, RefundReceipt};

/// Razorpay REST client. Only the refund surface is wired; captures arrive
/// signed from checkout and are verified in [`crate::signature`].
pub struct RazorpayClient {
    http: Client,
    base_url: String,
    key_id: String,
    key_secret: SecretString,
}

impl RazorpayClient {
    pub fn from_config(config: &PaymentConfig) -> Result<Self, PaymentError> {
        let key_id = config
            .key_id
            .clone()
            .ok_or_else(|| PaymentError::NotConfigured("payment.key_id is not set".to_string()))?;
        let key_secret = config.key_secret.clone().ok_or_else(|| {
            PaymentError::NotConfigured("payment.key_secret is not set".to_string())
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayClient {
    async fn refund(
        &self,
        payment_id: &str,
        amount: Decimal,
    ) -> Result<RefundReceipt, PaymentError> {
        let paise = to_paise(amount)?;
        let response = self
            .http
            .post(format!("{}/v1/payments/{payment_id}/refund", self.base_url))
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&serde_json::json!({ "amount": paise }))
            .send()
            .await
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PaymentError::Rejected { status: status.as_u16(), detail });
        }

        let wire: RefundWire =
            response.json().await.map_err(|err| PaymentError::Decode(err.to_string()))?;

        info!(
            event_name = "payment.refund_issued",
            refund_id = %wire.id,
            payment_id = %wire.payment_id,
            amount_paise = wire.amount,
            "refund accepted by payment gateway"
        );

        Ok(RefundReceipt {
            refund_id: wire.id,
            payment_id: wire.payment_id,
            amount: Decimal::new(wire.amount, 2),
            status: wire.status,
        })
    }
}

/// Razorpay amounts move in integer paise.
fn to_paise(amount: Decimal) -> Result<i64, PaymentError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| PaymentError::Decode(format!("amount out of range: {amount}")))
}

#[derive(Debug, Deserialize)]
struct RefundWire {
    id: String,
    payment_id: String,
    amount: i64,
    status: String,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use tripdesk_core::PaymentConfig;

    use super::{to_paise, RazorpayClient};
    use crate::error::PaymentError;

    #[test]
    fn rupee_amounts_convert_to_integer_paise() {
        assert_eq!(to_paise(Decimal::new(4_500_00, 2)).expect("exact amount"), 450_000);
        assert_eq!(to_paise(Decimal::new(10_01, 2)).expect("exact amount"), 1_001);
        assert_eq!(to_paise(Decimal::ZERO).expect("zero amount"), 0);
    }

    #[test]
    fn missing_credentials_fail_construction() {
        let config = PaymentConfig {
            enabled: true,
            base_url: "https://api.razorpay.com".to_string(),
            key_id: None,
            key_secret: None,
            timeout_secs: 15,
        };

        let error = RazorpayClient::from_config(&config).err().expect("construction should fail");
        assert!(matches!(error, PaymentError::NotConfigured(_)));
    }
}

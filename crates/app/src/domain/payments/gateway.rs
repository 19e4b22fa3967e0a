//! Payment gateway client.
//!
//! Intent creation goes over HTTP; callback signatures are verified
//! locally with HMAC-SHA256 over `"{gateway_order_id}|{gateway_payment_id}"`
//! using the merchant key secret.

use std::fmt;

use hmac::{Hmac, Mac};
use mockall::automock;
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::domain::payments::{errors::GatewayError, models::GatewayIntent};

type HmacSha256 = Hmac<Sha256>;

/// Merchant key secret. Redacted in debug output and zeroized on drop.
#[derive(Clone)]
pub struct GatewaySecret(String);

impl GatewaySecret {
    #[must_use]
    pub fn new(secret: String) -> Self {
        Self(secret)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for GatewaySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GatewaySecret(**redacted**)")
    }
}

impl Drop for GatewaySecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

/// Configuration for the payment gateway connection.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway API base, e.g. `"https://api.razorpay.com"`.
    pub base_url: String,

    /// Merchant key id, sent as the basic-auth username.
    pub key_id: String,

    /// Merchant key secret: basic-auth password and HMAC key.
    pub key_secret: GatewaySecret,
}

/// The gateway boundary the order subsystem depends on.
#[automock]
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Register a payment intent for `amount` minor units and return the
    /// gateway's order id for interactive confirmation by the client.
    async fn create_intent(&self, receipt: &str, amount: u64)
    -> Result<GatewayIntent, GatewayError>;

    /// Verify a callback signature against the stored gateway order id.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::VerificationFailed`] when the signature
    /// does not match.
    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError>;
}

/// HTTP client for the real gateway.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    config: GatewayConfig,
    http: Client,
}

impl HttpPaymentGateway {
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            http: Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(
        &self,
        receipt: &str,
        amount: u64,
    ) -> Result<GatewayIntent, GatewayError> {
        let url = format!("{}/v1/orders", self.config.base_url);

        let body = serde_json::json!({
            "amount": amount,
            "currency": "INR",
            "receipt": receipt,
        });

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret.0))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(GatewayError::UnexpectedResponse(format!(
                "intent creation failed with status {status}: {text}"
            )));
        }

        let parsed: IntentResponse = response.json().await?;

        Ok(GatewayIntent {
            gateway_order_id: parsed.id,
            amount: parsed.amount,
            currency: parsed.currency,
        })
    }

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> Result<(), GatewayError> {
        verify_hmac(
            self.config.key_secret.as_bytes(),
            gateway_order_id,
            gateway_payment_id,
            signature,
        )
    }
}

/// Shared verification core, so tests can exercise it without a client.
fn verify_hmac(
    key: &[u8],
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> Result<(), GatewayError> {
    let expected = hex::decode(signature).map_err(|_e| GatewayError::VerificationFailed)?;

    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|_e| GatewayError::VerificationFailed)?;

    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());

    mac.verify_slice(&expected)
        .map_err(|_e| GatewayError::VerificationFailed)
}

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    amount: u64,
    currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(key: &[u8], order_id: &str, payment_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key length");

        mac.update(order_id.as_bytes());
        mac.update(b"|");
        mac.update(payment_id.as_bytes());

        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let signature = sign(b"secret", "order_abc", "pay_123");

        let result = verify_hmac(b"secret", "order_abc", "pay_123", &signature);

        assert!(result.is_ok(), "expected success, got {result:?}");
    }

    #[test]
    fn signature_over_different_order_fails() {
        let signature = sign(b"secret", "order_abc", "pay_123");

        let result = verify_hmac(b"secret", "order_xyz", "pay_123", &signature);

        assert!(
            matches!(result, Err(GatewayError::VerificationFailed)),
            "expected VerificationFailed, got {result:?}"
        );
    }

    #[test]
    fn signature_with_wrong_key_fails() {
        let signature = sign(b"other-secret", "order_abc", "pay_123");

        let result = verify_hmac(b"secret", "order_abc", "pay_123", &signature);

        assert!(
            matches!(result, Err(GatewayError::VerificationFailed)),
            "expected VerificationFailed, got {result:?}"
        );
    }

    #[test]
    fn non_hex_signature_fails_cleanly() {
        let result = verify_hmac(b"secret", "order_abc", "pay_123", "not hex at all");

        assert!(
            matches!(result, Err(GatewayError::VerificationFailed)),
            "expected VerificationFailed, got {result:?}"
        );
    }

    #[test]
    fn secret_debug_output_is_redacted() {
        let secret = GatewaySecret::new("super-secret".to_string());

        assert_eq!(format!("{secret:?}"), "GatewaySecret(**redacted**)");
    }
}

/// Payment processor integration
///
/// The local subscription record is the source of truth; the processor is
/// notified best-effort. A failed remote call is logged by the caller and
/// never rolls back the local change.
///
/// [`HttpPaymentProcessor`] talks to the real billing API over HTTPS.
/// When no API key is configured the service runs with [`NoopProcessor`]
/// and everything stays local.
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use super::catalog::PlanType;
use crate::models::subscription::BillingInterval;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted age of a webhook signature timestamp
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("payment provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("payment provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),
}

/// Remote subscription handle returned by the processor
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSubscription {
    pub id: String,
    pub customer_id: String,
}

/// Abstraction over the payment provider
///
/// Implemented by [`HttpPaymentProcessor`] for production and
/// [`NoopProcessor`] for unconfigured or test environments.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a remote subscription; returns None when the processor
    /// does not track subscriptions (noop mode)
    async fn create_subscription(
        &self,
        company_id: Uuid,
        plan: PlanType,
        interval: BillingInterval,
        amount_eur: u32,
    ) -> Result<Option<RemoteSubscription>, ProcessorError>;

    async fn cancel_subscription(&self, processor_id: &str) -> Result<(), ProcessorError>;

    async fn update_subscription_amount(
        &self,
        processor_id: &str,
        amount_eur: u32,
    ) -> Result<(), ProcessorError>;

    /// Verifies a webhook signature header against the raw payload
    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), ProcessorError>;
}

/// HTTP-backed processor
pub struct HttpPaymentProcessor {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    webhook_secret: String,
}

impl HttpPaymentProcessor {
    pub fn new(base_url: String, api_key: String, webhook_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            webhook_secret,
        }
    }

    async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ProcessorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ProcessorError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PaymentProcessor for HttpPaymentProcessor {
    async fn create_subscription(
        &self,
        company_id: Uuid,
        plan: PlanType,
        interval: BillingInterval,
        amount_eur: u32,
    ) -> Result<Option<RemoteSubscription>, ProcessorError> {
        let response = self
            .client
            .post(format!("{}/v1/subscriptions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "currency": "eur",
                // Provider expects cents
                "unit_amount": amount_eur * 100,
                "interval": interval.as_str(),
                "product_name": format!("BouwDesk {} Plan", plan.as_str()),
                "metadata": {
                    "company_id": company_id,
                    "plan_type": plan.as_str(),
                },
            }))
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let remote: RemoteSubscription = response.json().await?;

        Ok(Some(remote))
    }

    async fn cancel_subscription(&self, processor_id: &str) -> Result<(), ProcessorError> {
        let response = self
            .client
            .delete(format!("{}/v1/subscriptions/{}", self.base_url, processor_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    async fn update_subscription_amount(
        &self,
        processor_id: &str,
        amount_eur: u32,
    ) -> Result<(), ProcessorError> {
        let response = self
            .client
            .post(format!("{}/v1/subscriptions/{}", self.base_url, processor_id))
            .bearer_auth(&self.api_key)
            .json(&json!({ "unit_amount": amount_eur * 100 }))
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }

    fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), ProcessorError> {
        verify_signature_header(&self.webhook_secret, payload, signature_header)
    }
}

/// Processor used when no billing API key is configured
///
/// Subscriptions exist only in the local database; webhook verification
/// always fails because there is no shared secret.
pub struct NoopProcessor;

#[async_trait]
impl PaymentProcessor for NoopProcessor {
    async fn create_subscription(
        &self,
        _company_id: Uuid,
        _plan: PlanType,
        _interval: BillingInterval,
        _amount_eur: u32,
    ) -> Result<Option<RemoteSubscription>, ProcessorError> {
        Ok(None)
    }

    async fn cancel_subscription(&self, _processor_id: &str) -> Result<(), ProcessorError> {
        Ok(())
    }

    async fn update_subscription_amount(
        &self,
        _processor_id: &str,
        _amount_eur: u32,
    ) -> Result<(), ProcessorError> {
        Ok(())
    }

    fn verify_webhook_signature(
        &self,
        _payload: &[u8],
        _signature_header: &str,
    ) -> Result<(), ProcessorError> {
        Err(ProcessorError::InvalidSignature(
            "webhook secret not configured".to_string(),
        ))
    }
}

/// Verifies a `t=<unix>,v1=<hex hmac>` signature header
///
/// The signed message is `{t}.{payload}` with HMAC-SHA256 over the
/// webhook secret. Timestamps older than five minutes are rejected to
/// limit replay.
pub fn verify_signature_header(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
) -> Result<(), ProcessorError> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<&str> = None;

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => signature = Some(v),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| ProcessorError::InvalidSignature("missing timestamp".to_string()))?;
    let signature = signature
        .ok_or_else(|| ProcessorError::InvalidSignature("missing v1 signature".to_string()))?;

    let age = chrono::Utc::now().timestamp() - timestamp;
    if age.abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(ProcessorError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let expected = sign_payload(secret, timestamp, payload);

    if !crate::auth::api_key::constant_time_compare(&expected, signature) {
        return Err(ProcessorError::InvalidSignature(
            "signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Computes the hex HMAC for a timestamped payload
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    // Key length is unrestricted for HMAC, so new_from_slice cannot fail
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts any key length"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn header_for(payload: &[u8], timestamp: i64) -> String {
        format!("t={},v1={}", timestamp, sign_payload(SECRET, timestamp, payload))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = br#"{"type":"invoice.payment_succeeded"}"#;
        let header = header_for(payload, chrono::Utc::now().timestamp());

        assert!(verify_signature_header(SECRET, payload, &header).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = br#"{"type":"invoice.payment_succeeded"}"#;
        let header = header_for(payload, chrono::Utc::now().timestamp());

        let result = verify_signature_header(SECRET, b"{\"type\":\"other\"}", &header);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = b"{}";
        let header = header_for(payload, chrono::Utc::now().timestamp());

        assert!(verify_signature_header("whsec_other", payload, &header).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = b"{}";
        let old = chrono::Utc::now().timestamp() - 3600;
        let header = header_for(payload, old);

        assert!(verify_signature_header(SECRET, payload, &header).is_err());
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature_header(SECRET, b"{}", "garbage").is_err());
        assert!(verify_signature_header(SECRET, b"{}", "t=123").is_err());
        assert!(verify_signature_header(SECRET, b"{}", "v1=abc").is_err());
    }

    #[tokio::test]
    async fn test_noop_processor() {
        let processor = NoopProcessor;

        let remote = processor
            .create_subscription(
                Uuid::new_v4(),
                PlanType::Basic,
                BillingInterval::Month,
                49,
            )
            .await
            .unwrap();
        assert!(remote.is_none());

        assert!(processor.cancel_subscription("sub_123").await.is_ok());
        assert!(processor
            .update_subscription_amount("sub_123", 149)
            .await
            .is_ok());
        assert!(processor.verify_webhook_signature(b"{}", "t=1,v1=x").is_err());
    }
}

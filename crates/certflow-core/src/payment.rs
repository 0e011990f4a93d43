// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Payment gateway seam.
//!
//! Hosted-checkout session creation, webhook signature verification and
//! webhook event parsing. The gateway wire format follows the common
//! hosted-checkout shape: a session object with an id and a redirect URL,
//! and signed event payloads of the form `t=<unix>,v1=<hex>` where the
//! digest is HMAC-SHA256 over `"{t}.{body}"`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::CoreError;
use crate::model::{PaymentEvent, PaymentEventKind};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age accepted for a signed webhook timestamp, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// One line item in a checkout session request.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutLineItem {
    /// Display name shown on the hosted checkout page.
    pub name: String,
    /// Unit amount in the smallest currency unit.
    pub amount_cents: i64,
    /// Quantity, always 1 for course purchases.
    pub quantity: u32,
}

/// Request to open a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSessionRequest {
    /// Buyer email, prefilled on the checkout page.
    pub customer_email: String,
    /// Items being purchased.
    pub line_items: Vec<CheckoutLineItem>,
    /// Redirect after successful payment.
    pub success_url: String,
    /// Redirect after cancelled payment.
    pub cancel_url: String,
    /// Token echoed back in webhook events to locate the local order.
    pub correlation_token: String,
}

/// A hosted checkout session created by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Gateway session id.
    pub id: String,
    /// URL the buyer is redirected to.
    pub url: String,
}

/// Payment gateway capability used by the checkout service.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a hosted checkout session.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, CoreError>;
}

/// HTTP client for the payment gateway's REST API.
pub struct RestPaymentGateway {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl RestPaymentGateway {
    /// Create a gateway client for the given API base URL.
    pub fn new(api_url: String, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            secret_key,
        }
    }
}

#[async_trait]
impl PaymentGateway for RestPaymentGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, CoreError> {
        let url = format!("{}/v1/checkout/sessions", self.api_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::PaymentGatewayError {
                operation: "create_checkout_session".to_string(),
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CoreError::PaymentGatewayError {
                operation: "create_checkout_session".to_string(),
                details: format!("gateway returned {}", response.status()),
            });
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| CoreError::PaymentGatewayError {
                operation: "create_checkout_session".to_string(),
                details: format!("invalid session response: {}", e),
            })
    }
}

/// Verify a webhook signature header against the raw request body.
///
/// `header` has the form `t=<unix>,v1=<hex>`; the digest is HMAC-SHA256 over
/// `"{t}.{body}"` keyed with the webhook secret. Timestamps further than
/// [`SIGNATURE_TOLERANCE_SECS`] from `now_unix` are rejected to blunt
/// replays.
pub fn verify_webhook_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now_unix: i64,
) -> Result<(), CoreError> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<Vec<u8>> = None;

    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => {
                signature = hex::decode(value).ok();
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| CoreError::InvalidSignature {
        reason: "missing or malformed timestamp".to_string(),
    })?;
    let signature = signature.ok_or_else(|| CoreError::InvalidSignature {
        reason: "missing v1 component".to_string(),
    })?;

    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(CoreError::InvalidSignature {
            reason: "timestamp outside tolerance".to_string(),
        });
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| {
        CoreError::InvalidSignature {
            reason: "invalid webhook secret".to_string(),
        }
    })?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);

    mac.verify_slice(&signature)
        .map_err(|_| CoreError::InvalidSignature {
            reason: "digest mismatch".to_string(),
        })
}

/// Compute the signature header for a body, used by tests and local tooling.
pub fn sign_webhook_payload(secret: &str, body: &[u8], timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    format!("t={},v1={}", timestamp, hex::encode(digest))
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: WebhookObject,
}

#[derive(Debug, Deserialize)]
struct WebhookObject {
    #[serde(default)]
    metadata: WebhookMetadata,
    customer_email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WebhookMetadata {
    correlation_token: Option<String>,
}

/// Parse a verified webhook body into a payment event.
///
/// Returns `Ok(None)` for event types this service does not consume; the
/// gateway sends many kinds and unknown ones are acknowledged and dropped.
pub fn parse_webhook_event(body: &[u8]) -> Result<Option<PaymentEvent>, CoreError> {
    let envelope: WebhookEnvelope =
        serde_json::from_slice(body).map_err(|e| CoreError::ValidationError {
            field: "body".to_string(),
            message: format!("invalid webhook payload: {}", e),
        })?;

    let kind = match envelope.event_type.as_str() {
        "checkout.session.completed" => PaymentEventKind::Succeeded,
        "checkout.session.async_payment_failed" | "checkout.session.expired" => {
            PaymentEventKind::Failed
        }
        _ => return Ok(None),
    };

    let correlation_token = envelope.data.object.metadata.correlation_token.ok_or_else(|| {
        CoreError::ValidationError {
            field: "metadata.correlation_token".to_string(),
            message: "missing from payment event".to_string(),
        }
    })?;

    Ok(Some(PaymentEvent {
        kind,
        correlation_token,
        customer_email: envelope.data.object.customer_email,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let header = sign_webhook_payload(SECRET, body, 1_700_000_000);
        assert!(verify_webhook_signature(SECRET, &header, body, 1_700_000_000).is_ok());
    }

    #[test]
    fn test_signature_rejects_tampered_body() {
        let header = sign_webhook_payload(SECRET, b"original", 1_700_000_000);
        let err = verify_webhook_signature(SECRET, &header, b"tampered", 1_700_000_000)
            .expect_err("tampered body must fail");
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_signature_rejects_stale_timestamp() {
        let body = b"{}";
        let header = sign_webhook_payload(SECRET, body, 1_700_000_000);
        let err = verify_webhook_signature(SECRET, &header, body, 1_700_000_000 + 301)
            .expect_err("stale timestamp must fail");
        assert_eq!(err.to_string(), "Webhook signature rejected: timestamp outside tolerance");
    }

    #[test]
    fn test_signature_rejects_malformed_header() {
        let err = verify_webhook_signature(SECRET, "v1=abcdef", b"{}", 0)
            .expect_err("header without timestamp must fail");
        assert_eq!(err.error_code(), "INVALID_SIGNATURE");
    }

    #[test]
    fn test_parse_completed_event() {
        let body = br#"{
            "type": "checkout.session.completed",
            "data": {"object": {
                "metadata": {"correlation_token": "ord-123456"},
                "customer_email": "buyer@example.test"
            }}
        }"#;
        let event = parse_webhook_event(body).unwrap().expect("known event");
        assert_eq!(event.kind, PaymentEventKind::Succeeded);
        assert_eq!(event.correlation_token, "ord-123456");
        assert_eq!(event.customer_email.as_deref(), Some("buyer@example.test"));
    }

    #[test]
    fn test_parse_failed_event() {
        let body = br#"{
            "type": "checkout.session.expired",
            "data": {"object": {"metadata": {"correlation_token": "ord-000001"}}}
        }"#;
        let event = parse_webhook_event(body).unwrap().expect("known event");
        assert_eq!(event.kind, PaymentEventKind::Failed);
        assert!(event.customer_email.is_none());
    }

    #[test]
    fn test_parse_unknown_event_is_dropped() {
        let body = br#"{"type": "invoice.created", "data": {"object": {}}}"#;
        assert!(parse_webhook_event(body).unwrap().is_none());
    }

    #[test]
    fn test_parse_known_event_without_token_is_an_error() {
        let body = br#"{"type": "checkout.session.completed", "data": {"object": {}}}"#;
        let err = parse_webhook_event(body).expect_err("token is required");
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }
}

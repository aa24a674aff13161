//! Stripe Payment Gateway
//!
//! Hosted checkout sessions over the form-encoded REST API, and webhook
//! verification using the `Stripe-Signature` scheme: HMAC-SHA256 over
//! `"{t}.{raw body}"` keyed by the endpoint secret, compared in constant
//! time, with a replay window on `t`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use platform::crypto::{constant_time_eq, from_hex, hmac_sha256};
use serde::Deserialize;

use crate::domain::payment::{
    CheckoutMetadata, CheckoutRequest, CheckoutSession, CompletedCheckout, FailedCheckout,
    PaymentEvent, PaymentGateway,
};
use crate::domain::value_object::money::Money;
use crate::error::{AcademyError, AcademyResult};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";
const EVENT_ASYNC_PAYMENT_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
const EVENT_CHECKOUT_EXPIRED: &str = "checkout.session.expired";
const EVENT_ASYNC_PAYMENT_FAILED: &str = "checkout.session.async_payment_failed";
const EVENT_PAYMENT_INTENT_FAILED: &str = "payment_intent.payment_failed";

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,
    pub timeout: Duration,
    /// Maximum age of a signed delivery
    pub signature_tolerance: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            webhook_secret: webhook_secret.into(),
            api_base: "https://api.stripe.com".to_string(),
            timeout: Duration::from_secs(10),
            signature_tolerance: Duration::from_secs(300),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    config: StripeConfig,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> AcademyResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AcademyError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest,
    ) -> AcademyResult<CheckoutSession> {
        let form = checkout_form(request);

        let session: SessionResponse = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .bearer_auth(&self.config.secret_key)
            .form(&form)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| AcademyError::PaymentGateway(format!("create session: {e}")))?
            .json()
            .await
            .map_err(|e| AcademyError::PaymentGateway(format!("session response: {e}")))?;

        let url = session
            .url
            .ok_or_else(|| AcademyError::PaymentGateway("session has no checkout URL".into()))?;

        Ok(CheckoutSession {
            session_id: session.id,
            url,
        })
    }

    fn parse_webhook(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> AcademyResult<PaymentEvent> {
        let header = signature_header
            .ok_or_else(|| AcademyError::InvalidSignature("missing signature header".into()))?;

        verify_signature(
            payload,
            header,
            &self.config.webhook_secret,
            self.config.signature_tolerance,
            Utc::now().timestamp(),
        )?;

        parse_event(payload)
    }
}

/// Form fields for `POST /v1/checkout/sessions`
fn checkout_form(request: &CheckoutRequest) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = vec![
        ("mode".into(), "payment".into()),
        ("success_url".into(), request.success_url.clone()),
        ("cancel_url".into(), request.cancel_url.clone()),
        ("customer_email".into(), request.customer_email.clone()),
        ("locale".into(), request.locale.code().into()),
        ("line_items[0][quantity]".into(), "1".into()),
        (
            "line_items[0][price_data][currency]".into(),
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]".into(),
            request.amount.minor().to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".into(),
            request.product_name.clone(),
        ),
    ];

    // Metadata goes on both the session and the payment intent so that
    // intent-level failures can still be traced back
    for (key, value) in request.metadata.to_map() {
        form.push((format!("metadata[{key}]"), value.clone()));
        form.push((format!("payment_intent_data[metadata][{key}]"), value));
    }

    form
}

/// Verify a `Stripe-Signature` header against the raw payload.
///
/// Accepts if any `v1` entry matches and `t` is within `tolerance` of `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: i64,
) -> AcademyResult<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => {
                if let Ok(bytes) = from_hex(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AcademyError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(AcademyError::InvalidSignature("no v1 signature".into()));
    }

    let age = now.saturating_sub(timestamp).unsigned_abs();
    if age > tolerance.as_secs() {
        return Err(AcademyError::InvalidSignature(
            "timestamp outside tolerance".into(),
        ));
    }

    let mut signed = Vec::with_capacity(payload.len() + 16);
    signed.extend_from_slice(timestamp.to_string().as_bytes());
    signed.push(b'.');
    signed.extend_from_slice(payload);

    let expected = hmac_sha256(secret.as_bytes(), &signed);
    if signatures.iter().any(|sig| constant_time_eq(sig, &expected)) {
        Ok(())
    } else {
        Err(AcademyError::InvalidSignature("signature mismatch".into()))
    }
}

#[derive(Deserialize)]
struct Event {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Deserialize)]
struct EventData {
    object: serde_json::Value,
}

#[derive(Deserialize)]
struct SessionObject {
    id: String,
    amount_total: Option<i64>,
    currency: Option<String>,
    payment_status: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
struct PaymentIntentObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Decode a verified payload into a [`PaymentEvent`]
pub fn parse_event(payload: &[u8]) -> AcademyResult<PaymentEvent> {
    let event: Event = serde_json::from_slice(payload)
        .map_err(|e| AcademyError::ValidationFailed(format!("malformed event: {e}")))?;

    match event.event_type.as_str() {
        EVENT_CHECKOUT_COMPLETED | EVENT_ASYNC_PAYMENT_SUCCEEDED => {
            let session: SessionObject = decode_object(event.data.object)?;

            // Delayed payment methods complete the session before funds arrive
            if session.payment_status.as_deref() == Some("unpaid") {
                return Ok(PaymentEvent::Ignored {
                    event_type: event.event_type,
                });
            }

            let metadata = CheckoutMetadata::from_map(&session.metadata)?;
            Ok(PaymentEvent::CheckoutCompleted(CompletedCheckout {
                event_id: event.id,
                session_id: session.id,
                amount_total: Money::from_minor(session.amount_total.unwrap_or_default()),
                currency: session.currency.unwrap_or_default(),
                metadata,
            }))
        }
        EVENT_CHECKOUT_EXPIRED | EVENT_ASYNC_PAYMENT_FAILED => {
            let session: SessionObject = decode_object(event.data.object)?;
            let failed = FailedCheckout {
                event_id: event.id,
                reference: session.id,
                metadata: CheckoutMetadata::from_map(&session.metadata).ok(),
            };
            if event.event_type == EVENT_CHECKOUT_EXPIRED {
                Ok(PaymentEvent::CheckoutExpired(failed))
            } else {
                Ok(PaymentEvent::PaymentFailed(failed))
            }
        }
        EVENT_PAYMENT_INTENT_FAILED => {
            let intent: PaymentIntentObject = decode_object(event.data.object)?;
            Ok(PaymentEvent::PaymentFailed(FailedCheckout {
                event_id: event.id,
                reference: intent.id,
                metadata: CheckoutMetadata::from_map(&intent.metadata).ok(),
            }))
        }
        _ => Ok(PaymentEvent::Ignored {
            event_type: event.event_type,
        }),
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(object: serde_json::Value) -> AcademyResult<T> {
    serde_json::from_value(object)
        .map_err(|e| AcademyError::ValidationFailed(format!("malformed event object: {e}")))
}

/// Build a valid signature header, as Stripe would send it
#[cfg(test)]
pub(crate) fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);
    format!(
        "t={timestamp},v1={}",
        platform::crypto::to_hex(&hmac_sha256(secret.as_bytes(), &signed))
    )
}

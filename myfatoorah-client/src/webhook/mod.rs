//! Webhook notifications.
//!
//! The gateway posts an envelope to the merchant's endpoint whenever a
//! transaction, refund, balance transfer or supplier changes state:
//!
//! ```json
//! {
//!   "EventType": 1,
//!   "Event": "TransactionsStatusChanged",
//!   "DateTime": "07072021091213",
//!   "CountryIsoCode": "KWT",
//!   "Data": { "InvoiceId": 2047578, "TransactionStatus": "SUCCESS" }
//! }
//! ```
//!
//! The `Data` object is signed with the account webhook secret and the signature
//! is sent in the [`SIGNATURE_HEADER`] header. See [`signature`] for the scheme.
//!
//! # Examples
//!
//! ```
//! use myfatoorah_client::webhook::{WebhookEvent, WebhookNotification, WebhookPayload, sign};
//! use serde_json::json;
//!
//! let data = json!({"InvoiceId": 42, "TransactionStatus": "SUCCESS"});
//! let payload = WebhookPayload::from_json(&data).unwrap();
//! let signature = sign(&payload, "secret", WebhookEvent::TransactionStatusChanged).unwrap();
//!
//! let body = json!({"EventType": 1, "Event": "TransactionsStatusChanged", "Data": data});
//! let notification = WebhookNotification::parse(&body.to_string(), "secret", &signature).unwrap();
//! assert_eq!(notification.event, WebhookEvent::TransactionStatusChanged);
//! ```

pub mod signature;


use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

pub use signature::{WebhookPayload, is_signature_valid, sign};

use crate::{
    error::{GatewayError, Result},
    gateway::LOG_TARGET,
};

/// HTTP header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "MyFatoorah-Signature";

/// Kind of webhook notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookEvent {
    /// A transaction changed status (code 1).
    TransactionStatusChanged,
    /// A refund changed status (code 2).
    RefundStatusChanged,
    /// A balance was transferred (code 3).
    BalanceTransferred,
    /// A supplier changed status (code 4).
    SupplierStatusChanged,
    /// Any other code.
    Unknown(i64),
}

impl WebhookEvent {
    /// Returns the numeric event code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::TransactionStatusChanged => 1,
            Self::RefundStatusChanged => 2,
            Self::BalanceTransferred => 3,
            Self::SupplierStatusChanged => 4,
            Self::Unknown(code) => code,
        }
    }
}

impl From<i64> for WebhookEvent {
    fn from(code: i64) -> Self {
        match code {
            1 => Self::TransactionStatusChanged,
            2 => Self::RefundStatusChanged,
            3 => Self::BalanceTransferred,
            4 => Self::SupplierStatusChanged,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransactionStatusChanged => f.write_str("TransactionsStatusChanged"),
            Self::RefundStatusChanged => f.write_str("RefundStatusChanged"),
            Self::BalanceTransferred => f.write_str("BalanceTransferred"),
            Self::SupplierStatusChanged => f.write_str("SupplierStatusChanged"),
            Self::Unknown(code) => write!(f, "Unknown({code})"),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    event_type: Value,
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    country_iso_code: Option<String>,
    #[serde(default)]
    data: Value,
}

/// A verified webhook notification.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookNotification {
    /// Event kind.
    pub event: WebhookEvent,
    /// Event name as sent by the gateway.
    pub event_name: String,
    /// Event timestamp as sent by the gateway.
    pub date_time: String,
    /// Country of the vendor account.
    pub country_iso_code: String,
    /// The signed fields of `Data`.
    pub payload: WebhookPayload,
    /// The `Data` object.
    pub data: Value,
}

impl WebhookNotification {
    /// Parses a webhook body and verifies its signature.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedResponse`] if the body is not a webhook
    /// envelope and [`GatewayError::InvalidSignature`] if `signature` does not
    /// match the `Data` object.
    pub fn parse(body: &str, secret: &str, signature: &str) -> Result<Self> {
        let envelope: Envelope = serde_json::from_str(body)
            .map_err(|e| GatewayError::MalformedResponse(format!("webhook body: {e}")))?;

        let code = match &envelope.event_type {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| GatewayError::MalformedResponse("webhook EventType is not a number".to_owned()))?;
        let event = WebhookEvent::from(code);

        let payload = WebhookPayload::from_json(&envelope.data)?;
        if !is_signature_valid(&payload, secret, signature, event) {
            warn!(target: LOG_TARGET, event = %event, "webhook signature mismatch");
            return Err(GatewayError::InvalidSignature);
        }

        Ok(Self {
            event,
            event_name: envelope.event.unwrap_or_default(),
            date_time: envelope.date_time.unwrap_or_default(),
            country_iso_code: envelope.country_iso_code.unwrap_or_default(),
            payload,
            data: envelope.data,
        })
    }
}

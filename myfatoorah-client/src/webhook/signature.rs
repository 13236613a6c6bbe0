//! Webhook signature computation and verification.
//!
//! The gateway signs the `Data` object of every webhook notification:
//!
//! 1. For refund events (type 2) the `GatewayReference` field is left out.
//! 2. Fields are sorted by name, ASCII case-insensitively; equal names keep
//!    their order.
//! 3. The canonical string is `name=value` pairs joined with `,`.
//! 4. The signature is the standard base64 encoding of the raw HMAC-SHA256 of the
//!    canonical string, keyed with the account webhook secret.

use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::WebhookEvent;
use crate::{
    error::{GatewayError, Result},
    gateway::classify::scalar_text,
};

type HmacSha256 = Hmac<Sha256>;

/// Field left out of the signature of refund notifications.
const REFUND_EXCLUDED_FIELD: &str = "GatewayReference";

/// Text the gateway signs for a nested array or object.
const NESTED_VALUE_TEXT: &str = "Array";

/// Significant digits kept when a fractional number is rendered for signing.
const FRACTION_SIGNIFICANT_DIGITS: u32 = 14;

/// Ordered `(name, value)` fields of a webhook `Data` object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookPayload {
    fields: Vec<(String, String)>,
}

impl WebhookPayload {
    /// Creates a payload from fields, keeping their order.
    #[must_use]
    pub fn new<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self { fields: fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }

    /// Builds a payload from a JSON object.
    ///
    /// Values are rendered as the gateway renders them when it signs: `null` and
    /// `false` become empty and `true` becomes `1`. Integers keep their digits.
    /// Fractional numbers lose trailing zeros, so `10.500` is `10.5` and `1.0` is
    /// `1`. Nested arrays and objects become `Array`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedResponse`] if `data` is not an object.
    pub fn from_json(data: &Value) -> Result<Self> {
        let Value::Object(map) = data else {
            return Err(GatewayError::MalformedResponse(
                "webhook Data must be a JSON object".to_owned(),
            ));
        };

        let fields = map
            .iter()
            .map(|(name, value)| (name.clone(), field_text(value)))
            .collect();
        Ok(Self { fields })
    }

    /// Returns the fields in their original order.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Returns the value of the first field called `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Builds the canonical string that is signed for `event`.
    #[must_use]
    pub fn canonical_string(&self, event: WebhookEvent) -> String {
        let mut fields: Vec<&(String, String)> = self
            .fields
            .iter()
            .filter(|(name, _)| {
                !(event == WebhookEvent::RefundStatusChanged && name == REFUND_EXCLUDED_FIELD)
            })
            .collect();

        fields.sort_by(|(a, _), (b, _)| {
            a.bytes().map(|c| c.to_ascii_lowercase()).cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
        });

        fields.iter().map(|(name, value)| format!("{name}={value}")).collect::<Vec<_>>().join(",")
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::Number(number) => number_text(&number.to_string()),
        Value::Array(_) | Value::Object(_) => NESTED_VALUE_TEXT.to_owned(),
        _ => scalar_text(value).unwrap_or_default(),
    }
}

/// Integer spellings pass through. Fractional and exponent spellings are rounded
/// to 14 significant digits and normalised; anything `Decimal` cannot hold keeps
/// its JSON spelling.
fn number_text(spelling: &str) -> String {
    if !spelling.contains(['.', 'e', 'E']) {
        return spelling.to_owned();
    }

    let parsed = if spelling.contains(['e', 'E']) {
        Decimal::from_scientific(spelling).ok()
    } else {
        spelling.parse::<Decimal>().ok()
    };

    parsed
        .and_then(|value| value.round_sf(FRACTION_SIGNIFICANT_DIGITS))
        .map_or_else(|| spelling.to_owned(), |value| value.normalize().to_string())
}

/// Computes the signature of `payload` for `event`.
///
/// # Errors
///
/// Returns [`GatewayError::Config`] if the HMAC cannot be keyed with `secret`.
///
/// # Examples
///
/// ```
/// use myfatoorah_client::webhook::{WebhookEvent, WebhookPayload, is_signature_valid, sign};
///
/// let payload = WebhookPayload::new([("InvoiceId", "42"), ("TransactionStatus", "SUCCESS")]);
/// let signature = sign(&payload, "secret", WebhookEvent::TransactionStatusChanged).unwrap();
///
/// assert!(is_signature_valid(&payload, "secret", &signature, WebhookEvent::TransactionStatusChanged));
/// ```
pub fn sign(payload: &WebhookPayload, secret: &str, event: WebhookEvent) -> Result<String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|_| GatewayError::Config("invalid webhook secret".to_owned()))?;
    mac.update(payload.canonical_string(event).as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, digest))
}

/// Checks `signature` against `payload` in constant time.
#[must_use]
pub fn is_signature_valid(
    payload: &WebhookPayload,
    secret: &str,
    signature: &str,
    event: WebhookEvent,
) -> bool {
    sign(payload, secret, event)
        .is_ok_and(|expected| bool::from(expected.as_bytes().ct_eq(signature.as_bytes())))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload() -> WebhookPayload {
        WebhookPayload::new([
            ("PaymentId", "07072047578217"),
            ("InvoiceId", "2047578"),
            ("GatewayReference", "123456"),
            ("amount", "10.000"),
        ])
    }

    #[test]
    fn test_canonical_string_sorted_case_insensitively() {
        assert_eq!(
            payload().canonical_string(WebhookEvent::TransactionStatusChanged),
            "amount=10.000,GatewayReference=123456,InvoiceId=2047578,PaymentId=07072047578217"
        );
    }

    #[test]
    fn test_canonical_string_refund_drops_gateway_reference() {
        assert_eq!(
            payload().canonical_string(WebhookEvent::RefundStatusChanged),
            "amount=10.000,InvoiceId=2047578,PaymentId=07072047578217"
        );
    }

    #[test]
    fn test_known_signature() {
        let payload = WebhookPayload::new([("b", "2"), ("A", "1")]);
        // HMAC-SHA256("key", "A=1,b=2"), base64
        let expected = {
            let mut mac = <HmacSha256 as Mac>::new_from_slice(b"key").unwrap();
            mac.update(b"A=1,b=2");
            base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                mac.finalize().into_bytes(),
            )
        };

        assert_eq!(sign(&payload, "key", WebhookEvent::Unknown(0)).unwrap(), expected);
    }

    #[test]
    fn test_signature_valid_and_tampered() {
        let payload = payload();
        let event = WebhookEvent::TransactionStatusChanged;
        let signature = sign(&payload, "secret", event).unwrap();

        assert!(is_signature_valid(&payload, "secret", &signature, event));
        assert!(!is_signature_valid(&payload, "other-secret", &signature, event));
        assert!(!is_signature_valid(&payload, "secret", "", event));

        let tampered = WebhookPayload::new([
            ("PaymentId", "07072047578217"),
            ("InvoiceId", "2047579"),
            ("GatewayReference", "123456"),
            ("amount", "10.000"),
        ]);
        assert!(!is_signature_valid(&tampered, "secret", &signature, event));
    }

    #[test]
    fn test_refund_signature_ignores_gateway_reference() {
        let event = WebhookEvent::RefundStatusChanged;
        let signature = sign(&payload(), "secret", event).unwrap();

        let changed = WebhookPayload::new([
            ("PaymentId", "07072047578217"),
            ("InvoiceId", "2047578"),
            ("GatewayReference", "999999"),
            ("amount", "10.000"),
        ]);
        assert!(is_signature_valid(&changed, "secret", &signature, event));
    }

    #[test]
    fn test_payload_from_json() {
        let data = json!({
            "InvoiceId": 2047578,
            "Amount": 10.5,
            "IsRefund": true,
            "IsVoid": false,
            "Comments": null,
            "Reference": "2021000123"
        });

        let payload = WebhookPayload::from_json(&data).unwrap();
        assert_eq!(payload.get("InvoiceId"), Some("2047578"));
        assert_eq!(payload.get("Amount"), Some("10.5"));
        assert_eq!(payload.get("IsRefund"), Some("1"));
        assert_eq!(payload.get("IsVoid"), Some(""));
        assert_eq!(payload.get("Comments"), Some(""));
        assert_eq!(payload.fields().len(), 6);
    }

    #[test]
    fn test_payload_from_raw_body_renders_numbers_like_gateway() {
        let data: Value = serde_json::from_str(
            r#"{"Amount": 10.500, "Rate": 1.0, "Fee": 0.250, "InvoiceId": 2047578,
                "Small": 1.5e-3, "Items": [1, 2], "Customer": {"Name": "Ali"}}"#,
        )
        .unwrap();

        let payload = WebhookPayload::from_json(&data).unwrap();
        assert_eq!(payload.get("Amount"), Some("10.5"));
        assert_eq!(payload.get("Rate"), Some("1"));
        assert_eq!(payload.get("Fee"), Some("0.25"));
        assert_eq!(payload.get("InvoiceId"), Some("2047578"));
        assert_eq!(payload.get("Small"), Some("0.0015"));
        assert_eq!(payload.get("Items"), Some("Array"));
        assert_eq!(payload.get("Customer"), Some("Array"));
    }

    #[test]
    fn test_signature_over_trailing_zero_amount() {
        let data: Value =
            serde_json::from_str(r#"{"InvoiceId": 2047578, "Amount": 10.500}"#).unwrap();
        let expected = WebhookPayload::new([("InvoiceId", "2047578"), ("Amount", "10.5")]);
        let event = WebhookEvent::TransactionStatusChanged;
        let signature = sign(&expected, "secret", event).unwrap();

        let payload = WebhookPayload::from_json(&data).unwrap();
        assert_eq!(payload.canonical_string(event), "Amount=10.5,InvoiceId=2047578");
        assert!(is_signature_valid(&payload, "secret", &signature, event));
    }

    #[test]
    fn test_number_text() {
        assert_eq!(number_text("42"), "42");
        assert_eq!(number_text("-7"), "-7");
        assert_eq!(number_text("3.000"), "3");
        assert_eq!(number_text("0.1234567890123456"), "0.12345678901235");
        assert_eq!(number_text("2E3"), "2000");
    }

    #[test]
    fn test_payload_from_json_requires_object() {
        assert!(matches!(
            WebhookPayload::from_json(&json!([1, 2])),
            Err(GatewayError::MalformedResponse(_))
        ));
    }
}

//! Payment data models.
//!
//! Typed views of the gateway payloads. Field names follow the gateway's
//! PascalCase wire names. The gateway is loose with types (ids arrive as numbers
//! or strings, amounts as numbers, strings or `null`), so the deserializers in
//! [`de`] accept every spelling seen in practice.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::currency::GatewayAmount;

/// Status of a single transaction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransactionStatus {
    /// The payment went through. The gateway spells it `Succss`.
    Succeeded,
    /// The payment was declined or errored.
    Failed,
    /// The customer has not finished paying.
    InProgress,
    /// The attempt was cancelled.
    Canceled,
    /// The amount was authorized but not captured.
    Authorized,
    /// Any other status, verbatim.
    Other(String),
}

impl TransactionStatus {
    /// Returns the status as the gateway spells it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Succeeded => "Succss",
            Self::Failed => "Failed",
            Self::InProgress => "InProgress",
            Self::Canceled => "Canceled",
            Self::Authorized => "Authorize",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for TransactionStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Succss" | "Success" | "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            "InProgress" => Self::InProgress,
            "Canceled" | "Cancelled" => Self::Canceled,
            "Authorize" | "Authorized" => Self::Authorized,
            _ => Self::Other(raw),
        }
    }
}

impl<'de> Deserialize<'de> for TransactionStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        de::text(deserializer).map(Self::from)
    }
}

impl Serialize for TransactionStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payment attempt on an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transaction {
    /// Gateway payment id.
    #[serde(default, deserialize_with = "de::text")]
    pub payment_id: String,
    /// Gateway transaction id.
    #[serde(default, deserialize_with = "de::text")]
    pub transaction_id: String,
    /// Attempt status.
    #[serde(default = "unknown_status")]
    pub transaction_status: TransactionStatus,
    /// Attempt timestamp, as sent (`2021-03-03T10:20:30.123`).
    #[serde(default, deserialize_with = "de::text")]
    pub transaction_date: String,
    /// Payment method used.
    #[serde(default, deserialize_with = "de::text")]
    pub payment_gateway: String,
    /// Bank reference.
    #[serde(default, deserialize_with = "de::text")]
    pub reference_id: String,
    /// Bank track id.
    #[serde(default, deserialize_with = "de::text")]
    pub track_id: String,
    /// Bank authorization id.
    #[serde(default, deserialize_with = "de::text")]
    pub authorization_id: String,
    /// Amount of the attempt. The gateway spells the field `TransationValue`.
    #[serde(rename = "TransationValue", default, deserialize_with = "de::decimal")]
    pub transaction_value: Option<Decimal>,
    /// Currency the customer paid in.
    #[serde(default, deserialize_with = "de::text")]
    pub paid_currency: String,
    /// Amount the customer paid, in `paid_currency`.
    #[serde(default, deserialize_with = "de::decimal")]
    pub paid_currency_value: Option<Decimal>,
    /// Error message of a failed attempt.
    #[serde(default, deserialize_with = "de::text")]
    pub error: String,
    /// Error code of a failed attempt.
    #[serde(default, deserialize_with = "de::text")]
    pub error_code: String,
}

fn unknown_status() -> TransactionStatus {
    TransactionStatus::Other(String::new())
}

/// Typed view of the `Data` object returned by `GetPaymentStatus`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    /// Invoice id.
    #[serde(default, deserialize_with = "de::text")]
    pub invoice_id: String,
    /// Raw invoice status (`Pending`, `Paid`, `Canceled`, `DuplicatePayment`).
    #[serde(default, deserialize_with = "de::text")]
    pub invoice_status: String,
    /// Gateway invoice reference.
    #[serde(default, deserialize_with = "de::text")]
    pub invoice_reference: String,
    /// Merchant order id.
    #[serde(default, deserialize_with = "de::text")]
    pub customer_reference: String,
    /// Creation timestamp, as sent.
    #[serde(default, deserialize_with = "de::text")]
    pub created_date: String,
    /// Expiry date, as sent (`March 3, 2021`).
    #[serde(default, deserialize_with = "de::text")]
    pub expiry_date: String,
    /// Expiry time of day, as sent (`10:20:30.000`).
    #[serde(default, deserialize_with = "de::text")]
    pub expiry_time: String,
    /// Invoice amount in the account currency.
    #[serde(default, deserialize_with = "de::decimal")]
    pub invoice_value: Option<Decimal>,
    /// Amount and currency shown to the customer (`100.500 KD`).
    #[serde(default, deserialize_with = "de::text")]
    pub invoice_display_value: String,
    /// Comments.
    #[serde(default, deserialize_with = "de::text")]
    pub comments: String,
    /// Customer name.
    #[serde(default, deserialize_with = "de::text")]
    pub customer_name: String,
    /// Customer mobile number.
    #[serde(default, deserialize_with = "de::text")]
    pub customer_mobile: String,
    /// Customer email.
    #[serde(default, deserialize_with = "de::text")]
    pub customer_email: String,
    /// Merchant-defined field.
    #[serde(default, deserialize_with = "de::text")]
    pub user_defined_field: String,
    /// Payment attempts in gateway order.
    #[serde(default, deserialize_with = "de::list")]
    pub invoice_transactions: Vec<Transaction>,
}

/// One payment method returned by `InitiatePayment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentMethod {
    /// Gateway id used as `PaymentMethodId`.
    pub payment_method_id: i64,
    /// Arabic name.
    #[serde(default, deserialize_with = "de::text")]
    pub payment_method_ar: String,
    /// English name.
    #[serde(default, deserialize_with = "de::text")]
    pub payment_method_en: String,
    /// Short code (`kn`, `vm`, `ap`, ...).
    #[serde(default, deserialize_with = "de::text")]
    pub payment_method_code: String,
    /// Card data can be posted directly.
    #[serde(default, deserialize_with = "de::flag")]
    pub is_direct_payment: bool,
    /// Usable inside an embedded payment form.
    #[serde(default, deserialize_with = "de::flag")]
    pub is_embedded_supported: bool,
    /// Service charge.
    #[serde(default, deserialize_with = "de::decimal")]
    pub service_charge: Option<Decimal>,
    /// Total amount, in `currency_iso`.
    #[serde(default, deserialize_with = "de::decimal")]
    pub total_amount: Option<Decimal>,
    /// Currency of `total_amount`.
    #[serde(default, deserialize_with = "de::text")]
    pub currency_iso: String,
    /// Currency the method charges in.
    #[serde(default, deserialize_with = "de::text")]
    pub payment_currency_iso: String,
    /// Logo URL.
    #[serde(default, deserialize_with = "de::text")]
    pub image_url: String,
    /// Amount the method will charge, computed from the account exchange rates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_data: Option<GatewayAmount>,
}

impl PaymentMethod {
    /// Code of the Apple Pay method.
    pub const APPLE_PAY_CODE: &'static str = "ap";

    /// Returns `true` for the Apple Pay method.
    #[must_use]
    pub fn is_apple_pay(&self) -> bool {
        self.payment_method_code == Self::APPLE_PAY_CODE
    }
}

/// Payment methods grouped for a checkout page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentMethods {
    /// Every method shown, in gateway order.
    pub all: Vec<PaymentMethod>,
    /// Redirect methods (hosted payment page).
    pub cards: Vec<PaymentMethod>,
    /// Methods shown inside the embedded form.
    pub form: Vec<PaymentMethod>,
    /// The single Apple Pay method shown as a native button.
    pub apple_pay: Option<PaymentMethod>,
}

/// Payment page of a created invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceUrl {
    /// URL to send the customer to.
    pub invoice_url: String,
    /// Gateway invoice id.
    pub invoice_id: String,
}

/// Invoice creation payload.
///
/// Only the common fields are typed; anything else the gateway accepts goes
/// into `extra` and is sent as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentRequest {
    /// Customer name.
    pub customer_name: String,
    /// Invoice amount, in `display_currency_iso`.
    pub invoice_value: Decimal,
    /// Currency of `invoice_value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_currency_iso: Option<String>,
    /// Customer email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    /// Country calling code of `customer_mobile`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_country_code: Option<String>,
    /// Customer mobile number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_mobile: Option<String>,
    /// Redirect target after a successful payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_back_url: Option<String>,
    /// Redirect target after a failed payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_url: Option<String>,
    /// Payment page language (`en`, `ar`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Merchant order id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_reference: Option<String>,
    /// Merchant-defined field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_defined_field: Option<String>,
    /// Additional gateway fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Card data for a direct payment.
///
/// `Debug` output masks the card number and hides the security code.
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CardInfo {
    /// `card` or `token`.
    pub payment_type: String,
    /// Skip 3-D Secure, where the account allows it.
    #[serde(rename = "Bypass3DS")]
    pub bypass_3ds: bool,
    /// Ask the gateway to tokenize the card.
    pub save_token: bool,
    /// Card details; absent for token payments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    /// Saved card token; absent for card payments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Card details.
#[derive(Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Card {
    /// Card number.
    pub number: String,
    /// Two-digit expiry month.
    pub expiry_month: String,
    /// Two-digit expiry year.
    pub expiry_year: String,
    /// CVV.
    pub security_code: String,
    /// Name on the card.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_holder_name: Option<String>,
}

impl fmt::Debug for CardInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInfo")
            .field("payment_type", &self.payment_type)
            .field("bypass_3ds", &self.bypass_3ds)
            .field("save_token", &self.save_token)
            .field("card", &self.card)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4 = self.number.get(self.number.len().saturating_sub(4)..).unwrap_or_default();
        f.debug_struct("Card")
            .field("number", &format_args!("**** {last4}"))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("security_code", &"[REDACTED]")
            .field("card_holder_name", &self.card_holder_name)
            .finish()
    }
}

/// Lenient deserializers for gateway payloads.
pub(crate) mod de {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, de::Error};
    use serde_json::Value;

    use crate::gateway::classify::scalar_text;

    /// Any scalar as text; `null` as empty.
    pub(crate) fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(scalar_text(&value).unwrap_or_default())
    }

    /// A number or numeric string; `null` and empty strings as `None`.
    pub(crate) fn decimal<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Decimal>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s.trim().is_empty() => Ok(None),
            Value::String(s) => parse_decimal(s.trim()).map(Some).map_err(D::Error::custom),
            Value::Number(n) => parse_decimal(&n.to_string()).map(Some).map_err(D::Error::custom),
            other => Err(D::Error::custom(format!("expected a decimal, got {other}"))),
        }
    }

    /// A JSON boolean or a loosely truthy scalar.
    pub(crate) fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(crate::gateway::classify::is_truthy(&value))
    }

    /// A list; `null` as empty.
    pub(crate) fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
    }

    pub(crate) fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
        Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s))
    }
}

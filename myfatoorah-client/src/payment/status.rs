//! Payment status resolution.
//!
//! `GetPaymentStatus` does not say *why* an invoice is not paid yet. The
//! resolver reconstructs it from the transaction history and the expiry
//! timestamp:
//!
//! - `Paid` / `DuplicatePayment` invoices are confirmed by their first
//!   succeeded transaction.
//! - Any other invoice is `Failed` when the relevant transaction failed,
//!   `Expired` when its expiry has passed in the gateway time zone, and
//!   `Pending` otherwise.
//!
//! Before anything is derived the invoice is checked against what the caller
//! expects (order id, price, currency), so a leaked or guessed key cannot be
//! used to mark a different order as paid.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::models::{Invoice, Transaction, TransactionStatus};
use crate::{
    error::{GatewayError, Result},
    gateway::{LOG_TARGET, Operation},
};

/// Offset of the gateway time zone (Asia/Kuwait, no daylight saving).
const GATEWAY_UTC_OFFSET_HOURS: i64 = 3;

/// How the invoice is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// The key is a payment id (one transaction attempt).
    PaymentId,
    /// The key is an invoice id.
    InvoiceId,
}

impl KeyType {
    /// Returns the key type as the gateway spells it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PaymentId => "PaymentId",
            Self::InvoiceId => "InvoiceId",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PaymentId" | "paymentid" | "payment-id" => Ok(Self::PaymentId),
            "InvoiceId" | "invoiceid" | "invoice-id" => Ok(Self::InvoiceId),
            other => Err(GatewayError::Config(format!("unknown key type: {other}"))),
        }
    }
}

/// What the caller expects the invoice to belong to.
///
/// Each field is checked only when present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderExpectation {
    /// Merchant order id, compared with `CustomerReference`.
    pub order_id: Option<String>,
    /// Amount shown to the customer, compared with `InvoiceDisplayValue`.
    pub price: Option<Decimal>,
    /// Currency shown to the customer, compared with `InvoiceDisplayValue`.
    pub currency: Option<String>,
}

impl OrderExpectation {
    /// Expects the invoice of `order_id`.
    #[must_use]
    pub fn order(order_id: impl Into<String>) -> Self {
        Self { order_id: Some(order_id.into()), ..Self::default() }
    }

    /// Also expects `price` in `currency`.
    #[must_use]
    pub fn with_amount(mut self, price: Decimal, currency: impl Into<String>) -> Self {
        self.price = Some(price);
        self.currency = Some(currency.into());
        self
    }
}

/// Derived invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InvoiceStatus {
    /// Paid, confirmed by a succeeded transaction.
    Paid,
    /// The relevant transaction failed.
    Failed,
    /// Not paid and past its expiry.
    Expired,
    /// Not paid yet.
    Pending,
    /// Reported as a duplicate payment without a succeeded transaction.
    DuplicatePayment,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Paid => "Paid",
            Self::Failed => "Failed",
            Self::Expired => "Expired",
            Self::Pending => "Pending",
            Self::DuplicatePayment => "DuplicatePayment",
        })
    }
}

/// Outcome of a status check.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceStatusResult {
    /// Derived status.
    pub status: InvoiceStatus,
    /// Customer-facing reason; empty when paid.
    pub error_text: String,
    /// Transaction backing `status`. Present for `Paid` and `Failed`.
    pub focus_transaction: Option<Transaction>,
    /// Typed invoice, as sent by the gateway.
    pub invoice: Invoice,
    /// The `Data` object, as sent by the gateway.
    pub raw_data: Value,
}

/// Resolves the status of the invoice in `data` at the current time.
///
/// `data` is the `Data` object of a successful `GetPaymentStatus` call and `key`
/// the id it was looked up with.
///
/// # Errors
///
/// Returns [`GatewayError::MalformedResponse`] if `data` is not an invoice and
/// [`GatewayError::Mismatch`] if the invoice does not match `expectation`.
pub fn resolve(
    data: &Value,
    key: &str,
    key_type: KeyType,
    expectation: &OrderExpectation,
) -> Result<InvoiceStatusResult> {
    resolve_at(data, key, key_type, expectation, Utc::now())
}

/// Like [`resolve`], with an explicit current instant.
///
/// # Errors
///
/// See [`resolve`].
pub fn resolve_at(
    data: &Value,
    key: &str,
    key_type: KeyType,
    expectation: &OrderExpectation,
    now: DateTime<Utc>,
) -> Result<InvoiceStatusResult> {
    let invoice: Invoice = serde_json::from_value(data.clone())
        .map_err(|e| GatewayError::MalformedResponse(format!("invoice data: {e}")))?;

    if let Err(error) = check_order(&invoice, expectation) {
        warn!(
            target: LOG_TARGET,
            error = %error,
            "Order #{} ----- {} - Exception is {error}",
            invoice.customer_reference,
            Operation::GetPaymentStatus.label()
        );
        return Err(error);
    }

    let (status, error_text, focus_transaction) = match invoice.invoice_status.as_str() {
        "Paid" | "DuplicatePayment" => settled(&invoice),
        _ => unsettled(&invoice, key, key_type, now)?,
    };

    if error_text.is_empty() {
        info!(
            target: LOG_TARGET,
            status = %status,
            "Order #{} ----- {} - Status is {status}",
            invoice.customer_reference,
            Operation::GetPaymentStatus.label()
        );
    } else {
        info!(
            target: LOG_TARGET,
            status = %status,
            "Order #{} ----- {} - Status is {status}. Error is {error_text}",
            invoice.customer_reference,
            Operation::GetPaymentStatus.label()
        );
    }

    Ok(InvoiceStatusResult {
        status,
        error_text,
        focus_transaction,
        invoice,
        raw_data: data.clone(),
    })
}

fn check_order(invoice: &Invoice, expectation: &OrderExpectation) -> Result<()> {
    if let Some(order_id) = &expectation.order_id
        && *order_id != invoice.customer_reference
    {
        return Err(GatewayError::Mismatch(format!(
            "invoice belongs to order '{}', not '{order_id}'",
            invoice.customer_reference
        )));
    }

    if expectation.price.is_none() && expectation.currency.is_none() {
        return Ok(());
    }

    let mut parts = invoice.invoice_display_value.split(' ');
    let amount_text = parts.next().unwrap_or_default();
    let currency = parts.next().unwrap_or_default();

    if let Some(price) = expectation.price {
        let digits: String =
            amount_text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
        match Decimal::from_str(&digits) {
            Ok(amount) if amount == price => {}
            _ => {
                return Err(GatewayError::Mismatch(format!(
                    "invoice amount '{amount_text}' is not {price}"
                )));
            }
        }
    }

    if let Some(expected) = &expectation.currency
        && expected != currency
    {
        return Err(GatewayError::Mismatch(format!(
            "invoice currency '{currency}' is not '{expected}'"
        )));
    }

    Ok(())
}

type Derived = (InvoiceStatus, String, Option<Transaction>);

fn settled(invoice: &Invoice) -> Derived {
    let found = invoice
        .invoice_transactions
        .iter()
        .find(|t| t.transaction_status == TransactionStatus::Succeeded);

    match found {
        Some(transaction) => (InvoiceStatus::Paid, String::new(), Some(transaction.clone())),
        // No succeeded transaction on a paid invoice: the gateway status is kept
        // as reported, with no focus transaction. It is unclear whether this can
        // happen upstream; callers should not treat it as confirmed.
        None if invoice.invoice_status == "DuplicatePayment" => {
            (InvoiceStatus::DuplicatePayment, String::new(), None)
        }
        None => (InvoiceStatus::Paid, String::new(), None),
    }
}

fn unsettled(
    invoice: &Invoice,
    key: &str,
    key_type: KeyType,
    now: DateTime<Utc>,
) -> Result<Derived> {
    let candidate = match key_type {
        KeyType::PaymentId => last_transaction_of_payment(invoice, key),
        KeyType::InvoiceId => last_transaction_of_invoice(invoice),
    };

    if let Some(transaction) = candidate
        && transaction.transaction_status == TransactionStatus::Failed
    {
        let error = format!("{}.", transaction.error);
        return Ok((InvoiceStatus::Failed, error, Some(transaction.clone())));
    }

    if expiry_of(invoice)? < now {
        let error = format!("Invoice is expired since {}.", invoice.expiry_date);
        return Ok((InvoiceStatus::Expired, error, None));
    }

    Ok((InvoiceStatus::Pending, "Pending Payment.".to_owned(), None))
}

fn last_transaction_of_payment<'a>(invoice: &'a Invoice, payment_id: &str) -> Option<&'a Transaction> {
    invoice
        .invoice_transactions
        .iter()
        .find(|t| t.payment_id == payment_id && !t.error.is_empty())
}

/// Most recent transaction; on equal dates the later one in gateway order.
fn last_transaction_of_invoice(invoice: &Invoice) -> Option<&Transaction> {
    invoice.invoice_transactions.iter().max_by_key(|t| parse_timestamp(&t.transaction_date))
}

/// Expiry instant of the invoice, in UTC.
fn expiry_of(invoice: &Invoice) -> Result<DateTime<Utc>> {
    let date = parse_date(&invoice.expiry_date).ok_or_else(|| {
        GatewayError::MalformedResponse(format!("invalid ExpiryDate '{}'", invoice.expiry_date))
    })?;
    let time = parse_time(&invoice.expiry_time).ok_or_else(|| {
        GatewayError::MalformedResponse(format!("invalid ExpiryTime '{}'", invoice.expiry_time))
    })?;

    NaiveDateTime::new(date, time)
        .checked_sub_signed(TimeDelta::hours(GATEWAY_UTC_OFFSET_HOURS))
        .map(|utc| Utc.from_utc_datetime(&utc))
        .ok_or_else(|| GatewayError::MalformedResponse("ExpiryDate out of range".to_owned()))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .or_else(|| parse_timestamp(s).map(|dt| dt.date()))
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    if s.is_empty() {
        return Some(NaiveTime::MIN);
    }
    ["%H:%M:%S%.f", "%H:%M"].iter().find_map(|format| NaiveTime::parse_from_str(s, format).ok())
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

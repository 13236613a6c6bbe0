//! Payment operations.
//!
//! [`PaymentService`] wraps a shared [`GatewayClient`] with the payment
//! endpoints: listing payment methods, creating invoices, direct card payments,
//! status checks and refunds.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use myfatoorah_client::{
//!     gateway::{CountryMode, GatewayClient, GatewayConfig},
//!     payment::{KeyType, OrderExpectation, PaymentService},
//! };
//!
//! # async fn example() -> myfatoorah_client::error::Result<()> {
//! let config = GatewayConfig::new("your-api-token", CountryMode::Kwt, true);
//! let payments = PaymentService::new(Arc::new(GatewayClient::from_config(&config)?));
//!
//! let result = payments
//!     .payment_status("07072047578217", KeyType::PaymentId, &OrderExpectation::order("1001"))
//!     .await?;
//! println!("{}: {}", result.status, result.error_text);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod models;
pub mod status;

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::{Map, Value, json};
use tracing::instrument;

pub use cache::PaymentMethodsCache;
pub use models::{
    Card, CardInfo, Invoice, InvoiceUrl, PaymentMethod, PaymentMethods, PaymentRequest,
    Transaction, TransactionStatus,
};
pub use status::{InvoiceStatus, InvoiceStatusResult, KeyType, OrderExpectation, resolve, resolve_at};

use crate::{
    currency::{ExchangeRateTable, convert},
    error::{GatewayError, Result},
    gateway::{GatewayClient, Operation, classify::scalar_text},
    transport::{HttpTransport, Transport},
};

/// Gateway value that selects the gateway's own payment page.
pub const HOSTED_PAGE_GATEWAY: &str = "myfatoorah";

/// Message returned when a payment method is not enabled for the account.
const METHOD_NOT_ENABLED: &str =
    "Please contact Account Manager to enable the used payment method in your account";

/// How Apple Pay is offered on the current checkout page.
///
/// The host decides this from the customer's device and the account's domain
/// registration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ApplePayMode {
    /// The device cannot use Apple Pay; the method is left out.
    #[default]
    Hidden,
    /// The domain is registered; Apple Pay is shown as a native button.
    Registered,
    /// Apple Pay is offered through the hosted payment page.
    Redirect,
}

/// How a payment method is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayLookup {
    /// By `PaymentMethodId`.
    ById(i64),
    /// By `PaymentMethodCode`.
    ByCode(String),
}

impl GatewayLookup {
    fn matches(&self, method: &PaymentMethod) -> bool {
        match self {
            Self::ById(id) => method.payment_method_id == *id,
            Self::ByCode(code) => method.payment_method_code == *code,
        }
    }
}

/// Payment endpoints of the gateway.
#[derive(Debug)]
pub struct PaymentService<T: Transport = HttpTransport> {
    client: Arc<GatewayClient<T>>,
}

impl<T: Transport> Clone for PaymentService<T> {
    fn clone(&self) -> Self {
        Self { client: Arc::clone(&self.client) }
    }
}

impl<T: Transport> PaymentService<T> {
    /// Creates a service on a shared client.
    #[must_use]
    pub const fn new(client: Arc<GatewayClient<T>>) -> Self {
        Self { client }
    }

    /// Returns the underlying client.
    #[must_use]
    pub fn client(&self) -> &GatewayClient<T> {
        &self.client
    }

    /// Lists the payment methods enabled for `invoice_value` in `currency`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the method list cannot be read.
    pub async fn vendor_gateways(
        &self,
        invoice_value: Decimal,
        currency: &str,
    ) -> Result<Vec<PaymentMethod>> {
        let body = json!({ "InvoiceAmount": invoice_value, "CurrencyIso": currency });
        let json = self.client.call(Operation::InitiatePayment, Some(&body), None).await?;

        match json.pointer("/Data/PaymentMethods") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(methods) => serde_json::from_value(methods.clone())
                .map_err(|e| GatewayError::MalformedResponse(format!("PaymentMethods: {e}"))),
        }
    }

    /// Selects the gateways usable for a direct or a redirect payment.
    ///
    /// Redirect gateways leave out Apple Pay, which needs a native button.
    #[must_use]
    pub fn gateways_by_type(methods: &[PaymentMethod], direct: bool) -> Vec<PaymentMethod> {
        methods
            .iter()
            .filter(|m| {
                if direct { m.is_direct_payment } else { !m.is_direct_payment && !m.is_apple_pay() }
            })
            .cloned()
            .collect()
    }

    /// Looks up one enabled payment method.
    ///
    /// With `direct`, the method must support direct card payments.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PaymentMethodUnavailable`] if the method is not
    /// enabled, or not enabled for direct payments.
    pub async fn payment_method(
        &self,
        lookup: &GatewayLookup,
        invoice_value: Decimal,
        currency: &str,
        direct: bool,
    ) -> Result<PaymentMethod> {
        let methods = self.vendor_gateways(invoice_value, currency).await?;
        select_method(methods, lookup, direct)
    }

    /// Creates an invoice and returns its payment page.
    ///
    /// With a `session_id` the invoice is paid through the embedded form. Without
    /// one, an empty `gateway` or [`HOSTED_PAGE_GATEWAY`] creates a link to the
    /// gateway's payment page, and any other value is used as the
    /// `PaymentMethodId`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the response has no payment URL.
    #[instrument(
        target = "myfatoorah",
        skip_all,
        fields(gateway = gateway, order_id = order_id.unwrap_or_default())
    )]
    pub async fn invoice_url(
        &self,
        request: &PaymentRequest,
        gateway: &str,
        session_id: Option<&str>,
        order_id: Option<&str>,
    ) -> Result<InvoiceUrl> {
        if let Some(session_id) = session_id.filter(|s| !s.is_empty()) {
            let mut body = request_body(request)?;
            body.insert("SessionId".to_owned(), Value::from(session_id));
            let json = self.client.call(Operation::EmbeddedPayment, Some(&body), order_id).await?;
            return invoice_url_from(&json, "PaymentURL");
        }

        if gateway.is_empty() || gateway == HOSTED_PAGE_GATEWAY {
            let mut body = request_body(request)?;
            body.insert("NotificationOption".to_owned(), Value::from("Lnk"));
            let json = self.client.call(Operation::SendPayment, Some(&body), order_id).await?;
            return invoice_url_from(&json, "InvoiceURL");
        }

        self.execute_payment(request, gateway, order_id).await
    }

    /// Creates an invoice and pays it with card data in one step.
    ///
    /// Card data is posted to the URL returned by `ExecutePayment`; neither
    /// request nor response of that call is logged.
    ///
    /// # Errors
    ///
    /// Returns an error if either call fails.
    #[instrument(
        target = "myfatoorah",
        skip_all,
        fields(gateway = gateway, order_id = order_id.unwrap_or_default())
    )]
    pub async fn direct_payment(
        &self,
        request: &PaymentRequest,
        gateway: &str,
        card: &CardInfo,
        order_id: Option<&str>,
    ) -> Result<InvoiceUrl> {
        let invoice = self.execute_payment(request, gateway, order_id).await?;

        let json = self
            .client
            .call_target(Operation::DirectPayment, &invoice.invoice_url, Some(card), order_id)
            .await?;
        let payment_url = required_text(&json, "PaymentURL")?;

        Ok(InvoiceUrl { invoice_url: payment_url, invoice_id: invoice.invoice_id })
    }

    /// Checks the status of an invoice or payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, and [`GatewayError::Mismatch`] if the
    /// invoice does not match `expectation`.
    pub async fn payment_status(
        &self,
        key: &str,
        key_type: KeyType,
        expectation: &OrderExpectation,
    ) -> Result<InvoiceStatusResult> {
        let body = json!({ "Key": key, "KeyType": key_type });
        let json = self
            .client
            .call(Operation::GetPaymentStatus, Some(&body), expectation.order_id.as_deref())
            .await?;

        let data = json
            .get("Data")
            .ok_or_else(|| GatewayError::MalformedResponse("missing Data".to_owned()))?;
        resolve(data, key, key_type, expectation)
    }

    /// Refunds `amount`, given in `currency`, of a payment.
    ///
    /// The amount is converted into the account currency before it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnsupportedCurrency`] if the currency has no rate,
    /// or an error if a call fails.
    pub async fn refund(
        &self,
        payment_id: &str,
        amount: Decimal,
        currency: &str,
        reason: &str,
        order_id: Option<&str>,
    ) -> Result<Value> {
        let rate = self.currency_rate(currency).await?;
        let amount = amount
            .checked_div(rate)
            .ok_or_else(|| GatewayError::UnsupportedCurrency(currency.to_owned()))?
            .normalize();

        let body = json!({
            "KeyType": KeyType::PaymentId,
            "Key": payment_id,
            "RefundChargeOnCustomer": false,
            "ServiceChargeOnCustomer": false,
            "Amount": amount,
            "Comment": reason,
        });
        self.client.call(Operation::MakeRefund, Some(&body), order_id).await
    }

    /// Returns the account exchange rates.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the list cannot be read.
    pub async fn currency_rates(&self) -> Result<ExchangeRateTable> {
        let json = self.client.call::<Value>(Operation::GetCurrenciesExchangeList, None, None).await?;
        serde_json::from_value(json)
            .map_err(|e| GatewayError::MalformedResponse(format!("exchange rates: {e}")))
    }

    /// Returns the rate of `currency` relative to the account currency.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnsupportedCurrency`] if the currency is not listed.
    pub async fn currency_rate(&self, currency: &str) -> Result<Decimal> {
        self.currency_rates().await?.rate_of(currency)
    }

    /// Starts an embedded payment session and returns its `Data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails.
    pub async fn embedded_session(
        &self,
        customer_identifier: &str,
        order_id: Option<&str>,
    ) -> Result<Value> {
        let body = json!({ "CustomerIdentifier": customer_identifier });
        let json = self.client.call(Operation::InitiateSession, Some(&body), order_id).await?;
        Ok(json.get("Data").cloned().unwrap_or(Value::Null))
    }

    /// Registers the host of `site_url` for Apple Pay.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if `site_url` has no host, or an error if
    /// the call fails.
    pub async fn register_apple_pay_domain(&self, site_url: &str) -> Result<Value> {
        let url = url::Url::parse(site_url)
            .map_err(|e| GatewayError::Config(format!("invalid site URL '{site_url}': {e}")))?;
        let host = url
            .host_str()
            .ok_or_else(|| GatewayError::Config(format!("site URL '{site_url}' has no host")))?;

        let body = json!({ "DomainName": host });
        self.client.call(Operation::RegisterApplePayDomain, Some(&body), None).await
    }

    /// Returns the payment methods of a checkout page, grouped for display.
    ///
    /// Each method gets the amount it will charge in its own currency. The result
    /// is stored in `cache` and returned from it until the caller invalidates it.
    ///
    /// # Errors
    ///
    /// Returns an error if a call fails.
    pub async fn payment_methods_for_display(
        &self,
        invoice_value: Decimal,
        currency: &str,
        apple_pay: ApplePayMode,
        cache: &PaymentMethodsCache,
    ) -> Result<PaymentMethods> {
        if let Some(methods) = cache.get() {
            return Ok(methods);
        }

        let gateways = self.vendor_gateways(invoice_value, currency).await?;
        let rates = self.currency_rates().await?;

        let methods = group_payment_methods(gateways, apple_pay, currency, &rates);
        cache.store(methods.clone());
        Ok(methods)
    }

    async fn execute_payment(
        &self,
        request: &PaymentRequest,
        gateway: &str,
        order_id: Option<&str>,
    ) -> Result<InvoiceUrl> {
        let mut body = request_body(request)?;
        let method_id = gateway.parse::<i64>().map_or_else(|_| Value::from(gateway), Value::from);
        body.insert("PaymentMethodId".to_owned(), method_id);

        let json = self.client.call(Operation::ExecutePayment, Some(&body), order_id).await?;
        invoice_url_from(&json, "PaymentURL")
    }
}

/// Groups payment methods for a checkout page.
///
/// Each method gets its `gateway_data` from `rates`. Apple Pay is placed
/// according to `apple_pay`; only one Apple Pay entry is offered as a native
/// button, preferring `display_currency`, then the account default currency.
#[must_use]
pub fn group_payment_methods(
    gateways: Vec<PaymentMethod>,
    apple_pay: ApplePayMode,
    display_currency: &str,
    rates: &ExchangeRateTable,
) -> PaymentMethods {
    let mut grouped = PaymentMethods::default();
    let mut apple_pay_methods = Vec::new();

    for mut method in gateways {
        if let Some(total) = method.total_amount {
            method.gateway_data =
                Some(convert(total, &method.currency_iso, &method.payment_currency_iso, rates));
        }

        if method.is_apple_pay() {
            match apple_pay {
                ApplePayMode::Hidden => continue,
                ApplePayMode::Registered => apple_pay_methods.push(method.clone()),
                ApplePayMode::Redirect => grouped.cards.push(method.clone()),
            }
            grouped.all.push(method);
        } else if method.is_embedded_supported {
            grouped.form.push(method.clone());
            grouped.all.push(method);
        } else if !method.is_direct_payment {
            grouped.cards.push(method.clone());
            grouped.all.push(method);
        }
    }

    grouped.apple_pay = one_apple_pay(apple_pay_methods, display_currency, rates);
    grouped
}

fn one_apple_pay(
    mut methods: Vec<PaymentMethod>,
    display_currency: &str,
    rates: &ExchangeRateTable,
) -> Option<PaymentMethod> {
    let preferred = [Some(display_currency), rates.default_currency()];
    let index = preferred
        .into_iter()
        .flatten()
        .find_map(|currency| methods.iter().position(|m| m.payment_currency_iso == currency))
        .unwrap_or(0);

    (index < methods.len()).then(|| methods.swap_remove(index))
}

fn select_method(
    methods: Vec<PaymentMethod>,
    lookup: &GatewayLookup,
    direct: bool,
) -> Result<PaymentMethod> {
    let method = methods
        .into_iter()
        .find(|m| lookup.matches(m))
        .ok_or_else(|| GatewayError::PaymentMethodUnavailable(METHOD_NOT_ENABLED.to_owned()))?;

    if direct && !method.is_direct_payment {
        return Err(GatewayError::PaymentMethodUnavailable(format!(
            "{} Direct Payment Method is not activated. Kindly contact your MyFatoorah account \
             manager or sales representative to activate it.",
            method.payment_method_en
        )));
    }

    Ok(method)
}

fn request_body(request: &PaymentRequest) -> Result<Map<String, Value>> {
    match serde_json::to_value(request) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(GatewayError::Serialization("payment request is not an object".to_owned())),
        Err(e) => Err(GatewayError::Serialization(format!("payment request: {e}"))),
    }
}

fn required_text(json: &Value, field: &str) -> Result<String> {
    json.get("Data")
        .and_then(|data| data.get(field))
        .and_then(scalar_text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| GatewayError::MalformedResponse(format!("missing Data.{field}")))
}

fn invoice_url_from(json: &Value, url_field: &str) -> Result<InvoiceUrl> {
    Ok(InvoiceUrl {
        invoice_url: required_text(json, url_field)?,
        invoice_id: required_text(json, "InvoiceId")?,
    })
}

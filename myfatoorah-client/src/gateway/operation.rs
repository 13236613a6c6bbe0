//! Gateway operations.
//!
//! Every call the client makes is tagged with an [`Operation`]; it supplies the
//! endpoint path and the label used in log records.

use std::fmt;

/// A gateway API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// List the payment methods enabled for an amount.
    InitiatePayment,
    /// Create an invoice for a chosen payment method.
    ExecutePayment,
    /// Create an invoice link on the gateway's own payment page.
    SendPayment,
    /// Create an invoice paid through an embedded payment session.
    EmbeddedPayment,
    /// Post card data to the URL returned by `ExecutePayment`.
    DirectPayment,
    /// Poll the status of an invoice or payment.
    GetPaymentStatus,
    /// Refund a payment.
    MakeRefund,
    /// Start an embedded payment session.
    InitiateSession,
    /// Register a domain for Apple Pay.
    RegisterApplePayDomain,
    /// List the account exchange rates.
    GetCurrenciesExchangeList,
    /// List shipping countries.
    GetCountries,
    /// Search shipping cities of a country.
    GetCities,
    /// Quote a shipping charge.
    CalculateShippingCharge,
}

impl Operation {
    /// Returns the endpoint path relative to the API base URL.
    ///
    /// [`DirectPayment`](Self::DirectPayment) targets a URL handed out by the
    /// gateway and has no fixed path; its path is empty.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::InitiatePayment => "/v2/InitiatePayment",
            Self::ExecutePayment | Self::EmbeddedPayment => "/v2/ExecutePayment",
            Self::SendPayment => "/v2/SendPayment",
            Self::DirectPayment => "",
            Self::GetPaymentStatus => "/v2/GetPaymentStatus",
            Self::MakeRefund => "/v2/MakeRefund",
            Self::InitiateSession => "/v2/InitiateSession",
            Self::RegisterApplePayDomain => "/v2/RegisterApplePayDomain",
            Self::GetCurrenciesExchangeList => "/v2/GetCurrenciesExchangeList",
            Self::GetCountries => "/v2/GetCountries",
            Self::GetCities => "/v2/GetCities",
            Self::CalculateShippingCharge => "/v2/CalculateShippingCharge",
        }
    }

    /// Returns the human-readable label used in log records.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InitiatePayment => "Initiate Payment",
            Self::ExecutePayment => "Execute Payment",
            Self::SendPayment => "Send Payment",
            Self::EmbeddedPayment => "Embedded Payment",
            Self::DirectPayment => "Direct Payment",
            Self::GetPaymentStatus => "Get Payment Status",
            Self::MakeRefund => "Make Refund",
            Self::InitiateSession => "Initiate Session",
            Self::RegisterApplePayDomain => "Register Apple Pay Domain",
            Self::GetCurrenciesExchangeList => "Get Currencies Exchange List",
            Self::GetCountries => "Get Countries",
            Self::GetCities => "Get Cities",
            Self::CalculateShippingCharge => "Calculate Shipping Charge",
        }
    }

    /// Returns `false` for operations whose payloads must never be logged.
    #[must_use]
    pub const fn logs_payloads(self) -> bool {
        !matches!(self, Self::DirectPayment)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

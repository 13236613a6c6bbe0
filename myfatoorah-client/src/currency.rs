//! Exchange rates and gateway amount conversion.
//!
//! The gateway quotes every payment method in its own payment currency. The
//! amount shown next to a method is derived from the account exchange rates with
//! two rounding stages: the base amount is rounded *up* to two decimals, and the
//! converted amount is rounded half away from zero to three decimals.
//!
//! # Examples
//!
//! ```
//! use myfatoorah_client::currency::{ExchangeRate, ExchangeRateTable, convert};
//! use rust_decimal::Decimal;
//! use std::str::FromStr;
//!
//! let table = ExchangeRateTable::new(vec![
//!     ExchangeRate::new("KWD", Decimal::from_str("0.300").unwrap()),
//!     ExchangeRate::new("SAR", Decimal::from_str("0.0332").unwrap()),
//! ]);
//!
//! let amount = convert(Decimal::from_str("100.456").unwrap(), "KWD", "SAR", &table);
//! assert_eq!(amount.amount, Decimal::from_str("11.117").unwrap());
//! assert_eq!(amount.currency, "SAR");
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// One row of the account exchange-rate list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// ISO currency code.
    #[serde(rename = "Text")]
    pub currency_code: String,

    /// Rate relative to the account default currency.
    #[serde(rename = "Value")]
    pub rate: Decimal,
}

impl ExchangeRate {
    /// Creates a rate row.
    #[must_use]
    pub fn new(currency_code: impl Into<String>, rate: Decimal) -> Self {
        Self { currency_code: currency_code.into(), rate }
    }
}

/// Ordered exchange-rate list, as returned by `GetCurrenciesExchangeList`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRateTable(Vec<ExchangeRate>);

impl ExchangeRateTable {
    /// Creates a table from rows, keeping their order.
    #[must_use]
    pub const fn new(rates: Vec<ExchangeRate>) -> Self {
        Self(rates)
    }

    /// Returns the rows in gateway order.
    #[must_use]
    pub fn rates(&self) -> &[ExchangeRate] {
        &self.0
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the rate of `currency`, if listed. A repeated currency resolves to
    /// its first row.
    #[must_use]
    pub fn get(&self, currency: &str) -> Option<Decimal> {
        self.0.iter().find(|r| r.currency_code == currency).map(|r| r.rate)
    }

    /// Returns the rate of `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnsupportedCurrency`] if the currency is not listed.
    pub fn rate_of(&self, currency: &str) -> Result<Decimal> {
        self.get(currency).ok_or_else(|| GatewayError::UnsupportedCurrency(currency.to_owned()))
    }

    /// Returns the account default currency, the first one whose rate is exactly 1.
    #[must_use]
    pub fn default_currency(&self) -> Option<&str> {
        self.0.iter().find(|r| r.rate == Decimal::ONE).map(|r| r.currency_code.as_str())
    }
}

impl FromIterator<ExchangeRate> for ExchangeRateTable {
    fn from_iter<I: IntoIterator<Item = ExchangeRate>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An amount in the currency a payment method charges in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAmount {
    /// Amount to charge.
    #[serde(rename = "GatewayTotalAmount")]
    pub amount: Decimal,

    /// Currency of `amount`.
    #[serde(rename = "GatewayCurrency")]
    pub currency: String,
}

/// Converts `total` from `base_currency` into `target_currency`.
///
/// When either currency is missing from `table`, the base rate is zero, or the
/// arithmetic overflows, the amount is returned unchanged in `base_currency`.
#[must_use]
pub fn convert(
    total: Decimal,
    base_currency: &str,
    target_currency: &str,
    table: &ExchangeRateTable,
) -> GatewayAmount {
    let unchanged = || GatewayAmount { amount: total, currency: base_currency.to_owned() };

    let (Some(base_rate), Some(target_rate)) = (table.get(base_currency), table.get(target_currency))
    else {
        return unchanged();
    };

    let Some(base_amount) = base_amount(total, base_rate) else {
        return unchanged();
    };

    let Some(converted) = base_amount.checked_mul(target_rate) else {
        return unchanged();
    };
    let amount = converted.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero);

    GatewayAmount { amount, currency: target_currency.to_owned() }
}

/// `ceil(trunc(total * 1000) / rate / 10) / 100`; `None` on a zero rate or overflow.
fn base_amount(total: Decimal, rate: Decimal) -> Option<Decimal> {
    let mills = total.checked_mul(Decimal::ONE_THOUSAND)?.trunc();
    let cents = mills.checked_div(rate)?.checked_div(Decimal::TEN)?.ceil();
    cents.checked_div(Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn table() -> ExchangeRateTable {
        ExchangeRateTable::new(vec![
            ExchangeRate::new("KWD", dec("1")),
            ExchangeRate::new("SAR", dec("12.2")),
            ExchangeRate::new("USD", dec("3.25")),
        ])
    }

    #[test]
    fn test_two_stage_rounding() {
        let table = ExchangeRateTable::new(vec![
            ExchangeRate::new("KWD", dec("0.300")),
            ExchangeRate::new("SAR", dec("0.0332")),
        ]);

        assert_eq!(base_amount(dec("100.456"), dec("0.300")), Some(dec("334.86")));

        let amount = convert(dec("100.456"), "KWD", "SAR", &table);
        assert_eq!(amount, GatewayAmount { amount: dec("11.117"), currency: "SAR".to_owned() });
    }

    #[test]
    fn test_base_amount_rounds_up() {
        // 10001 mills / 10 = 1000.1, rounded up to 1001 cents
        assert_eq!(base_amount(dec("10.001"), dec("1")), Some(dec("10.01")));
        // sub-mill digits are truncated before dividing
        assert_eq!(base_amount(dec("10.0009"), dec("1")), Some(dec("10")));
    }

    #[test]
    fn test_convert_into_other_currency() {
        let amount = convert(dec("10"), "KWD", "SAR", &table());
        assert_eq!(amount.amount, dec("122"));
        assert_eq!(amount.currency, "SAR");
    }

    #[test]
    fn test_convert_identity_when_currency_missing() {
        let amount = convert(dec("15.5"), "EUR", "SAR", &table());
        assert_eq!(amount, GatewayAmount { amount: dec("15.5"), currency: "EUR".to_owned() });

        let amount = convert(dec("15.5"), "KWD", "EUR", &table());
        assert_eq!(amount, GatewayAmount { amount: dec("15.5"), currency: "KWD".to_owned() });

        let amount = convert(dec("15.5"), "KWD", "SAR", &ExchangeRateTable::default());
        assert_eq!(amount.currency, "KWD");
    }

    #[test]
    fn test_convert_zero_rate_is_identity() {
        let table = ExchangeRateTable::new(vec![
            ExchangeRate::new("KWD", Decimal::ZERO),
            ExchangeRate::new("SAR", dec("12.2")),
        ]);
        assert_eq!(convert(dec("5"), "KWD", "SAR", &table).currency, "KWD");
    }

    #[test]
    fn test_rate_of() {
        assert_eq!(table().rate_of("USD").unwrap(), dec("3.25"));
        assert!(matches!(table().rate_of("EUR"), Err(GatewayError::UnsupportedCurrency(c)) if c == "EUR"));
    }

    #[test]
    fn test_repeated_currency_uses_first_row() {
        let table = ExchangeRateTable::new(vec![
            ExchangeRate::new("KWD", dec("1")),
            ExchangeRate::new("SAR", dec("12.2")),
            ExchangeRate::new("SAR", dec("12.5")),
        ]);
        assert_eq!(table.get("SAR"), Some(dec("12.2")));
    }

    #[test]
    fn test_default_currency() {
        assert_eq!(table().default_currency(), Some("KWD"));
        assert_eq!(ExchangeRateTable::default().default_currency(), None);
    }

    #[test]
    fn test_table_from_gateway_json() {
        let json = r#"[{"Text":"KWD","Value":1.000},{"Text":"SAR","Value":"12.2"}]"#;
        let table: ExchangeRateTable = serde_json::from_str(json).unwrap();

        assert_eq!(table.rates().len(), 2);
        assert_eq!(table.default_currency(), Some("KWD"));
        assert_eq!(table.get("SAR"), Some(dec("12.2")));
    }

    #[test]
    fn test_gateway_amount_serializes_with_gateway_names() {
        let amount = GatewayAmount { amount: dec("11.117"), currency: "SAR".to_owned() };
        let json = serde_json::to_value(&amount).unwrap();
        assert_eq!(json["GatewayCurrency"], "SAR");
        assert!(json.get("GatewayTotalAmount").is_some());
    }
}

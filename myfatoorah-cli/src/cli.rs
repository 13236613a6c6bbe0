//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use myfatoorah_client::{payment::KeyType, shipping::ShippingMethod};
use rust_decimal::Decimal;

/// Operator tool for the MyFatoorah gateway.
#[derive(Parser, Debug)]
#[command(name = "myfatoorah", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Gateway configuration file (TOML).
    #[arg(short, long, global = true, env = "MYFATOORAH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log gateway requests and responses.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the status of an invoice or payment.
    Status {
        /// Payment id or invoice id.
        key: String,

        /// Kind of `key`.
        #[arg(long, value_enum, default_value = "payment-id")]
        key_type: KeyTypeArg,

        /// Expected merchant order id.
        #[arg(long)]
        order_id: Option<String>,

        /// Expected amount shown to the customer.
        #[arg(long)]
        price: Option<Decimal>,

        /// Expected currency shown to the customer (e.g. `KD`).
        #[arg(long)]
        currency: Option<String>,
    },

    /// Refund part or all of a payment.
    Refund {
        /// Payment id.
        payment_id: String,

        /// Amount to refund.
        amount: Decimal,

        /// Currency of `amount`.
        currency: String,

        /// Reason shown on the refund.
        #[arg(long, default_value = "")]
        reason: String,

        /// Merchant order id, for the logs.
        #[arg(long)]
        order_id: Option<String>,
    },

    /// List the account exchange rates.
    Rates,

    /// List the payment methods enabled for an amount.
    Methods {
        /// Invoice amount.
        amount: Decimal,

        /// Currency of `amount`.
        currency: String,
    },

    /// Convert an amount into a payment method's currency.
    Convert {
        /// Amount in `from`.
        amount: Decimal,

        /// Currency of `amount`.
        from: String,

        /// Target currency.
        to: String,

        /// Exchange-rate list (JSON) to use instead of fetching it.
        #[arg(long)]
        rates: Option<PathBuf>,
    },

    /// Verify a webhook notification.
    VerifyWebhook {
        /// File holding the notification body.
        body: PathBuf,

        /// Value of the `MyFatoorah-Signature` header.
        #[arg(long)]
        signature: String,

        /// Webhook secret; defaults to the configured secret.
        #[arg(long, env = "MYFATOORAH_WEBHOOK_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },

    /// Classify a stored gateway response body.
    Classify {
        /// File holding the response body.
        body: PathBuf,
    },

    /// Split a phone number into country code and number.
    Phone {
        /// Phone number as entered.
        input: String,
    },

    /// Show the gateway factor of a weight or dimension unit.
    Unit {
        /// Weight or dimension.
        #[arg(value_enum)]
        kind: UnitKind,

        /// Unit name (e.g. `lbs`, `in`).
        unit: String,
    },

    /// List shipping countries.
    Countries,

    /// Search shipping cities.
    Cities {
        /// Carrier.
        #[arg(long, value_enum, default_value = "dhl")]
        method: ShippingMethodArg,

        /// Country code.
        country: String,

        /// Search text.
        #[arg(default_value = "")]
        search: String,
    },
}

/// Lookup key kind.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KeyTypeArg {
    /// Payment id.
    PaymentId,
    /// Invoice id.
    InvoiceId,
}

impl From<KeyTypeArg> for KeyType {
    fn from(arg: KeyTypeArg) -> Self {
        match arg {
            KeyTypeArg::PaymentId => Self::PaymentId,
            KeyTypeArg::InvoiceId => Self::InvoiceId,
        }
    }
}

/// Unit kind.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum UnitKind {
    /// Weight, converted to kilograms.
    Weight,
    /// Dimension, converted to centimetres.
    Dimension,
}

/// Shipping carrier.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ShippingMethodArg {
    /// DHL.
    Dhl,
    /// Aramex.
    Aramex,
}

impl From<ShippingMethodArg> for ShippingMethod {
    fn from(arg: ShippingMethodArg) -> Self {
        match arg {
            ShippingMethodArg::Dhl => Self::Dhl,
            ShippingMethodArg::Aramex => Self::Aramex,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_status() {
        let cli = Cli::parse_from([
            "myfatoorah",
            "status",
            "2047578",
            "--key-type",
            "invoice-id",
            "--order-id",
            "1001",
            "--price",
            "10.500",
        ]);

        match cli.command {
            Command::Status { key, key_type, order_id, price, currency } => {
                assert_eq!(key, "2047578");
                assert_eq!(KeyType::from(key_type), KeyType::InvoiceId);
                assert_eq!(order_id.as_deref(), Some("1001"));
                assert_eq!(price, Some(Decimal::new(10_500, 3)));
                assert!(currency.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

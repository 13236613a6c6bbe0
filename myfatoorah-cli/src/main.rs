//! `myfatoorah` - operator tool for the MyFatoorah gateway client
//!
//! Checks payments, issues refunds, inspects payment methods and exchange rates,
//! and verifies webhook notifications from the command line. Results are printed
//! to stdout as JSON; logs go to stderr.
//!
//! Network commands read the gateway configuration from `--config` (or
//! `MYFATOORAH_CONFIG`):
//!
//! ```toml
//! api_key_env = "MYFATOORAH_API_KEY"
//! country = "KWT"
//! test_mode = true
//! webhook_secret_env = "MYFATOORAH_WEBHOOK_SECRET"
//! ```

#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest"
)]

mod cli;
mod observability;

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::Parser;
use myfatoorah_client::{
    GatewayClient, GatewayConfig, PaymentService, ShippingService,
    currency::{ExchangeRateTable, convert},
    gateway::classify_body,
    payment::{InvoiceStatusResult, OrderExpectation},
    units::{dimension_rate, parse_phone, weight_rate},
    webhook::{SIGNATURE_HEADER, WebhookNotification},
};
use serde_json::{Value, json};
use tracing::debug;

use crate::{
    cli::{Cli, Command, UnitKind},
    observability::{LogFormat, init_observability},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_observability(LogFormat::from_env(), if cli.verbose { "info" } else { "warn" });

    let output = run(cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<Value> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Status { key, key_type, order_id, price, currency } => {
            let expectation = OrderExpectation { order_id, price, currency };
            let result =
                payments(config_path)?.payment_status(&key, key_type.into(), &expectation).await?;
            Ok(status_json(&result))
        }
        Command::Refund { payment_id, amount, currency, reason, order_id } => {
            let response = payments(config_path)?
                .refund(&payment_id, amount, &currency, &reason, order_id.as_deref())
                .await?;
            Ok(response.get("Data").cloned().unwrap_or(response))
        }
        Command::Rates => Ok(serde_json::to_value(payments(config_path)?.currency_rates().await?)?),
        Command::Methods { amount, currency } => {
            let methods = payments(config_path)?.vendor_gateways(amount, &currency).await?;
            Ok(serde_json::to_value(methods)?)
        }
        Command::Convert { amount, from, to, rates } => {
            let table = match rates {
                Some(path) => read_rates(&path)?,
                None => payments(config_path)?.currency_rates().await?,
            };
            for code in [&from, &to] {
                if table.get(code).is_none() {
                    debug!(currency = %code, "currency not in rate list, amount left unchanged");
                }
            }
            Ok(serde_json::to_value(convert(amount, &from, &to, &table))?)
        }
        Command::VerifyWebhook { body, signature, secret } => {
            let secret = match secret {
                Some(secret) => secret,
                None => load_config(config_path)?
                    .webhook_secret()?
                    .context("no webhook secret configured; pass --secret")?,
            };
            let body = read_text(&body)?;
            let notification = WebhookNotification::parse(&body, &secret, &signature)
                .with_context(|| format!("{SIGNATURE_HEADER} check failed"))?;
            Ok(json!({
                "valid": true,
                "event": notification.event.to_string(),
                "event_type": notification.event.code(),
                "date_time": notification.date_time,
                "country": notification.country_iso_code,
                "data": notification.data,
            }))
        }
        Command::Classify { body } => {
            let response = classify_body(&read_text(&body)?);
            Ok(match response.error() {
                None => json!({"success": true, "data": response.data()}),
                Some(error) => json!({"success": false, "error": error.message()}),
            })
        }
        Command::Phone { input } => {
            let phone = parse_phone(&input)?;
            Ok(json!({"country_code": phone.country_code, "number": phone.number}))
        }
        Command::Unit { kind, unit } => {
            let (rate, base) = match kind {
                UnitKind::Weight => (weight_rate(&unit)?, "kg"),
                UnitKind::Dimension => (dimension_rate(&unit)?, "cm"),
            };
            Ok(json!({"unit": unit, "rate": rate, "base": base}))
        }
        Command::Countries => Ok(shipping(config_path)?.countries().await?),
        Command::Cities { method, country, search } => {
            Ok(shipping(config_path)?.cities(method.into(), &country, &search).await?)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let Some(path) = path else {
        bail!("this command needs a gateway configuration; pass --config or set MYFATOORAH_CONFIG");
    };
    GatewayConfig::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

fn client(path: Option<&Path>) -> Result<Arc<GatewayClient>> {
    let config = load_config(path)?;
    Ok(Arc::new(GatewayClient::from_config(&config)?))
}

fn payments(path: Option<&Path>) -> Result<PaymentService> {
    Ok(PaymentService::new(client(path)?))
}

fn shipping(path: Option<&Path>) -> Result<ShippingService> {
    Ok(ShippingService::new(client(path)?))
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_rates(path: &Path) -> Result<ExchangeRateTable> {
    serde_json::from_str(&read_text(path)?)
        .with_context(|| format!("{} is not an exchange-rate list", path.display()))
}

fn status_json(result: &InvoiceStatusResult) -> Value {
    json!({
        "status": result.status,
        "error": result.error_text,
        "invoice_id": result.invoice.invoice_id,
        "customer_reference": result.invoice.customer_reference,
        "focus_transaction": result.focus_transaction,
    })
}

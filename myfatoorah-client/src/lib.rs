//! MyFatoorah Client: Payment and Shipping Gateway API for Rust
//!
//! A Rust library for the MyFatoorah v2 REST API. It builds request payloads,
//! calls the gateway with bearer-token authentication, turns the gateway's
//! inconsistently shaped responses into a definitive outcome, and derives
//! payment status, refunds and shipping quotes from them.
//!
//! # What does the client decide?
//!
//! The gateway reports results in many shapes. The client owns the rules that
//! make them usable:
//!
//! - **Response classification**: success, HTML error page, validation errors,
//!   `Data.ErrorMessage`, `Message`, or a raw body, in a fixed precedence
//! - **Payment status**: `Paid`, `Failed`, `Expired` or `Pending`, reconstructed
//!   from the transaction history and the expiry time in the gateway time zone
//! - **Order matching**: a status is never derived for an invoice that belongs to
//!   another order, price or currency
//! - **Webhook signatures**: HMAC-SHA256 over the canonical field string, checked
//!   in constant time
//! - **Amount conversion**: two-stage fixed-point rounding between currencies
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │  PaymentService  │   │ ShippingService  │
//! └────────┬─────────┘   └────────┬─────────┘
//!          │  Arc<GatewayClient>  │
//! ┌────────▼──────────────────────▼─────────┐
//! │ GatewayClient: auth, logging, classify  │
//! └────────────────────┬────────────────────┘
//!                      │ Transport (HTTP)
//! ┌────────────────────▼────────────────────┐
//! │          MyFatoorah REST API            │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. Check a Payment
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use myfatoorah_client::{
//!     gateway::{CountryMode, GatewayClient, GatewayConfig},
//!     payment::{InvoiceStatus, KeyType, OrderExpectation, PaymentService},
//! };
//! use rust_decimal::Decimal;
//!
//! # async fn example() -> myfatoorah_client::error::Result<()> {
//! let config = GatewayConfig::new("your-api-token", CountryMode::Kwt, true);
//! let client = Arc::new(GatewayClient::from_config(&config)?);
//! let payments = PaymentService::new(client);
//!
//! let expectation = OrderExpectation::order("1001").with_amount(Decimal::new(10_500, 3), "KD");
//! let result = payments.payment_status("07072047578217", KeyType::PaymentId, &expectation).await?;
//!
//! if result.status == InvoiceStatus::Paid {
//!     println!("paid by {:?}", result.focus_transaction.map(|t| t.payment_gateway));
//! } else {
//!     println!("{}: {}", result.status, result.error_text);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Verify a Webhook
//!
//! ```rust
//! use myfatoorah_client::webhook::{WebhookEvent, WebhookNotification, WebhookPayload, sign};
//! use serde_json::json;
//!
//! # fn example() -> myfatoorah_client::error::Result<()> {
//! let data = json!({"InvoiceId": 42, "TransactionStatus": "SUCCESS"});
//! let signature =
//!     sign(&WebhookPayload::from_json(&data)?, "secret", WebhookEvent::TransactionStatusChanged)?;
//!
//! let body = json!({"EventType": 1, "Event": "TransactionsStatusChanged", "Data": data});
//! let notification = WebhookNotification::parse(&body.to_string(), "secret", &signature)?;
//! assert_eq!(notification.payload.get("InvoiceId"), Some("42"));
//! # Ok(())
//! # }
//! ```
//!
//! ## 3. Classify a Raw Response
//!
//! ```rust
//! use myfatoorah_client::gateway::classify_body;
//!
//! let response = classify_body(
//!     r#"{"IsSuccess":false,"ValidationErrors":[{"Name":"InvoiceValue","Error":"Required"}]}"#,
//! );
//! assert_eq!(response.error().map(|e| e.message()).as_deref(), Some("InvoiceValue: Required"));
//! ```
//!
//! # Module Organization
//!
//! - [`gateway`]: client, configuration, operations and response classification
//! - [`payment`]: payment methods, invoices, status resolution, refunds
//! - [`shipping`]: countries, cities and shipping charges
//! - [`webhook`]: webhook notifications and signatures
//! - [`currency`]: exchange rates and gateway amounts
//! - [`units`]: weight/dimension units and phone numbers
//! - [`transport`]: the HTTP seam
//! - [`error`]: error types
//!
//! # Error Handling
//!
//! All operations return [`Result<T, GatewayError>`](error::Result):
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use myfatoorah_client::{
//!     GatewayError,
//!     gateway::{CountryMode, GatewayClient, GatewayConfig},
//!     payment::{KeyType, OrderExpectation, PaymentService},
//! };
//!
//! # async fn example() -> myfatoorah_client::error::Result<()> {
//! let config = GatewayConfig::new("your-api-token", CountryMode::Kwt, true);
//! let payments = PaymentService::new(Arc::new(GatewayClient::from_config(&config)?));
//!
//! match payments.payment_status("2047578", KeyType::InvoiceId, &OrderExpectation::order("1001")).await {
//!     Ok(result) => println!("{}", result.status),
//!     Err(GatewayError::Mismatch(detail)) => eprintln!("not this order: {detail}"),
//!     Err(GatewayError::Api(error)) => eprintln!("gateway said: {}", error.message()),
//!     Err(e) => eprintln!("Other error: {e}"),
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest"
)]

pub mod currency;
pub mod error;
pub mod gateway;
pub mod payment;
pub mod shipping;
pub mod transport;
pub mod units;
pub mod webhook;

pub use error::{ApiError, GatewayError, Result};
pub use gateway::{GatewayClient, GatewayConfig};
pub use payment::PaymentService;
pub use shipping::ShippingService;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let _ = std::marker::PhantomData::<GatewayError>;
        let _ = std::marker::PhantomData::<PaymentService>;
        let _ = std::marker::PhantomData::<ShippingService>;
    }
}

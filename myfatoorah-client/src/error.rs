//! Error types for the MyFatoorah client.
//!
//! This module defines all error types that can occur while talking to the gateway.
//! All errors implement the standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Network Errors** ([`GatewayError::Http`], [`GatewayError::Transport`]): the request
//!   never produced a response body
//! - **Gateway Errors** ([`GatewayError::Api`]): the gateway answered, and the answer was
//!   classified as a failure (see [`ApiError`])
//! - **Integrity Errors** ([`GatewayError::Mismatch`], [`GatewayError::InvalidSignature`]):
//!   the data does not belong to the caller or cannot be trusted
//! - **Input Errors** ([`GatewayError::UnsupportedUnit`], [`GatewayError::UnsupportedCurrency`],
//!   [`GatewayError::InvalidPhone`], [`GatewayError::Config`]): fix the input and retry
//!
//! # Examples
//!
//! ```
//! use myfatoorah_client::error::{GatewayError, Result};
//!
//! fn require_key(key: &str) -> Result<&str> {
//!     if key.trim().is_empty() {
//!         return Err(GatewayError::Config("API key must not be empty".to_owned()));
//!     }
//!     Ok(key.trim())
//! }
//!
//! assert!(require_key("  ").is_err());
//! ```

use std::fmt;

use thiserror::Error;

/// Result type alias for gateway operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while calling the gateway or interpreting its data.
///
/// This type implements `#[must_use]` to ensure errors are not silently ignored.
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed before a response body was read.
    ///
    /// Wraps [`reqwest::Error`]: DNS resolution, connection refused, TLS handshake
    /// failures and timeouts all land here. The client never retries on its own.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport-level failure that is not a reqwest error.
    ///
    /// Raised for rejected URLs, invalid headers, or failures reported by a
    /// custom [`Transport`](crate::transport::Transport).
    #[error("transport error: {0}")]
    Transport(String),

    /// The gateway answered and the answer was classified as an error.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// The gateway returned data of a different order.
    ///
    /// Raised by the status resolver when the customer reference, the price or the
    /// currency of the invoice differ from what the caller expected. Treat this as
    /// tampering or as a wrong lookup key; never as a retryable failure.
    #[error("Trying to call data of another order: {0}")]
    Mismatch(String),

    /// The gateway response is missing fields the client depends on.
    #[error("malformed gateway response: {0}")]
    MalformedResponse(String),

    /// A weight or dimension unit is not supported.
    #[error("{0}")]
    UnsupportedUnit(String),

    /// A currency is not present in the account exchange rates.
    #[error("The selected currency is not supported by MyFatoorah: {0}")]
    UnsupportedCurrency(String),

    /// A phone number cannot be normalised.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    /// The requested payment method is not enabled for the account.
    #[error("{0}")]
    PaymentMethodUnavailable(String),

    /// A webhook signature did not match its payload.
    #[error("webhook signature is not valid")]
    InvalidSignature,

    /// Configuration is invalid or incomplete.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A request body or response body could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Returns the classified gateway error, if this is one.
    #[must_use]
    pub const fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(api) => Some(api),
            _ => None,
        }
    }
}

/// A failed gateway call, classified from the response body.
///
/// Exactly one variant is produced per failed call. The variant records which
/// response shape carried the error; [`message`](Self::message) flattens it into
/// the single human-readable text shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The body was an HTML page (firewall block, proxy error, etc.).
    #[error("{0}")]
    Html(String),

    /// `ValidationErrors` / `FieldsErrors` entries, as ordered `(name, error)` pairs.
    #[error("{}", join_field_errors(.0))]
    Validation(Vec<(String, String)>),

    /// `Data.ErrorMessage` of the response.
    #[error("{0}")]
    Data(String),

    /// Top-level `Message` of the response.
    #[error("{0}")]
    Message(String),

    /// The raw body (no JSON at all, or a bare JSON string).
    #[error("{0}")]
    Body(String),
}

impl ApiError {
    /// Returns the human-readable message for this error.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

fn join_field_errors(errors: &[(String, String)]) -> impl fmt::Display + '_ {
    struct Joined<'a>(&'a [(String, String)]);

    impl fmt::Display for Joined<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            for (i, (name, error)) in self.0.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}: {error}")?;
            }
            Ok(())
        }
    }

    Joined(errors)
}

//! Transport abstraction layer.
//!
//! This module provides the `Transport` trait, the single seam between the gateway
//! client and the network. The client builds the request (URL, auth headers, JSON
//! body) and a transport performs exactly one HTTP exchange with it.
//!
//! # Architecture
//!
//! The transport layer separates protocol mechanics from gateway semantics:
//! - **Transport**: performs the HTTP exchange and reports status and body
//! - **`GatewayClient`**: builds requests, logs them, classifies responses
//!
//! Classification operates on the body text only, so a transport must return
//! non-2xx responses as `Ok` rather than turning them into errors.
//!
//! # Examples
//!
//! ```rust,no_run
//! use myfatoorah_client::transport::{HttpRequest, HttpTransport, Method, Transport};
//!
//! # async fn example() -> myfatoorah_client::error::Result<()> {
//! let transport = HttpTransport::new()?;
//!
//! let request = HttpRequest {
//!     method: Method::Get,
//!     url: "https://apitest.myfatoorah.com/v2/GetCountries",
//!     headers: vec![("Authorization", "Bearer token")],
//!     body: None,
//! };
//!
//! let response = transport.send(request).await?;
//! println!("Status: {}", response.status);
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;
use std::{borrow::Cow, fmt};

use crate::error::Result;

pub mod config;
pub mod http;

pub use config::{HttpConfig, HttpVersion};
pub use http::HttpTransport;

/// HTTP method of a gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET` request (no body).
    Get,
    /// `POST` request with a JSON body.
    Post,
}

impl Method {
    /// Returns the method name as sent on the wire.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP exchange to perform.
#[derive(Debug, Clone)]
pub struct HttpRequest<'a> {
    /// HTTP method.
    pub method: Method,
    /// Absolute request URL, query string included.
    pub url: &'a str,
    /// Request headers.
    pub headers: Vec<(&'a str, &'a str)>,
    /// Serialized request body, if any.
    pub body: Option<&'a [u8]>,
}

/// Response from transport operations.
///
/// Contains the raw response body, HTTP status code, and response headers.
#[derive(Debug)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body bytes.
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

impl TransportResponse {
    /// Returns the body as text, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Transport protocol abstraction.
///
/// Implementations perform one HTTP exchange per call and never retry. Retry and
/// backoff, when wanted, belong to a wrapping transport owned by the host.
///
/// # Examples
///
/// A canned transport, as used in tests:
///
/// ```
/// use myfatoorah_client::{
///     error::Result,
///     transport::{HttpRequest, Transport, TransportResponse},
/// };
///
/// struct Canned(&'static str);
///
/// impl Transport for Canned {
///     async fn send<'a>(&'a self, _request: HttpRequest<'a>) -> Result<TransportResponse> {
///         Ok(TransportResponse { status: 200, body: self.0.as_bytes().to_vec(), headers: vec![] })
///     }
///
///     fn protocol_name(&self) -> &'static str {
///         "canned"
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Executes one HTTP exchange.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent or the body cannot be read.
    /// HTTP error statuses are not errors at this layer.
    fn send<'a>(
        &'a self,
        request: HttpRequest<'a>,
    ) -> impl Future<Output = Result<TransportResponse>> + Send + 'a;

    /// Returns the protocol name for logging.
    fn protocol_name(&self) -> &'static str;
}

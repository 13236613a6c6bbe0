//! Gateway client.
//!
//! [`GatewayClient`] performs one authenticated call to the gateway REST API:
//! it serializes the payload, adds the bearer token, logs the exchange, and hands
//! the body to [`classify`] to decide between data and [`ApiError`](crate::error::ApiError).
//!
//! # Examples
//!
//! ```rust,no_run
//! use myfatoorah_client::gateway::{CountryMode, GatewayClient, GatewayConfig, Operation};
//! use serde_json::json;
//!
//! # async fn example() -> myfatoorah_client::error::Result<()> {
//! let config = GatewayConfig::new("your-api-token", CountryMode::Kwt, true);
//! let client = GatewayClient::from_config(&config)?;
//!
//! let body = json!({"InvoiceAmount": 100, "CurrencyIso": "KWD"});
//! let json = client.call(Operation::InitiatePayment, Some(&body), None).await?;
//! println!("{}", json["Data"]["PaymentMethods"]);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod operation;

use std::fmt;

pub use classify::{GatewayResponse, classify, classify_body};
pub use config::{CountryMode, GatewayConfig};
pub use operation::Operation;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::{
    error::{GatewayError, Result},
    transport::{HttpRequest, HttpTransport, Method, Transport},
};

/// Target of all log records emitted by this crate.
pub const LOG_TARGET: &str = "myfatoorah";

/// Client for the gateway REST API.
///
/// Generic over the [`Transport`] so that hosts and tests can substitute the HTTP
/// layer. The client holds no mutable state and can be shared behind an `Arc`.
pub struct GatewayClient<T: Transport = HttpTransport> {
    transport: T,
    base_url: String,
    api_key: String,
}

impl<T: Transport> fmt::Debug for GatewayClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("transport", &self.transport.protocol_name())
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GatewayClient<HttpTransport> {
    /// Creates a client with an HTTP transport from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid, the API key cannot be
    /// resolved, or the HTTP client cannot be built.
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::with_config(&config.http)?;
        Ok(Self::new(transport, config.api_url(), config.api_key()?))
    }
}

impl<T: Transport> GatewayClient<T> {
    /// Creates a client over an existing transport.
    ///
    /// `base_url` is the scheme and host of the API; a trailing slash is ignored.
    /// `api_key` is trimmed.
    #[must_use]
    pub fn new(transport: T, base_url: impl Into<String>, api_key: impl AsRef<str>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { transport, base_url, api_key: api_key.as_ref().trim().to_owned() }
    }

    /// Returns the API base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Calls the endpoint of `operation`.
    ///
    /// The call is a `POST` when `body` is present and a `GET` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Http`] or [`GatewayError::Transport`] if no response
    /// was received, and [`GatewayError::Api`] if the response is a failure.
    pub async fn call<B>(
        &self,
        operation: Operation,
        body: Option<&B>,
        order_id: Option<&str>,
    ) -> Result<Value>
    where
        B: Serialize + ?Sized + Sync,
    {
        self.call_target(operation, operation.path(), body, order_id).await
    }

    /// Calls `target`, an endpoint path or an absolute URL, on behalf of `operation`.
    ///
    /// The call is a `POST` when `body` is present and a `GET` otherwise.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn call_target<B>(
        &self,
        operation: Operation,
        target: &str,
        body: Option<&B>,
        order_id: Option<&str>,
    ) -> Result<Value>
    where
        B: Serialize + ?Sized + Sync,
    {
        let method = if body.is_some() { Method::Post } else { Method::Get };
        self.call_with_method(method, operation, target, body, order_id).await
    }

    /// Calls `target` with an explicit HTTP method.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn call_with_method<B>(
        &self,
        method: Method,
        operation: Operation,
        target: &str,
        body: Option<&B>,
        order_id: Option<&str>,
    ) -> Result<Value>
    where
        B: Serialize + ?Sized + Sync,
    {
        let response = self.send(method, operation, target, body, order_id).await?;

        if let Some(error) = response.error() {
            warn!(
                target: LOG_TARGET,
                order_id = order_id.unwrap_or_default(),
                operation = operation.label(),
                error = %error,
                "gateway call failed"
            );
        }

        response.into_result()
    }

    /// Performs the exchange and returns the classified response.
    ///
    /// Unlike [`call`](Self::call), a classified failure is returned as data rather
    /// than as an error.
    ///
    /// # Errors
    ///
    /// Returns error if the body cannot be serialized or no response was received.
    #[instrument(
        target = "myfatoorah",
        skip_all,
        fields(
            operation = operation.label(),
            order_id = order_id.unwrap_or_default(),
            method = %method,
            endpoint = target
        )
    )]
    pub async fn send<B>(
        &self,
        method: Method,
        operation: Operation,
        target: &str,
        body: Option<&B>,
        order_id: Option<&str>,
    ) -> Result<GatewayResponse>
    where
        B: Serialize + ?Sized + Sync,
    {
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| GatewayError::Serialization(format!("request body: {e}")))?;

        if operation.logs_payloads() {
            let request = payload.as_deref().map(String::from_utf8_lossy).unwrap_or_default();
            info!(
                target: LOG_TARGET,
                request = %request,
                "Order #{} ----- {} - Request",
                order_id.unwrap_or_default(),
                operation.label()
            );
        }

        let url = self.resolve_url(target);
        let authorization = format!("Bearer {}", self.api_key);
        let request = HttpRequest {
            method,
            url: &url,
            headers: vec![
                ("Authorization", authorization.as_str()),
                ("Content-Type", "application/json"),
            ],
            body: payload.as_deref(),
        };

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    target: LOG_TARGET,
                    protocol = self.transport.protocol_name(),
                    error = %error,
                    "Order #{} ----- {} - transport error",
                    order_id.unwrap_or_default(),
                    operation.label()
                );
                return Err(error);
            }
        };

        let text = response.body_text();
        if operation.logs_payloads() {
            info!(
                target: LOG_TARGET,
                status = response.status,
                response = %text,
                "Order #{} ----- {} - Response",
                order_id.unwrap_or_default(),
                operation.label()
            );
        }

        let parsed = serde_json::from_str::<Value>(&text).ok();
        Ok(classify(&text, parsed.as_ref()))
    }

    fn resolve_url(&self, target: &str) -> String {
        if target.starts_with("https://") || target.starts_with("http://") {
            target.to_owned()
        } else if target.starts_with('/') {
            format!("{}{target}", self.base_url)
        } else {
            format!("{}/{target}", self.base_url)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::{error::ApiError, transport::TransportResponse};

    #[derive(Debug, Clone)]
    struct Recorded {
        method: Method,
        url: String,
        headers: Vec<(String, String)>,
        body: Option<String>,
    }

    struct StubTransport {
        reply: Result<&'static str>,
        requests: Mutex<Vec<Recorded>>,
    }

    impl StubTransport {
        fn replying(body: &'static str) -> Self {
            Self { reply: Ok(body), requests: Mutex::new(Vec::new()) }
        }

        fn failing() -> Self {
            Self {
                reply: Err(GatewayError::Transport("connection refused".to_owned())),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn last(&self) -> Recorded {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for StubTransport {
        async fn send<'a>(&'a self, request: HttpRequest<'a>) -> Result<TransportResponse> {
            self.requests.lock().unwrap().push(Recorded {
                method: request.method,
                url: request.url.to_owned(),
                headers: request
                    .headers
                    .iter()
                    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                    .collect(),
                body: request.body.map(|b| String::from_utf8_lossy(b).into_owned()),
            });
            match &self.reply {
                Ok(body) => {
                    Ok(TransportResponse { status: 200, body: body.as_bytes().to_vec(), headers: vec![] })
                }
                Err(_) => Err(GatewayError::Transport("connection refused".to_owned())),
            }
        }

        fn protocol_name(&self) -> &'static str {
            "stub"
        }
    }

    fn client(transport: StubTransport) -> GatewayClient<StubTransport> {
        GatewayClient::new(transport, "https://apitest.myfatoorah.com/", "  token  ")
    }

    #[tokio::test]
    async fn test_post_with_body_and_auth_headers() {
        let client = client(StubTransport::replying(r#"{"IsSuccess":true,"Data":{"InvoiceId":5}}"#));

        let body = json!({"Key": "5", "KeyType": "InvoiceId"});
        let json = client.call(Operation::GetPaymentStatus, Some(&body), Some("12")).await.unwrap();
        assert_eq!(json["Data"]["InvoiceId"], 5);

        let request = client.transport().last();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://apitest.myfatoorah.com/v2/GetPaymentStatus");
        assert!(request.headers.contains(&("Authorization".to_owned(), "Bearer token".to_owned())));
        assert!(
            request.headers.contains(&("Content-Type".to_owned(), "application/json".to_owned()))
        );
        assert_eq!(request.body.as_deref(), Some(r#"{"Key":"5","KeyType":"InvoiceId"}"#));
    }

    #[tokio::test]
    async fn test_get_without_body() {
        let client = client(StubTransport::replying(r#"{"IsSuccess":true,"Data":[]}"#));

        client.call(Operation::GetCountries, None::<&Value>, None).await.unwrap();

        let request = client.transport().last();
        assert_eq!(request.method, Method::Get);
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_absolute_target_is_used_verbatim() {
        let client = client(StubTransport::replying(r#"{"IsSuccess":true}"#));

        let card = json!({"PaymentType": "card"});
        client
            .call_target(
                Operation::DirectPayment,
                "https://apitest.myfatoorah.com/v2/DirectPayment/0106/12",
                Some(&card),
                Some("1"),
            )
            .await
            .unwrap();

        assert_eq!(
            client.transport().last().url,
            "https://apitest.myfatoorah.com/v2/DirectPayment/0106/12"
        );
    }

    #[tokio::test]
    async fn test_classified_failure_is_api_error() {
        let client = client(StubTransport::replying(
            r#"{"IsSuccess":false,"Message":"Invalid data","ValidationErrors":[{"Name":"InvoiceValue","Error":"required"}]}"#,
        ));

        let result = client.call(Operation::SendPayment, Some(&json!({})), None).await;
        let Err(GatewayError::Api(ApiError::Validation(pairs))) = result else {
            panic!("expected validation error, got {result:?}");
        };
        assert_eq!(pairs, vec![("InvoiceValue".to_owned(), "required".to_owned())]);
    }

    #[tokio::test]
    async fn test_send_returns_failure_as_data() {
        let client = client(StubTransport::replying("<html><body>Blocked</body></html>"));

        let response = client
            .send(Method::Get, Operation::GetCountries, Operation::GetCountries.path(), None::<&Value>, None)
            .await
            .unwrap();
        assert!(!response.is_success());
        assert_eq!(response.error(), Some(&ApiError::Html("Blocked".to_owned())));
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let client = client(StubTransport::failing());

        let result = client.call(Operation::GetCountries, None::<&Value>, None).await;
        assert!(matches!(result, Err(GatewayError::Transport(_))));
    }

    #[test]
    fn test_resolve_url() {
        let client = client(StubTransport::replying("{}"));
        assert_eq!(client.base_url(), "https://apitest.myfatoorah.com");
        assert_eq!(client.resolve_url("v2/GetCities"), "https://apitest.myfatoorah.com/v2/GetCities");
        assert_eq!(client.resolve_url("https://other.example/x"), "https://other.example/x");
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = client(StubTransport::replying("{}"));
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("token\""));
        assert!(debug.contains("stub"));
    }
}

//! reqwest-backed transport.

use reqwest::{Client, header::HeaderValue};
use tracing::{debug, instrument};
use url::{Host, Url};

use super::config::{HttpConfig, HttpVersion};
use crate::{
    error::{GatewayError, Result},
    transport::{HttpRequest, Method, Transport, TransportResponse},
};

/// Rejects targets the gateway client must never reach: anything that is not
/// HTTPS, and loopback hosts.
fn check_target(url: &Url) -> Result<()> {
    if url.scheme() != "https" {
        return Err(GatewayError::Transport(format!(
            "refusing {} request to {url}: only https is allowed",
            url.scheme()
        )));
    }

    let loopback = match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => true,
    };
    if loopback {
        return Err(GatewayError::Transport(format!("refusing request to loopback host in {url}")));
    }

    Ok(())
}

/// Rejects header names or values that would split the request.
fn check_header(name: &str, value: &str) -> Result<()> {
    if name.contains(['\r', '\n', '\0']) || value.contains(['\r', '\n', '\0']) {
        return Err(GatewayError::Transport(format!(
            "header {:?} contains control characters",
            name.trim()
        )));
    }
    Ok(())
}

/// HTTPS transport over a pooled reqwest client.
///
/// # Examples
///
/// ```
/// use myfatoorah_client::transport::{HttpConfig, HttpTransport, HttpVersion, Transport};
///
/// let config = HttpConfig { http_version: HttpVersion::Http1, ..Default::default() };
/// let transport = HttpTransport::with_config(&config).unwrap();
/// assert_eq!(transport.protocol_name(), "http/1.1");
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    http_version: HttpVersion,
}

impl HttpTransport {
    /// Creates a transport with [`HttpConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Http` if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self> {
        Self::with_config(&HttpConfig::default())
    }

    /// Creates a transport from connection settings.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` for invalid settings and
    /// `GatewayError::Http` if the client cannot be built.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        config.validate()?;
        let user_agent = HeaderValue::from_str(config.user_agent())
            .map_err(|e| GatewayError::Config(format!("invalid user_agent: {e}")))?;

        let builder = Client::builder()
            .user_agent(user_agent)
            .pool_max_idle_per_host(config.idle_connections)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout());

        let builder = match config.http_version {
            HttpVersion::Http1 => builder.http1_only(),
            HttpVersion::Http2 => builder.http2_prior_knowledge(),
            HttpVersion::Auto => builder,
        };

        Ok(Self { client: builder.build()?, http_version: config.http_version })
    }

    #[instrument(skip(self, request), fields(method = %request.method, url = request.url))]
    async fn execute(&self, request: HttpRequest<'_>) -> Result<TransportResponse> {
        let url = Url::parse(request.url)
            .map_err(|e| GatewayError::Transport(format!("invalid URL '{}': {e}", request.url)))?;
        check_target(&url)?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        for (name, value) in request.headers {
            check_header(name, value)?;
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.to_string(), v.to_str().ok()?.to_owned())))
            .collect();
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "gateway responded");
        Ok(TransportResponse { status, body, headers })
    }
}

impl Transport for HttpTransport {
    async fn send<'a>(&'a self, request: HttpRequest<'a>) -> Result<TransportResponse> {
        self.execute(request).await
    }

    fn protocol_name(&self) -> &'static str {
        match self.http_version {
            HttpVersion::Http1 => "http/1.1",
            HttpVersion::Http2 => "http/2",
            HttpVersion::Auto => "http",
        }
    }
}

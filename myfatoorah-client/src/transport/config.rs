//! Connection settings for the gateway transport.
//!
//! Read from the `[http]` table of the gateway configuration. The transport owns
//! every timeout; the gateway client itself defines none.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{GatewayError, Result};

/// `User-Agent` sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("myfatoorah-client/", env!("CARGO_PKG_VERSION"));

/// Connection settings.
///
/// # Examples
///
/// ```toml
/// [http]
/// timeout_secs = 45
/// connect_timeout_secs = 10
/// http_version = "http1"
/// user_agent = "shop-backend/2.1"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Whole-request timeout in seconds, body included.
    pub timeout_secs: u64,

    /// TCP and TLS connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Idle keep-alive connections kept per gateway host.
    pub idle_connections: usize,

    /// Protocol preference.
    pub http_version: HttpVersion,

    /// Overrides [`DEFAULT_USER_AGENT`].
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            idle_connections: 4,
            http_version: HttpVersion::Auto,
            user_agent: None,
        }
    }
}

impl HttpConfig {
    /// Checks the settings before a client is built from them.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` when a timeout is zero or above 300
    /// seconds, when the connect timeout exceeds the request timeout, or when
    /// the user agent holds control characters.
    pub fn validate(&self) -> Result<()> {
        for (name, secs) in
            [("timeout_secs", self.timeout_secs), ("connect_timeout_secs", self.connect_timeout_secs)]
        {
            if secs == 0 || secs > 300 {
                return Err(GatewayError::Config(format!("{name} must be between 1 and 300")));
            }
        }
        if self.connect_timeout_secs > self.timeout_secs {
            return Err(GatewayError::Config(
                "connect_timeout_secs cannot exceed timeout_secs".to_owned(),
            ));
        }
        if self.user_agent.as_deref().is_some_and(|agent| agent.chars().any(char::is_control)) {
            return Err(GatewayError::Config("user_agent must not contain control characters".to_owned()));
        }
        Ok(())
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Effective `User-Agent`.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

/// HTTP protocol preference.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    /// HTTP/1.1 only.
    Http1,
    /// HTTP/2 with prior knowledge.
    Http2,
    /// Negotiated through ALPN.
    #[default]
    Auto,
}

//! Gateway configuration types.
//!
//! This module defines the TOML-deserializable configuration of a gateway account:
//! credentials, country, test mode and transport settings.

use std::{fmt, path::Path};

use serde::Deserialize;
use url::Url;

use crate::{
    error::{GatewayError, Result},
    transport::HttpConfig,
};

/// Root gateway configuration.
///
/// Secrets are either inlined (`api_key`, `webhook_secret`) or read from the
/// environment variable named by the matching `*_env` field. Inline values win.
///
/// # Examples
///
/// ```
/// use myfatoorah_client::gateway::{CountryMode, GatewayConfig};
///
/// let config = GatewayConfig::from_toml(
///     r#"
///     api_key = "your-api-token"
///     country = "SAU"
///     test_mode = true
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.country, CountryMode::Sau);
/// assert_eq!(config.api_url(), "https://apitest.myfatoorah.com");
/// ```
#[derive(Clone, Deserialize)]
pub struct GatewayConfig {
    /// API token, inline.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Name of the environment variable holding the API token.
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Country of the vendor account; selects the API host.
    #[serde(default)]
    pub country: CountryMode,

    /// Use the sandbox host.
    #[serde(default)]
    pub test_mode: bool,

    /// Explicit API base URL, overriding the country host.
    #[serde(default)]
    pub base_url: Option<String>,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Webhook secret key, inline.
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Name of the environment variable holding the webhook secret key.
    #[serde(default)]
    pub webhook_secret_env: Option<String>,
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("country", &self.country)
            .field("test_mode", &self.test_mode)
            .field("base_url", &self.base_url)
            .field("http", &self.http)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_secret_env", &self.webhook_secret_env)
            .finish()
    }
}

impl GatewayConfig {
    /// Creates a configuration from an inline API key with default settings.
    #[must_use]
    pub fn new(api_key: impl Into<String>, country: CountryMode, test_mode: bool) -> Self {
        Self {
            api_key: Some(api_key.into()),
            api_key_env: None,
            country,
            test_mode,
            base_url: None,
            http: HttpConfig::default(),
            webhook_secret: None,
            webhook_secret_env: None,
        }
    }

    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns error if TOML parsing fails or configuration validation fails.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| GatewayError::Config(format!("invalid TOML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is not a valid configuration.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GatewayError::Config(format!("cannot read config file: {e}")))?;
        Self::from_toml(&content)
    }

    /// Validates the configuration.
    ///
    /// This method checks for:
    /// - an API key source (inline key or environment variable name)
    /// - well-formed environment variable names
    /// - an HTTPS, non-loopback `base_url` override
    /// - HTTP timeouts within bounds
    ///
    /// Environment variables themselves are read later, by
    /// [`api_key`](Self::api_key) and [`webhook_secret`](Self::webhook_secret).
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if any validation fails.
    pub fn validate(&self) -> Result<()> {
        match (&self.api_key, &self.api_key_env) {
            (Some(key), _) if !key.trim().is_empty() => {}
            (_, Some(env)) => validate_env_var_name(env)?,
            _ => {
                return Err(GatewayError::Config(
                    "either api_key or api_key_env must be set".to_owned(),
                ));
            }
        }

        if let Some(env) = &self.webhook_secret_env {
            validate_env_var_name(env)?;
        }

        if let Some(base_url) = &self.base_url {
            validate_base_url(base_url)?;
        }

        self.http.validate()
    }

    /// Returns the API base URL (scheme and host, no trailing slash).
    #[must_use]
    pub fn api_url(&self) -> &str {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/'),
            None => self.country.api_url(self.test_mode),
        }
    }

    /// Returns the API token, trimmed.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if no key is configured or the environment
    /// variable is unset or empty.
    pub fn api_key(&self) -> Result<String> {
        resolve_secret("api_key", self.api_key.as_deref(), self.api_key_env.as_deref())?
            .ok_or_else(|| GatewayError::Config("either api_key or api_key_env must be set".to_owned()))
    }

    /// Returns the webhook secret key, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if `webhook_secret_env` names an unset variable.
    pub fn webhook_secret(&self) -> Result<Option<String>> {
        resolve_secret(
            "webhook_secret",
            self.webhook_secret.as_deref(),
            self.webhook_secret_env.as_deref(),
        )
    }
}

/// Country of the vendor account.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountryMode {
    /// Kuwait.
    #[default]
    Kwt,
    /// Saudi Arabia.
    Sau,
    /// United Arab Emirates.
    Are,
    /// Qatar.
    Qat,
    /// Bahrain.
    Bhr,
    /// Oman.
    Omn,
    /// Jordan.
    Jod,
    /// Egypt.
    Egy,
}

impl CountryMode {
    /// Returns the API host of the country.
    ///
    /// All countries share the same sandbox host.
    #[must_use]
    pub const fn api_url(self, test_mode: bool) -> &'static str {
        if test_mode {
            return "https://apitest.myfatoorah.com";
        }
        match self {
            Self::Sau => "https://api-sa.myfatoorah.com",
            Self::Qat => "https://api-qa.myfatoorah.com",
            Self::Are => "https://api-ae.myfatoorah.com",
            Self::Egy => "https://api-eg.myfatoorah.com",
            Self::Kwt | Self::Bhr | Self::Omn | Self::Jod => "https://api.myfatoorah.com",
        }
    }

    /// Returns the ISO 3166 alpha-3 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Kwt => "KWT",
            Self::Sau => "SAU",
            Self::Are => "ARE",
            Self::Qat => "QAT",
            Self::Bhr => "BHR",
            Self::Omn => "OMN",
            Self::Jod => "JOD",
            Self::Egy => "EGY",
        }
    }
}

impl std::str::FromStr for CountryMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KWT" => Ok(Self::Kwt),
            "SAU" => Ok(Self::Sau),
            "ARE" => Ok(Self::Are),
            "QAT" => Ok(Self::Qat),
            "BHR" => Ok(Self::Bhr),
            "OMN" => Ok(Self::Omn),
            "JOD" => Ok(Self::Jod),
            "EGY" => Ok(Self::Egy),
            other => Err(GatewayError::Config(format!("unknown country mode: {other}"))),
        }
    }
}

fn resolve_secret(name: &str, inline: Option<&str>, env: Option<&str>) -> Result<Option<String>> {
    if let Some(value) = inline
        && !value.trim().is_empty()
    {
        return Ok(Some(value.trim().to_owned()));
    }

    let Some(env) = env else {
        return Ok(None);
    };

    match std::env::var(env) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_owned())),
        _ => Err(GatewayError::Config(format!("{name}: environment variable {env} is not set"))),
    }
}

fn validate_base_url(base_url: &str) -> Result<()> {
    let url = Url::parse(base_url)
        .map_err(|e| GatewayError::Config(format!("invalid base_url '{base_url}': {e}")))?;

    if url.scheme() != "https" {
        return Err(GatewayError::Config(format!(
            "base_url must use HTTPS, got: {}",
            url.scheme()
        )));
    }

    if let Some(host) = url.host_str() {
        let host_lower = host.to_lowercase();
        if host_lower == "localhost"
            || host_lower == "::1"
            || host_lower == "[::1]"
            || host_lower.starts_with("127.")
        {
            return Err(GatewayError::Config(format!(
                "base_url must not be localhost or loopback: {host}"
            )));
        }
    }

    Ok(())
}

/// Validates an environment variable name.
fn validate_env_var_name(name: &str) -> Result<()> {
    let Some(first) = name.chars().next() else {
        return Err(GatewayError::Config("environment variable name cannot be empty".to_owned()));
    };

    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(GatewayError::Config(format!(
            "environment variable name must start with letter or underscore: {name}"
        )));
    }

    if let Some(ch) = name.chars().find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(GatewayError::Config(format!(
            "environment variable name contains invalid character '{ch}': {name}"
        )));
    }

    Ok(())
}

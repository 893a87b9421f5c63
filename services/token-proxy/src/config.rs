use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Listen host address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// OAuth token endpoint URL
    pub oauth_endpoint: String,

    /// Protected backend base URL
    pub backend_url: String,

    /// Client-credentials grant identifier
    pub client_id: String,

    /// Client-credentials grant secret
    #[serde(skip_serializing)]
    pub client_secret: String,

    /// Path rewrite policy applied before forwarding
    pub route_mode: RouteMode,

    /// Backend request timeout in seconds
    pub request_timeout_secs: u64,

    /// Token endpoint timeout in seconds
    pub token_timeout_secs: u64,

    /// Maximum inbound body size in bytes
    pub max_body_size_bytes: usize,

    /// Skip TLS certificate validation toward the backend
    pub backend_tls_insecure: bool,

    /// Log level
    pub log_level: String,
}

/// How inbound paths map onto the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RouteMode {
    /// Forward only requests under the prefix, with the prefix stripped.
    Prefix(String),
    /// Forward every request with its path unchanged.
    Passthrough,
}

impl RouteMode {
    /// Build a route mode from the `ROUTE_MODE` / `PATH_PREFIX` pair.
    pub fn parse(mode: &str, prefix: &str) -> Result<Self> {
        match mode.to_lowercase().as_str() {
            "passthrough" => Ok(RouteMode::Passthrough),
            "prefix" => Ok(RouteMode::Prefix(normalize_prefix(prefix))),
            _ => anyhow::bail!("Unsupported ROUTE_MODE: {}", mode),
        }
    }
}

impl fmt::Display for RouteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteMode::Prefix(prefix) => write!(f, "prefix (strip {})", prefix),
            RouteMode::Passthrough => write!(f, "passthrough"),
        }
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') || trimmed.is_empty() {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

impl ProxyConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| lookup(key).with_context(|| format!("{} must be set", key));

        let host = var_or("PROXY_HOST", "0.0.0.0");
        let port = var_or("PROXY_PORT", "3000")
            .parse()
            .context("Invalid PROXY_PORT")?;

        let oauth_endpoint = required("OAUTH_EP")?;
        let backend_url = required("BACKEND_URL")?;
        let client_id = required("CLIENT_ID")?;
        let client_secret = required("CLIENT_SECRET")?;

        let route_mode = RouteMode::parse(
            &var_or("ROUTE_MODE", "passthrough"),
            &var_or("PATH_PREFIX", "/api"),
        )?;

        let request_timeout_secs = var_or("REQUEST_TIMEOUT_SECS", "30")
            .parse()
            .context("Invalid REQUEST_TIMEOUT_SECS")?;

        let token_timeout_secs = var_or("TOKEN_TIMEOUT_SECS", "10")
            .parse()
            .context("Invalid TOKEN_TIMEOUT_SECS")?;

        let max_body_size_bytes = var_or("MAX_BODY_SIZE_BYTES", "10485760") // 10MB
            .parse()
            .context("Invalid MAX_BODY_SIZE_BYTES")?;

        let backend_tls_insecure = var_or("BACKEND_TLS_INSECURE", "false")
            .parse()
            .context("Invalid BACKEND_TLS_INSECURE")?;

        let log_level = var_or("LOG_LEVEL", "info");

        Ok(Self {
            host,
            port,
            oauth_endpoint,
            backend_url,
            client_id,
            client_secret,
            route_mode,
            request_timeout_secs,
            token_timeout_secs,
            max_body_size_bytes,
            backend_tls_insecure,
            log_level,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_http_url("OAUTH_EP", &self.oauth_endpoint)?;
        validate_http_url("BACKEND_URL", &self.backend_url)?;

        if self.client_id.is_empty() {
            anyhow::bail!("CLIENT_ID cannot be empty");
        }
        if self.client_secret.is_empty() {
            anyhow::bail!("CLIENT_SECRET cannot be empty");
        }

        if let RouteMode::Prefix(ref prefix) = self.route_mode {
            if prefix.is_empty() {
                anyhow::bail!("PATH_PREFIX must name a path segment in prefix mode");
            }
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than 0");
        }
        if self.token_timeout_secs == 0 {
            anyhow::bail!("TOKEN_TIMEOUT_SECS must be greater than 0");
        }

        if self.max_body_size_bytes == 0 {
            anyhow::bail!("MAX_BODY_SIZE_BYTES must be greater than 0");
        }

        Ok(())
    }

    /// Get backend request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get token endpoint timeout as Duration
    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_secs)
    }

    /// Get the listen address
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn validate_http_url(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", name);
    }
    let url = Url::parse(value).with_context(|| format!("Invalid {}: {}", name, value))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("{} must use http or https, got {}", name, other),
    }
}

//! Client configuration and environment fallback

use std::env;
use std::fmt;

use hyper::Uri;

use crate::error::{Error, Result};

/// Primary REST endpoint, used when [`ClientConfig::endpoint`] is blank
pub const ENDPOINT_ENV: &str = "UPSTASH_REDIS_REST_URL";
/// Edge endpoint for read-only lookups, used when [`ClientConfig::edge_endpoint`] is unset
pub const EDGE_ENDPOINT_ENV: &str = "UPSTASH_REDIS_EDGE_URL";
/// Bearer token, used when [`ClientConfig::token`] is blank
pub const TOKEN_ENV: &str = "UPSTASH_REDIS_REST_TOKEN";

/// Configuration options for the client
#[derive(Clone)]
pub struct ClientConfig {
    /// Primary REST endpoint; every write goes here
    pub endpoint: String,
    /// Optional edge endpoint preferred for read-only lookups
    pub edge_endpoint: Option<String>,
    /// Bearer token sent with every request
    pub token: String,
    /// Request timeout of the default transport in milliseconds (default: 30000)
    pub timeout_ms: u64,
    /// Optional SHA-256 certificate fingerprint (hex, colons allowed) to pin.
    /// Requires `https://` endpoints.
    pub ssl_fingerprint: Option<String>,
    /// Verify server certificates (default: true)
    pub reject_unauthorized: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            edge_endpoint: None,
            token: String::new(),
            timeout_ms: 30000,
            ssl_fingerprint: None,
            reject_unauthorized: true,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("edge_endpoint", &self.edge_endpoint)
            .field("token", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("ssl_fingerprint", &self.ssl_fingerprint)
            .field("reject_unauthorized", &self.reject_unauthorized)
            .finish()
    }
}

impl ClientConfig {
    /// Build a configuration entirely from the environment
    pub fn from_env() -> Result<Self> {
        Self::default().resolve()
    }

    /// Fill blank fields from the environment and validate the endpoints.
    ///
    /// Trailing slashes are trimmed so that request paths join cleanly.
    pub fn resolve(mut self) -> Result<Self> {
        if self.endpoint.trim().is_empty() {
            self.endpoint = non_empty_var(ENDPOINT_ENV).unwrap_or_default();
        }
        if self.edge_endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
            self.edge_endpoint = non_empty_var(EDGE_ENDPOINT_ENV);
        }
        if self.token.trim().is_empty() {
            self.token = non_empty_var(TOKEN_ENV).unwrap_or_default();
        }

        if self.endpoint.trim().is_empty() {
            return Err(Error::Config(format!(
                "No endpoint configured: set `endpoint` or the {} environment variable",
                ENDPOINT_ENV
            )));
        }

        self.endpoint = normalize_endpoint(&self.endpoint)?;
        self.edge_endpoint = self
            .edge_endpoint
            .as_deref()
            .map(normalize_endpoint)
            .transpose()?;

        if self.ssl_fingerprint.is_some() {
            let all_https = std::iter::once(self.endpoint.as_str())
                .chain(self.edge_endpoint.as_deref())
                .all(|e| e.starts_with("https://"));
            if !all_https {
                return Err(Error::Tls(
                    "ssl_fingerprint requires https:// endpoints".to_string(),
                ));
            }
        }

        Ok(self)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Trim whitespace and trailing slashes, then check the result is an absolute URI.
fn normalize_endpoint(raw: &str) -> Result<String> {
    let endpoint = raw.trim().trim_end_matches('/').to_string();
    let uri: Uri = endpoint
        .parse()
        .map_err(|e| Error::InvalidUrl(format!("Invalid endpoint URL '{}': {}", endpoint, e)))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        return Err(Error::InvalidUrl(format!(
            "Endpoint URL '{}' must include a scheme and host",
            endpoint
        )));
    }
    Ok(endpoint)
}

//! Request/response translation for the REST API

use std::sync::Arc;

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use tracing::debug;
use zeroize::Zeroize;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::transport::HttpTransport;
use crate::types::{Envelope, Value};

/// Characters left unencoded in a single path segment per RFC 3986.
/// `/` is encoded so that an argument can never add a segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Percent-encode one path segment. The dot segments `.` and `..` are
/// encoded as well so that URL normalization cannot remove them.
fn encode_segment(segment: &str) -> String {
    match segment {
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        _ => utf8_percent_encode(segment, PATH_SEGMENT).to_string(),
    }
}

/// Whether `segment` cannot be carried as a path segment.
///
/// Empty segments are dropped and dot segments resolved by RFC 3986
/// normalization, which would change the command.
pub(crate) fn is_unsafe_segment(segment: &str) -> bool {
    matches!(segment, "" | "." | "..")
}

/// Bearer token that is zeroed when dropped.
struct AuthToken(String);

impl AuthToken {
    fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for AuthToken {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

struct Endpoints {
    primary: String,
    edge: Option<String>,
    token: AuthToken,
}

/// Turns a (verb, path, body) triple into one HTTP round trip and unwraps
/// the `{result, error}` envelope.
///
/// Cheap to clone; all state is immutable and shared.
#[derive(Clone)]
pub struct RestClient {
    endpoints: Arc<Endpoints>,
    transport: Arc<dyn HttpTransport>,
}

impl RestClient {
    /// Resolve `config` (see [`ClientConfig::resolve`]) and pair it with a transport
    pub fn new(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let ClientConfig {
            endpoint,
            edge_endpoint,
            token,
            ..
        } = config.resolve()?;
        Ok(Self {
            endpoints: Arc::new(Endpoints {
                primary: endpoint,
                edge: edge_endpoint,
                token: AuthToken(token),
            }),
            transport,
        })
    }

    /// Primary endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoints.primary
    }

    /// Edge endpoint, if configured
    pub fn edge_endpoint(&self) -> Option<&str> {
        self.endpoints.edge.as_deref()
    }

    /// Bearer token
    pub fn token(&self) -> &str {
        self.endpoints.token.as_str()
    }

    /// Base URL for `method`: reads (`GET`) prefer the edge endpoint.
    fn base_url(&self, method: &Method) -> &str {
        match (method, self.endpoints.edge.as_deref()) {
            (&Method::GET, Some(edge)) => edge,
            _ => &self.endpoints.primary,
        }
    }

    /// Perform one request and return the envelope's `result`.
    ///
    /// The body, if any, is serialized to JSON before anything is sent; a
    /// serialization failure returns [`Error::Serialize`] without touching
    /// the network. A status outside `200..300` yields [`Error::Status`]
    /// (or [`Error::Decode`] if its body is not a JSON object). A non-empty
    /// envelope `error` yields [`Error::Command`] even on a 2xx status.
    pub async fn call<S, B>(&self, method: Method, path: &[S], body: Option<&B>) -> Result<Value>
    where
        S: AsRef<str>,
        B: Serialize + ?Sized,
    {
        let payload = match body {
            Some(body) => Bytes::from(serde_json::to_vec(body).map_err(Error::Serialize)?),
            None => Bytes::new(),
        };

        let path = path
            .iter()
            .map(|s| encode_segment(s.as_ref()))
            .collect::<Vec<_>>()
            .join("/");
        let url = format!("{}/{}", self.base_url(&method), path);

        let request = Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.token()))
            .body(payload)
            .map_err(|e| Error::InvalidRequest(format!("Failed to build request: {}", e)))?;

        debug!("Sending request: {} /{}", method, path);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(Error::Transport)?;

        let status = response.status();
        let body = response.into_body();

        if !status.is_success() {
            let error_body: serde_json::Map<String, serde_json::Value> =
                serde_json::from_slice(&body).map_err(|source| Error::Decode {
                    status: status.as_u16(),
                    source,
                })?;
            let pretty = serde_json::to_string_pretty(&error_body)
                .unwrap_or_else(|_| serde_json::Value::Object(error_body).to_string());
            return Err(Error::Status {
                status: status.as_u16(),
                body: pretty,
                path: format!("/{}", path),
            });
        }

        let envelope: Envelope = serde_json::from_slice(&body).map_err(|source| Error::Decode {
            status: status.as_u16(),
            source,
        })?;

        if let Some(message) = envelope.error() {
            return Err(Error::Command(message.to_string()));
        }

        Ok(envelope.result)
    }
}

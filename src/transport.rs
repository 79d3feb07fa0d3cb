//! The "perform one request" capability and its hyper implementation

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;

use crate::config::ClientConfig;
use crate::error::{BoxError, Error, Result};
use crate::tls::build_tls_config;

/// Performs exactly one HTTP round trip.
///
/// Implementations must hand back a fully buffered body so that the
/// underlying connection is released before the caller sees the response.
/// Any error is wrapped by the caller as [`Error::Transport`].
///
/// Swap in your own implementation with
/// [`Client::with_transport`](crate::Client::with_transport), e.g. to script
/// responses in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send `request` and return the complete response
    async fn send(&self, request: Request<Bytes>) -> std::result::Result<Response<Bytes>, BoxError>;
}

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;

/// Default transport: hyper over rustls, HTTP/1.1 or HTTP/2 by ALPN.
///
/// Connection pooling is hyper's. The configured timeout bounds the whole
/// exchange including reading the body.
#[derive(Clone)]
pub struct HyperTransport {
    http_client: HttpClient<HttpsConnector, Full<Bytes>>,
    timeout_ms: u64,
}

impl HyperTransport {
    /// Build a transport from the TLS and timeout options of `config`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let tls_config =
            build_tls_config(config.ssl_fingerprint.as_deref(), config.reject_unauthorized)?;

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let http_client = HttpClient::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            http_client,
            timeout_ms: config.timeout_ms,
        })
    }

    async fn round_trip(&self, request: Request<Bytes>) -> std::result::Result<Response<Bytes>, BoxError> {
        let (parts, body) = request.into_parts();
        let response = self
            .http_client
            .request(Request::from_parts(parts, Full::new(body)))
            .await?;

        let (parts, body) = response.into_parts();
        let bytes = body.collect().await?.to_bytes();
        Ok(Response::from_parts(parts, bytes))
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(&self, request: Request<Bytes>) -> std::result::Result<Response<Bytes>, BoxError> {
        let timeout = Duration::from_millis(self.timeout_ms);
        tokio::time::timeout(timeout, self.round_trip(request))
            .await
            .map_err(|_| Box::new(Error::Timeout(self.timeout_ms)) as BoxError)?
    }
}

//! A typed client for Redis-compatible key-value stores served over a REST API
//!
//! Each method turns into one HTTP request: the command and its arguments
//! are sent as a JSON array (or, for read-only lookups, as URL path
//! segments), and the `{"result": ..., "error": ...}` envelope that comes
//! back is unwrapped into a typed value.
//!
//! # Features
//! - Bearer token authentication
//! - Optional edge endpoint for read-only lookups
//! - Async/await API using tokio
//! - Pluggable transport for testing without a network
//! - HTTPS with certificate fingerprint pinning
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kv_rest_client::Client;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), kv_rest_client::Error> {
//!     // Endpoint and token from UPSTASH_REDIS_REST_URL / UPSTASH_REDIS_REST_TOKEN
//!     let client = Client::from_env()?;
//!
//!     client.set("foo", "bar").await?;
//!     let value = client.get("foo").await?;
//!     println!("Retrieved: {:?}", value);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

pub mod client;
pub mod command;
pub mod config;
pub mod error;
pub mod rest;
mod tls;
pub mod transport;
pub mod types;

pub use client::Client;
pub use command::Command;
pub use config::ClientConfig;
pub use error::{BoxError, Error, Result};
pub use rest::RestClient;
pub use transport::{HttpTransport, HyperTransport};
pub use types::*;

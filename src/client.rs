//! Typed command façade

use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::command::Command;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::rest::{is_unsafe_segment, RestClient};
use crate::transport::{HttpTransport, HyperTransport};
use crate::types::*;

/// Client for a Redis-compatible key-value store served over REST.
///
/// Every method is one stateless round trip. The client is cheap to clone
/// and can be shared between tasks.
///
/// # Example
/// ```rust,no_run
/// use kv_rest_client::Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), kv_rest_client::Error> {
///     // Explicit endpoint and token
///     let client = Client::new("https://eu1-rest.example.io", "your-token")?;
///
///     // Or UPSTASH_REDIS_REST_URL / UPSTASH_REDIS_REST_TOKEN
///     let client = Client::from_env()?;
///
///     // With an edge endpoint for reads
///     let client = Client::with_config(kv_rest_client::ClientConfig {
///         endpoint: "https://eu1-rest.example.io".to_string(),
///         edge_endpoint: Some("https://eu1-edge.example.io".to_string()),
///         token: "your-token".to_string(),
///         ..Default::default()
///     })?;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    rest: RestClient,
}

impl Client {
    /// Create a client for `endpoint` authenticating with `token`.
    ///
    /// A blank argument falls back to its environment variable.
    ///
    /// # Errors
    /// Returns an error if no endpoint is available or it is not a valid URL
    pub fn new(endpoint: &str, token: &str) -> Result<Self> {
        let config = ClientConfig {
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            ..Default::default()
        };
        Self::with_config(config)
    }

    /// Create a client configured entirely from the environment
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with custom configuration and the default transport
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let transport = HyperTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client that sends every request through `transport`
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        Ok(Self {
            rest: RestClient::new(config, transport)?,
        })
    }

    /// Primary endpoint URL
    pub fn endpoint(&self) -> &str {
        self.rest.endpoint()
    }

    /// Edge endpoint URL, if any
    pub fn edge_endpoint(&self) -> Option<&str> {
        self.rest.edge_endpoint()
    }

    /// Get the authentication token
    pub fn token(&self) -> &str {
        self.rest.token()
    }

    /// Send an arbitrary command on the write path (`POST` to the primary endpoint)
    pub async fn execute(&self, cmd: Command) -> Result<Value> {
        debug!(command = cmd.name(), "write");
        self.rest.call(Method::POST, &[] as &[&str], Some(&cmd)).await
    }

    /// Send an arbitrary read-only command on the read path (`GET`, edge endpoint if configured).
    ///
    /// A command with an argument that cannot be a URL path segment (empty,
    /// `.` or `..`) is sent on the write path instead.
    pub async fn query(&self, cmd: Command) -> Result<Value> {
        if cmd.parts().iter().any(|part| is_unsafe_segment(part)) {
            return self.execute(cmd).await;
        }
        debug!(command = cmd.name(), "read");
        self.rest.call(Method::GET, cmd.parts(), None::<&()>).await
    }

    async fn write<T>(&self, cmd: Command) -> Result<T>
    where
        T: TryFrom<Value, Error = Error>,
    {
        self.execute(cmd).await?.try_into()
    }

    async fn read<T>(&self, cmd: Command) -> Result<T>
    where
        T: TryFrom<Value, Error = Error>,
    {
        self.query(cmd).await?.try_into()
    }

    /// Append `value` to the string at `key`, creating it if missing.
    ///
    /// Returns the length of the string after the append.
    ///
    /// <https://redis.io/commands/append>
    pub async fn append(&self, key: &str, value: &str) -> Result<i64> {
        self.write(Command::new("append").arg(key).arg(value)).await
    }

    /// Decrement the integer at `key` by one; a missing key counts as 0.
    ///
    /// <https://redis.io/commands/decr>
    pub async fn decr(&self, key: &str) -> Result<i64> {
        self.write(Command::new("decr").arg(key)).await
    }

    /// Decrement the integer at `key` by `decrement`.
    ///
    /// <https://redis.io/commands/decrby>
    pub async fn decr_by(&self, key: &str, decrement: i64) -> Result<i64> {
        self.write(Command::new("decrby").arg(key).arg(decrement)).await
    }

    /// Get the value of `key`, or `None` when it does not exist.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use kv_rest_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kv_rest_client::Error> {
    /// # let client = Client::from_env()?;
    /// client.set("greeting", "hello").await?;
    /// assert_eq!(client.get("greeting").await?.as_deref(), Some("hello"));
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// <https://redis.io/commands/get>
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(Command::new("get").arg(key)).await
    }

    /// Get the value of `key` and delete it.
    ///
    /// <https://redis.io/commands/getdel>
    pub async fn get_del(&self, key: &str) -> Result<Option<String>> {
        self.write(Command::new("getdel").arg(key)).await
    }

    /// Get the value of `key` and optionally change its expiry.
    ///
    /// <https://redis.io/commands/getex>
    pub async fn get_ex(&self, key: &str, options: GetExOptions) -> Result<Option<String>> {
        self.write(options.apply(Command::new("getex").arg(key))).await
    }

    /// Substring of the value at `key` between `start` and `end`, both
    /// inclusive; negative offsets count from the end. Empty when the key
    /// does not exist.
    ///
    /// <https://redis.io/commands/getrange>
    pub async fn get_range(&self, key: &str, start: i64, end: i64) -> Result<String> {
        let value: Option<String> = self
            .read(Command::new("getrange").arg(key).arg(start).arg(end))
            .await?;
        Ok(value.unwrap_or_default())
    }

    /// Set `key` to `value` and return the old value, if any.
    ///
    /// <https://redis.io/commands/getset>
    pub async fn get_set(&self, key: &str, value: &str) -> Result<Option<String>> {
        self.write(Command::new("getset").arg(key).arg(value)).await
    }

    /// Increment the integer at `key` by one; a missing key counts as 0.
    ///
    /// <https://redis.io/commands/incr>
    pub async fn incr(&self, key: &str) -> Result<i64> {
        self.write(Command::new("incr").arg(key)).await
    }

    /// Increment the integer at `key` by `increment`.
    ///
    /// <https://redis.io/commands/incrby>
    pub async fn incr_by(&self, key: &str, increment: i64) -> Result<i64> {
        self.write(Command::new("incrby").arg(key).arg(increment)).await
    }

    /// Increment the float at `key` by `increment`.
    ///
    /// <https://redis.io/commands/incrbyfloat>
    pub async fn incr_by_float(&self, key: &str, increment: f64) -> Result<f64> {
        self.write(Command::new("incrbyfloat").arg(key).arg(increment))
            .await
    }

    /// Values of all `keys`, in order. Missing keys come back as `"null"`.
    ///
    /// <https://redis.io/commands/mget>
    pub async fn mget<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<String>> {
        self.read(Command::new("mget").args(keys.iter().map(AsRef::<str>::as_ref)))
            .await
    }

    /// Set every pair atomically, overwriting existing values.
    ///
    /// <https://redis.io/commands/mset>
    pub async fn mset(&self, pairs: &[KeyValue]) -> Result<()> {
        self.execute(with_pairs(Command::new("mset"), pairs)).await?;
        Ok(())
    }

    /// Set every pair only if none of the keys exist.
    ///
    /// Returns 1 when all keys were set, 0 when nothing was set.
    ///
    /// <https://redis.io/commands/msetnx>
    pub async fn msetnx(&self, pairs: &[KeyValue]) -> Result<i64> {
        self.write(with_pairs(Command::new("msetnx"), pairs)).await
    }

    /// Set `key` to `value` with an expiry in milliseconds.
    ///
    /// <https://redis.io/commands/psetex>
    pub async fn psetex(&self, key: &str, milliseconds: u64, value: &str) -> Result<()> {
        self.execute(Command::new("psetex").arg(key).arg(milliseconds).arg(value))
            .await?;
        Ok(())
    }

    /// Set `key` to `value`, discarding any previous expiry.
    ///
    /// <https://redis.io/commands/set>
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.execute(Command::new("set").arg(key).arg(value)).await?;
        Ok(())
    }

    /// SET with modifiers.
    ///
    /// With `options.get` this returns the previous value. Otherwise it
    /// returns `Some("OK")` when the value was written and `None` when an
    /// `nx`/`xx` guard prevented it.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use kv_rest_client::{Client, SetOptions};
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kv_rest_client::Error> {
    /// # let client = Client::from_env()?;
    /// let options = SetOptions { ex: 60, nx: true, ..Default::default() };
    /// if client.set_with_options("lock:job", "worker-1", options).await?.is_some() {
    ///     println!("lock acquired");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// <https://redis.io/commands/set>
    pub async fn set_with_options(
        &self,
        key: &str,
        value: &str,
        options: SetOptions,
    ) -> Result<Option<String>> {
        self.write(options.apply(Command::new("set").arg(key).arg(value)))
            .await
    }

    /// Set `key` to `value` with an expiry in seconds.
    ///
    /// <https://redis.io/commands/setex>
    pub async fn setex(&self, key: &str, seconds: u64, value: &str) -> Result<()> {
        self.execute(Command::new("setex").arg(key).arg(seconds).arg(value))
            .await?;
        Ok(())
    }

    /// Set `key` only if it does not exist. Returns 1 if set, 0 if not.
    ///
    /// <https://redis.io/commands/setnx>
    pub async fn setnx(&self, key: &str, value: &str) -> Result<i64> {
        self.write(Command::new("setnx").arg(key).arg(value)).await
    }

    /// Overwrite part of the string at `key` starting at `offset`.
    ///
    /// Returns the length of the string after the change.
    ///
    /// <https://redis.io/commands/setrange>
    pub async fn setrange(&self, key: &str, offset: u64, value: &str) -> Result<i64> {
        self.write(Command::new("setrange").arg(key).arg(offset).arg(value))
            .await
    }

    /// Length of the string at `key`, 0 when it does not exist.
    ///
    /// <https://redis.io/commands/strlen>
    pub async fn strlen(&self, key: &str) -> Result<i64> {
        self.read(Command::new("strlen").arg(key)).await
    }

    /// Delete `keys`. Returns how many existed.
    ///
    /// <https://redis.io/commands/del>
    pub async fn del<K: AsRef<str>>(&self, keys: &[K]) -> Result<i64> {
        self.write(Command::new("del").args(keys.iter().map(AsRef::<str>::as_ref)))
            .await
    }

    /// How many of `keys` exist.
    ///
    /// <https://redis.io/commands/exists>
    pub async fn exists<K: AsRef<str>>(&self, keys: &[K]) -> Result<i64> {
        self.read(Command::new("exists").args(keys.iter().map(AsRef::<str>::as_ref)))
            .await
    }

    /// Check the service is reachable and the token is accepted.
    ///
    /// <https://redis.io/commands/ping>
    pub async fn ping(&self) -> Result<String> {
        self.write(Command::new("ping")).await
    }

    /// Delete every key in every database.
    ///
    /// <https://redis.io/commands/flushall>
    pub async fn flush_all(&self) -> Result<()> {
        self.execute(Command::new("flushall")).await?;
        Ok(())
    }
}

fn with_pairs(cmd: Command, pairs: &[KeyValue]) -> Command {
    cmd.args(
        pairs
            .iter()
            .flat_map(|kv| [kv.key.as_str(), kv.value.as_str()]),
    )
}

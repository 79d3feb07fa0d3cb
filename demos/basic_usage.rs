//! Basic usage example for the REST key-value client
//!
//! Run with:
//! UPSTASH_REDIS_REST_URL=... UPSTASH_REDIS_REST_TOKEN=... cargo run --example basic_usage

use kv_rest_client::{Client, KeyValue, SetOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Endpoint and token come from the environment
    let client = Client::from_env()?;

    info!("Pinging {}...", client.endpoint());
    info!("Reply: {}", client.ping().await?);

    info!("Storing key 'example:hello'...");
    client.set("example:hello", "Hello, REST!").await?;

    match client.get("example:hello").await? {
        Some(value) => info!("Retrieved: {}", value),
        None => info!("Key not found"),
    }

    let length = client.append("example:hello", " Appended.").await?;
    info!("Length after append: {}", length);

    // Counters
    client.set("example:counter", "5").await?;
    info!("incr_by 3 -> {}", client.incr_by("example:counter", 3).await?);
    info!("incr_by_float 0.5 -> {}", client.incr_by_float("example:counter", 0.5).await?);

    // Batch set and get
    client
        .mset(&[
            KeyValue::new("example:a", "1"),
            KeyValue::new("example:b", "2"),
        ])
        .await?;
    let values = client.mget(&["example:a", "example:b", "example:missing"]).await?;
    info!("mget: {:?}", values);

    // Only-if-absent with a short expiry
    let options = SetOptions {
        ex: 10,
        nx: true,
        ..Default::default()
    };
    let first = client.set_with_options("example:lock", "one", options).await?;
    let second = client.set_with_options("example:lock", "two", options).await?;
    info!("lock attempts: {:?} then {:?}", first, second);

    let removed = client
        .del(&[
            "example:hello",
            "example:counter",
            "example:a",
            "example:b",
            "example:lock",
        ])
        .await?;
    info!("Deleted {} keys", removed);

    info!("Example completed successfully!");
    Ok(())
}

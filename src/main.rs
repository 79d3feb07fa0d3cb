//! Command-line front end for the REST key-value client.
//!
//! Endpoint and token fall back to UPSTASH_REDIS_REST_URL and
//! UPSTASH_REDIS_REST_TOKEN when not given as flags.

use clap::{Parser, Subcommand};
use tracing::info;

use kv_rest_client::{Client, ClientConfig, SetOptions};

#[derive(Parser, Debug)]
#[command(name = "kv-rest")]
#[command(about = "Run commands against a REST key-value store")]
struct Args {
    /// Primary REST endpoint
    #[arg(long, default_value = "")]
    endpoint: String,

    /// Edge endpoint used for reads
    #[arg(long)]
    edge_endpoint: Option<String>,

    /// Bearer token
    #[arg(long, default_value = "")]
    token: String,

    /// Request timeout in milliseconds
    #[arg(long, default_value_t = 30000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get {
        /// The key to get
        key: String,
    },

    /// Set a key-value pair
    Set {
        /// The key to set
        key: String,

        /// The value to set
        value: String,

        /// Expire after this many seconds
        #[arg(long, default_value_t = 0)]
        ex: u64,

        /// Expire after this many milliseconds
        #[arg(long, default_value_t = 0)]
        px: u64,

        /// Only set if the key does not exist
        #[arg(long)]
        nx: bool,

        /// Only set if the key exists
        #[arg(long)]
        xx: bool,

        /// Print the previous value
        #[arg(long)]
        get: bool,
    },

    /// Delete keys
    Del {
        /// The keys to delete
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Increment a counter
    Incr {
        /// The counter key
        key: String,
    },

    /// Ping the service
    Ping,

    /// Delete every key
    FlushAll,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let client = Client::with_config(ClientConfig {
        endpoint: args.endpoint,
        edge_endpoint: args.edge_endpoint,
        token: args.token,
        timeout_ms: args.timeout_ms,
        ..Default::default()
    })?;

    info!("Using endpoint {}", client.endpoint());

    match args.command {
        Commands::Get { key } => match client.get(&key).await? {
            Some(value) => println!("{}", value),
            None => println!("(nil)"),
        },
        Commands::Set {
            key,
            value,
            ex,
            px,
            nx,
            xx,
            get,
        } => {
            let options = SetOptions {
                ex,
                px,
                nx,
                xx,
                get,
                ..Default::default()
            };
            match client.set_with_options(&key, &value, options).await? {
                Some(reply) => println!("{}", reply),
                None => println!("(nil)"),
            }
        }
        Commands::Del { keys } => println!("{}", client.del(keys.as_slice()).await?),
        Commands::Incr { key } => println!("{}", client.incr(&key).await?),
        Commands::Ping => println!("{}", client.ping().await?),
        Commands::FlushAll => {
            client.flush_all().await?;
            println!("OK");
        }
    }

    Ok(())
}

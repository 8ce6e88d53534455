//! Banter server binary.
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default port with users.txt beside the binary
//! banter-server
//!
//! # Explicit bind address and credential file
//! banter-server --bind 0.0.0.0:12345 --users /etc/banter/users.txt
//! ```

use banter_server::{Server, ServerConfig};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Banter chat server
#[derive(Parser, Debug)]
#[command(name = "banter-server")]
#[command(about = "Multi-user chat server with group messaging")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:12345")]
    bind: String,

    /// Path to the username:password credential file
    #[arg(short, long, default_value = "users.txt")]
    users: std::path::PathBuf,

    /// Maximum concurrent connections
    #[arg(long, default_value = "100")]
    max_connections: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Banter server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerConfig {
        bind_address: args.bind,
        users_path: args.users,
        max_connections: args.max_connections,
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}

//! Metalobby server binary.
//!
//! # Usage
//!
//! ```bash
//! # Guests only, default port 7395
//! metalobby-server
//!
//! # With registered accounts and shorter keepalive
//! metalobby-server --bind 0.0.0.0:7395 \
//!     --account admin:secret:superuser --account bob:hunter2 \
//!     --send-timeout 20 --ping-cycle 10
//! ```

use std::time::Duration;

use clap::Parser;
use metalobby_core::{MemoryCredentialStore, Permissions};
use metalobby_server::{Server, ServerConfig, ServerError, SystemEnv, TcpAcceptor};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Lobby metaserver
#[derive(Parser, Debug)]
#[command(name = "metalobby-server")]
#[command(about = "Lobby metaserver: login, presence and chat over TCP")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:7395")]
    bind: String,

    /// Seconds a client may stay silent before it is disconnected
    #[arg(long, default_value = "30")]
    send_timeout: u64,

    /// Seconds between PINGs
    #[arg(long, default_value = "15")]
    ping_cycle: u64,

    /// Registered account as NAME:PASSWORD or NAME:PASSWORD:superuser
    #[arg(long = "account", value_name = "NAME:PASSWORD[:LEVEL]")]
    accounts: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Parse `NAME:PASSWORD[:LEVEL]`.
fn parse_account(spec: &str) -> Result<(String, String, Permissions), ServerError> {
    let mut parts = spec.splitn(3, ':');
    let (Some(name), Some(password)) = (parts.next(), parts.next()) else {
        return Err(ServerError::Config(format!("account '{spec}' is not NAME:PASSWORD")));
    };
    if name.is_empty() {
        return Err(ServerError::Config(format!("account '{spec}' has an empty name")));
    }

    let permissions = match parts.next() {
        None => Permissions::Regular,
        Some(level) => level.parse().map_err(ServerError::Config)?,
    };

    Ok((name.to_string(), password.to_string(), permissions))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut store = MemoryCredentialStore::new();
    for spec in &args.accounts {
        let (name, password, permissions) = parse_account(spec)?;
        store.insert(name, password, permissions);
    }

    let config = ServerConfig { bind_address: args.bind, ..Default::default() }
        .with_send_timeout(Duration::from_secs(args.send_timeout))
        .with_ping_cycle(Duration::from_secs(args.ping_cycle));

    tracing::info!("Metalobby server starting");
    tracing::info!(accounts = store.len(), "Binding to {}", config.bind_address);

    let acceptor = TcpAcceptor::bind(&config.bind_address).await?;
    tracing::info!("Server listening on {}", acceptor.local_addr()?);

    let (tx, rx) = mpsc::channel(config.connection_backlog);
    let server = Server::new(config, store, SystemEnv::new()).spawn(rx);
    tokio::spawn(acceptor.forward(tx, server.shutdown_token()));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|e| ServerError::Internal(format!("signal handler failed: {e}")))?;
            server.shutdown();
        },
        () = server.stopped() => {},
    }

    server.stopped().await;
    Ok(())
}

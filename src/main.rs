//! Portfolio site server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser                ┌──────────────────────────────────────────────┐
//!     ───────────────────────┼─▶ headers → CORS → CSRF → rate limit         │
//!                            │                    │                         │
//!                            │        ┌───────────┴───────────┐             │
//!                            │        ▼                       ▼             │
//!                            │   GET / , /csrf-token     POST / (contact)   │
//!                            │   static pages + token    validate, sanitize │
//!                            │                                │             │
//!                            │                                ▼             │
//!                            │                          ContactStore ───────┼──▶ MongoDB
//!                            └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use portfolio_server::config::{load_config, EnvOverrides};
use portfolio_server::lifecycle::{wait_for_signal, AppContext, Shutdown};
use portfolio_server::observability::{logging, metrics};
use portfolio_server::HttpServer;

#[derive(Parser)]
#[command(name = "portfolio-server")]
#[command(about = "Portfolio site with a protected contact form", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "PORTFOLIO_CONFIG")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing .env file is normal in production.
    let _ = dotenvy::dotenv();

    let config = load_config(cli.config.as_deref(), &EnvOverrides::from_env())?;
    if cli.check {
        println!("configuration OK");
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "portfolio-server starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        store = ?config.database.kind,
        allowed_origins = ?config.cors.allowed_origins,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let context = AppContext::connect(config).await?;

    let listener = TcpListener::bind(&context.config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(&context);
    let result = server.run(listener, server_shutdown).await;

    context.teardown().await;
    result?;

    tracing::info!("Shutdown complete");
    Ok(())
}

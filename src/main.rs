use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use restspace::ceremony::CHALLENGE_TTL_SECS;
use restspace::web::create_router;
use restspace::{AppState, Config};

#[derive(Parser, Debug)]
#[command(name = "restspace", about = "Anonymous micro-posting with passkey login")]
struct Args {
    /// Bind host (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Backend connection string (overrides DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,restspace=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    let state = AppState::new(config).await?;
    tracing::info!("application state initialized");

    // Abandoned ceremonies leave orphaned challenge rows; sweep them on a
    // coarse cadence along with the limiter's stale windows.
    let sweep_storage = state.storage.clone();
    let sweep_limiter = state.limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600));
        loop {
            interval.tick().await;
            let cutoff = Utc::now() - chrono::Duration::seconds(CHALLENGE_TTL_SECS);
            match sweep_storage.delete_challenges_before(cutoff).await {
                Ok(0) => {}
                Ok(n) => tracing::debug!("swept {n} expired challenges"),
                Err(e) => tracing::error!("challenge sweep failed: {e}"),
            }
            sweep_limiter.sweep().await;
        }
    });

    let bind_addr = state.config.bind_address();
    let app = create_router(state);

    tracing::info!("listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

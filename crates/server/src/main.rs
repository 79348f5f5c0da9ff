//! Drover server binary.

use anyhow::{Context, Result};
use clap::Parser;
use drover_core::config::AppConfig;
use drover_server::{AppState, create_router};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Drover - coordination server for a distributed archiving swarm
#[derive(Parser, Debug)]
#[command(name = "droverd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "DROVER_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Drover v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration (file is optional, env vars can provide/override everything)
    let config_path = std::path::Path::new(&args.config);
    let mut figment = Figment::new();
    let has_config_file = config_path.exists();

    if has_config_file {
        tracing::info!(config_path = %args.config, "Loading configuration from file");
        figment = figment.merge(Toml::file(&args.config));
    } else {
        tracing::debug!("No config file found at {}", args.config);
    }

    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("DROVER_") && key != "DROVER_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: droverd --config /path/to/config.toml\n  \
             2. Environment variables: DROVER_SERVER__BIND=0.0.0.0:8080 \
             DROVER_STORAGE__BUCKET=my-archive droverd\n\n\
             See config/server.example.toml for example configuration."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("DROVER_").split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid configuration")?;

    // Initialize metadata store (runs migrations)
    let metadata = drover_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    // Initialize the object-store gateway
    let blobs = drover_storage::from_config(&config.storage)
        .await
        .context("failed to initialize object storage")?;
    tracing::info!(s3_url = %blobs.public_base_url(), "Object-store gateway initialized");

    // Until the first batch is finalized there is no verification oracle,
    // so every dispatch necessarily hands out an unfinished batch.
    let finished = metadata.count_batches(true).await?;
    if finished == 0 {
        tracing::warn!(
            "No finished batches yet; worker verification is impossible until the first finalize"
        );
    }

    let state = AppState::new(config.clone(), metadata, blobs);

    // Optional plain-HTTP listener that 301s to the public URL
    if let (Some(redirect_bind), Some(public_url)) = (
        config.server.redirect_bind.as_ref(),
        config.server.public_url.clone(),
    ) {
        let addr: SocketAddr = redirect_bind
            .parse()
            .context("invalid redirect bind address")?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind redirect listener to {}", addr))?;
        tracing::info!("Redirect listener on {} -> {}", addr, public_url);

        tokio::spawn(async move {
            let app = drover_server::redirect::redirect_router(public_url);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Redirect listener failed");
            }
        });
    }

    // Create router
    let app = create_router(state);

    // Parse bind address
    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;

    tracing::info!("Listening on {}", addr);

    // Start server with ConnectInfo for client IP extraction
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

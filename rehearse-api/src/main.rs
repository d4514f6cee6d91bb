//! rehearse-api - Interview practice HTTP service
//!
//! Stores interview sessions per signed-in user, generates and evaluates
//! questions through the hosted model, and reviews live-session transcripts.

use anyhow::Result;
use clap::Parser;
use rehearse_api::auth::IdentityToolkitVerifier;
use rehearse_api::{build_router, store, AppState};
use rehearse_common::config::{IdentityConfig, ModelConfig, ServerConfig, TomlConfig};
use rehearse_common::model::{GeminiClient, InterviewModel};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rehearse-api")]
#[command(about = "Interview practice API service")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on (host:port)
    #[arg(short, long)]
    bind: Option<String>,

    /// Path to the session database
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Hosted model API key
    #[arg(long)]
    model_api_key: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is loaded before tracing so its log level can seed the filter
    let toml_config = TomlConfig::load(args.config.as_deref())?;
    let default_level = toml_config
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    info!(
        "Starting rehearse-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let server_config =
        ServerConfig::resolve(&toml_config, args.bind.as_deref(), args.database.as_deref());
    let model_config = ModelConfig::resolve(&toml_config, args.model_api_key.as_deref());
    let identity_config = IdentityConfig::resolve(&toml_config);

    info!("Database path: {}", server_config.database.display());
    let pool = match store::init_store(&server_config.database).await {
        Ok(pool) => {
            info!("✓ Document store ready");
            pool
        }
        Err(e) => {
            error!("Failed to open document store: {}", e);
            return Err(e.into());
        }
    };

    let gemini = GeminiClient::from_config(&model_config)?;
    info!("Model: {}", model_config.model);
    let verifier = IdentityToolkitVerifier::from_config(&identity_config)?;

    let state = AppState::new(
        pool,
        InterviewModel::new(Arc::new(gemini)),
        Arc::new(verifier),
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&server_config.bind).await?;
    info!("rehearse-api listening on http://{}", server_config.bind);
    info!("Health check: http://{}/api/health", server_config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("rehearse-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! smk3-audit - SMK3 compliance audit service
//!
//! Serves the REST API for evidence management, model-assisted clause
//! analysis, auditor verdicts, dashboards and reports.

use anyhow::{Context, Result};
use clap::Parser;
use smk3_audit::services::blob_store::BlobStore;
use smk3_audit::services::llm::OpenAiCompatibleModel;
use smk3_audit::{build_router, cors_layer, AppState};
use smk3_common::api::load_or_initialize_token_secret;
use smk3_common::config::{RootFolderInitializer, ServiceConfig, TomlConfig};
use smk3_common::db::init_database;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "smk3-audit", version, about = "SMK3 compliance audit service")]
struct Cli {
    /// Config file (defaults to ~/.config/smk3/config.toml or /etc/smk3/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Folder holding smk3.db and the evidence store
    #[arg(long)]
    root_folder: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:5740
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!(
        "Starting SMK3 Audit (smk3-audit) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let cli = Cli::parse();
    let toml_config = TomlConfig::load_or_default(cli.config.as_deref());
    let config = ServiceConfig::resolve(cli.root_folder.as_deref(), cli.bind.as_deref(), &toml_config);

    let initializer = RootFolderInitializer::new(config.root_folder.clone());
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    let token_secret = match config.token_secret.clone() {
        Some(secret) => secret,
        None => load_or_initialize_token_secret(&pool).await?,
    };

    if config.llm.api_key.is_none() {
        warn!("No LLM API key configured; clause analysis will fail until one is set");
    }
    let model = OpenAiCompatibleModel::new(&config.llm)?;
    info!("Analysis model: {} via {}", config.llm.model, config.llm.base_url);

    let blobs = BlobStore::new(initializer.evidence_path());
    info!("Evidence store: {}", blobs.dir().display());

    let state = AppState::new(pool, blobs, Arc::new(model), token_secret, config.token_ttl);
    let app = build_router(state).layer(cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("smk3-audit listening on http://{}", config.bind);
    info!("Health check: http://{}/health", config.bind);

    axum::serve(listener, app).await?;

    Ok(())
}

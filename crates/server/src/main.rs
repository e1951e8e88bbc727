//! shardfs server binary.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use shardfs_core::config::{AppConfig, Deployment, Endpoint};
use shardfs_metadata::MetadataStore;
use shardfs_server::{AppState, create_router};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// shardfs - metadata and block-store servers
#[derive(Parser, Debug)]
#[command(name = "shardfsd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the deployment file listing the metadata store and block stores
    #[arg(short, long, env = "SHARDFS_DEPLOYMENT", default_value = "deployment.txt")]
    deployment: PathBuf,

    /// Path to an optional TOML configuration file
    #[arg(short, long, env = "SHARDFS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    role: RoleArg,
}

#[derive(Subcommand, Debug)]
enum RoleArg {
    /// Serve the metadata store
    Metadata,
    /// Serve one block-store shard
    Block {
        /// Shard index, as listed in the deployment file
        #[arg(long)]
        index: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("shardfs v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_ref())?;
    config
        .server
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid server configuration")?;

    let deployment = Deployment::load(&args.deployment)
        .await
        .with_context(|| format!("failed to load deployment {}", args.deployment.display()))?;
    tracing::info!(
        shards = deployment.shard_count,
        metadata = %deployment.metadata.address(),
        "Deployment loaded"
    );

    shardfs_server::metrics::register_metrics();

    let (state, endpoint) = match args.role {
        RoleArg::Metadata => {
            let store = MetadataStore::from_deployment(&deployment, config.server.request_timeout())
                .context("failed to initialize metadata store")?;
            // Unreachable shards are not fatal: a modify touching them fails with a storage error.
            if let Err(e) = store.health_check().await {
                tracing::warn!(error = %e, "Not all block stores are reachable");
            } else {
                tracing::info!("All block stores reachable");
            }
            let endpoint = deployment.metadata.clone();
            (AppState::metadata(config, Arc::new(store)), endpoint)
        }
        RoleArg::Block { index } => {
            let endpoint = deployment
                .block_stores
                .get(index)
                .cloned()
                .with_context(|| {
                    format!(
                        "block index {index} out of range for {} shards",
                        deployment.shard_count
                    )
                })?;
            let store = shardfs_storage::from_config(&config.storage)
                .await
                .context("failed to initialize storage")?;
            store
                .health_check()
                .await
                .context("storage health check failed")?;
            tracing::info!(index, backend = store.backend_name(), "Block storage initialized");
            (AppState::block(config, index, store), endpoint)
        }
    };

    serve(state, &endpoint).await
}

/// Merge the optional TOML file with `SHARDFS_` environment variables.
fn load_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        tracing::info!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    }

    figment
        .merge(
            Env::prefixed("SHARDFS_")
                .split("__")
                .ignore(&["config", "deployment"]),
        )
        .extract()
        .context("failed to load configuration")
}

async fn serve(state: AppState, endpoint: &Endpoint) -> Result<()> {
    let addr = state
        .config
        .server
        .bind
        .clone()
        .unwrap_or_else(|| endpoint.address());
    let role = state.role.name();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!(role, name = %endpoint.name, "Listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

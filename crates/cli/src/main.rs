//! Command-line client for shardfs.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shardfs_cli::{Client, Outcome};
use shardfs_core::config::{Deployment, RetryConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shardfs")]
#[command(about = "Store and retrieve files on a shardfs deployment")]
#[command(version)]
struct Cli {
    /// Deployment file listing the metadata store and block stores
    #[arg(long, env = "SHARDFS_DEPLOYMENT", default_value = "deployment.txt")]
    deployment: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Version conflicts or timeouts tolerated per upload
    #[arg(long, default_value_t = 64)]
    max_attempts: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file under its file name
    Upload {
        /// Local file to upload
        path: PathBuf,
    },
    /// Download a file into a directory
    Download {
        /// Stored file name
        filename: String,
        /// Destination directory
        dest_dir: PathBuf,
    },
    /// Delete a stored file
    Delete {
        /// Stored file name
        filename: String,
    },
    /// Print the current version and block list of a stored file
    Read {
        /// Stored file name
        filename: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let retry = RetryConfig {
        max_attempts: cli.max_attempts,
        ..Default::default()
    };
    retry
        .validate()
        .map_err(anyhow::Error::msg)
        .context("invalid retry settings")?;

    let deployment = Deployment::load(&cli.deployment)
        .await
        .with_context(|| format!("failed to load deployment {}", cli.deployment.display()))?;
    let client = Client::from_deployment(
        &deployment,
        Duration::from_secs(cli.timeout_secs),
        retry,
    )
    .context("failed to create client")?;

    let outcome = match cli.command {
        Commands::Upload { path } => client
            .upload(&path)
            .await
            .with_context(|| format!("upload of {} failed", path.display()))?,
        Commands::Download { filename, dest_dir } => client
            .download(&filename, &dest_dir)
            .await
            .with_context(|| format!("download of {filename} failed"))?,
        Commands::Delete { filename } => client
            .delete(&filename)
            .await
            .with_context(|| format!("delete of {filename} failed"))?,
        Commands::Read { filename } => {
            match client
                .read(&filename)
                .await
                .with_context(|| format!("read of {filename} failed"))?
            {
                Some(record) => {
                    println!("version {}", record.version);
                    for hash in record.hashlist.unwrap_or_default() {
                        println!("{hash}");
                    }
                    return Ok(());
                }
                None => Outcome::NotFound,
            }
        }
    };

    match outcome {
        Outcome::Ok => println!("OK"),
        Outcome::NotFound => println!("Not Found"),
    }
    Ok(())
}

//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A named `host:port` entry from the deployment file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// `host:port` string suitable for binding or connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL for HTTP clients.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Static deployment topology: one metadata store and N block-store shards.
///
/// File format:
///
/// ```text
/// B: 2
/// metadata: localhost:9000
/// block0: localhost:9001
/// block1: localhost:9002
/// ```
///
/// The first line declares the shard count. The first endpoint line names the
/// metadata store; the remaining lines name block stores in shard-index order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deployment {
    pub shard_count: usize,
    pub metadata: Endpoint,
    pub block_stores: Vec<Endpoint>,
}

impl Deployment {
    /// Parse deployment text.
    pub fn parse(text: &str) -> crate::Result<Self> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'));

        let (header_line, header) = lines.next().ok_or_else(|| crate::Error::Deployment {
            line: 0,
            message: "empty deployment file".to_string(),
        })?;
        let (_, count) = split_entry(header_line, header)?;
        let shard_count: usize = count.parse().map_err(|_| crate::Error::Deployment {
            line: header_line,
            message: format!("invalid shard count: {count}"),
        })?;
        if shard_count == 0 {
            return Err(crate::Error::Deployment {
                line: header_line,
                message: "shard count must be at least 1".to_string(),
            });
        }

        let mut endpoints = Vec::new();
        let mut last_line = header_line;
        for (line_no, line) in lines {
            endpoints.push(parse_endpoint(line_no, line)?);
            last_line = line_no;
        }

        if endpoints.len() != shard_count + 1 {
            return Err(crate::Error::Deployment {
                line: last_line,
                message: format!(
                    "expected 1 metadata store and {} block stores, found {} endpoints",
                    shard_count,
                    endpoints.len()
                ),
            });
        }

        let metadata = endpoints.remove(0);
        Ok(Self {
            shard_count,
            metadata,
            block_stores: endpoints,
        })
    }

    /// Read and parse a deployment file.
    pub async fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::parse(&text)
    }

    /// Shard router for this topology.
    pub fn router(&self) -> crate::Result<crate::ShardRouter> {
        crate::ShardRouter::new(self.shard_count)
    }
}

fn split_entry(line_no: usize, line: &str) -> crate::Result<(&str, &str)> {
    let (name, value) = line.split_once(':').ok_or_else(|| crate::Error::Deployment {
        line: line_no,
        message: format!("expected `<name>: <value>`, got: {line}"),
    })?;
    Ok((name.trim(), value.trim()))
}

fn parse_endpoint(line_no: usize, line: &str) -> crate::Result<Endpoint> {
    let (name, address) = split_entry(line_no, line)?;
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| crate::Error::Deployment {
            line: line_no,
            message: format!("expected `<host>:<port>`, got: {address}"),
        })?;
    let port: u16 = port.trim().parse().map_err(|_| crate::Error::Deployment {
        line: line_no,
        message: format!("invalid port: {port}"),
    })?;
    if host.trim().is_empty() {
        return Err(crate::Error::Deployment {
            line: line_no,
            message: "empty host".to_string(),
        });
    }
    Ok(Endpoint {
        name: name.to_string(),
        host: host.trim().to_string(),
        port,
    })
}

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address override. Defaults to the address listed in the deployment file.
    #[serde(default)]
    pub bind: Option<String>,
    /// Timeout in seconds for requests to block stores made by the metadata store.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Largest accepted `/v1/files` request body. A hashlist costs about 67
    /// bytes per block on the wire, so the default admits files of roughly 16 GiB.
    #[serde(default = "default_max_file_request_bytes")]
    pub max_file_request_bytes: usize,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_max_file_request_bytes() -> usize {
    256 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: None,
            request_timeout_secs: default_request_timeout_secs(),
            metrics_enabled: default_metrics_enabled(),
            max_file_request_bytes: default_max_file_request_bytes(),
        }
    }
}

impl ServerConfig {
    /// Get the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate server configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.request_timeout_secs == 0 {
            return Err("server.request_timeout_secs cannot be 0".to_string());
        }
        if self.max_file_request_bytes == 0 {
            return Err("server.max_file_request_bytes cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Block storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// Volatile in-memory storage.
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/blocks"),
        }
    }
}

/// Client retry policy for the upload reconciliation loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Version conflicts or unknown outcomes tolerated before giving up. Also
    /// caps missing-block pushes for a single proposed version.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff after the first version conflict, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Upper bound for the backoff between attempts, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    64
}

fn default_initial_backoff_ms() -> u64 {
    10
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    /// Backoff before conflict retry number `conflicts` (1-based), doubling each time.
    pub fn backoff(&self, conflicts: u32) -> Duration {
        let shift = conflicts.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }

    /// Validate retry configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(format!(
                "retry.initial_backoff_ms {} exceeds retry.max_backoff_ms {}",
                self.initial_backoff_ms, self.max_backoff_ms
            ));
        }
        Ok(())
    }
}

/// Complete server application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Block storage configuration (block-store role only).
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Create a test configuration using in-memory storage.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::Memory,
        }
    }
}

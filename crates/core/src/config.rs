use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::transport::Transport;

// ── Top-level config ──────────────────────────────────────────

/// Full configuration for a siebwerk deployment.
///
/// Parsed from `siebwerk.toml` with environment variable overrides.
/// Covers the in-process sieve tuning and the cluster transport topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiebwerkConfig {
    /// In-process sieve tuning.
    #[serde(default)]
    pub sieve: SieveSettings,

    /// Cluster transport topology.
    #[serde(default)]
    pub cluster: ClusterSettings,
}

impl SiebwerkConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, CoreError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Config for a single-host deployment over IPC sockets.
    pub fn local() -> Self {
        Self {
            sieve: SieveSettings::default(),
            cluster: ClusterSettings::default(),
        }
    }

    /// Config for a distributed deployment over TCP.
    pub fn distributed(host: &str, results_port: u16) -> Self {
        Self {
            sieve: SieveSettings::default(),
            cluster: ClusterSettings {
                kind: "tcp".into(),
                host: host.into(),
                results_port,
                ipc_prefix: default_ipc_prefix(),
            },
        }
    }

    /// Apply environment variable overrides.
    ///
    /// Convention: `SIEBWERK_SECTION_KEY` overrides `section.key`:
    /// - `SIEBWERK_SIEVE_THREADS` -> `sieve.threads`
    /// - `SIEBWERK_SIEVE_PARTITION_SIZE` -> `sieve.partition_size`
    /// - `SIEBWERK_CLUSTER_KIND` -> `cluster.kind`
    /// - `SIEBWERK_CLUSTER_HOST` -> `cluster.host`
    /// - `SIEBWERK_CLUSTER_RESULTS_PORT` -> `cluster.results_port`
    pub(crate) fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("SIEBWERK_SIEVE_THREADS") {
            if let Ok(n) = v.parse::<usize>() {
                self.sieve.threads = n;
            }
        }
        if let Ok(v) = std::env::var("SIEBWERK_SIEVE_PARTITION_SIZE") {
            if let Ok(n) = v.parse::<u64>() {
                self.sieve.partition_size = n;
            }
        }
        if let Ok(v) = std::env::var("SIEBWERK_CLUSTER_KIND") {
            self.cluster.kind = v;
        }
        if let Ok(v) = std::env::var("SIEBWERK_CLUSTER_HOST") {
            self.cluster.host = v;
        }
        if let Ok(v) = std::env::var("SIEBWERK_CLUSTER_RESULTS_PORT") {
            if let Ok(port) = v.parse::<u16>() {
                self.cluster.results_port = port;
            }
        }
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.sieve.partition_size == 0 {
            return Err(CoreError::Config(
                "sieve.partition_size must be at least 1".into(),
            ));
        }
        match self.cluster.kind.as_str() {
            "ipc" | "tcp" => Ok(()),
            other => Err(CoreError::Config(format!(
                "cluster.kind must be \"ipc\" or \"tcp\", got \"{other}\""
            ))),
        }
    }
}

impl Default for SiebwerkConfig {
    fn default() -> Self {
        Self::local()
    }
}

// ── Sieve section ─────────────────────────────────────────────

/// Tuning for the in-process parallel sieve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieveSettings {
    /// Partition worker threads. 0 = derive from available parallelism.
    #[serde(default)]
    pub threads: usize,

    /// Odd candidates per partition.
    #[serde(default = "default_partition_size")]
    pub partition_size: u64,
}

fn default_partition_size() -> u64 {
    4096
}

impl Default for SieveSettings {
    fn default() -> Self {
        Self {
            threads: 0,
            partition_size: default_partition_size(),
        }
    }
}

impl SieveSettings {
    /// Resolve the partition worker thread count.
    ///
    /// 0 means twice the available execution units — partition workers block
    /// on the controller feed, so light oversubscription keeps cores busy.
    pub fn resolved_threads(&self) -> usize {
        if self.threads == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get() * 2)
                .unwrap_or(4)
        } else {
            self.threads
        }
    }
}

// ── Cluster section ───────────────────────────────────────────

/// Transport topology for the distributed coordinator and its workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSettings {
    /// Transport kind: "ipc" or "tcp".
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Host the coordinator binds its result socket on (tcp only).
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the coordinator's result socket (tcp only).
    #[serde(default = "default_results_port")]
    pub results_port: u16,

    /// IPC socket name prefix (ipc only).
    #[serde(default = "default_ipc_prefix")]
    pub ipc_prefix: String,
}

fn default_kind() -> String {
    "ipc".into()
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_results_port() -> u16 {
    6600
}

fn default_ipc_prefix() -> String {
    "siebwerk".into()
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            host: default_host(),
            results_port: default_results_port(),
            ipc_prefix: default_ipc_prefix(),
        }
    }
}

impl ClusterSettings {
    /// Transport of the coordinator's result socket (workers push here).
    pub fn results_transport(&self) -> Transport {
        match self.kind.as_str() {
            "tcp" => Transport::tcp(&self.host, self.results_port),
            _ => Transport::ipc(&format!("{}-results", self.ipc_prefix)),
        }
    }

    /// Transport of a worker's own task socket, derived from its id
    /// (ipc only — tcp workers announce an explicit endpoint).
    pub fn task_transport(&self, worker_id: &str) -> Transport {
        Transport::ipc(&format!("{}-tasks-{}", self.ipc_prefix, worker_id))
    }
}

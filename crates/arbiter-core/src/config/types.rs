//! Configuration type definitions for the judging worker
//!
//! Every section has defaults matching the reference deployment, so a
//! minimal YAML file (or an empty one) yields a runnable worker pointed at
//! local services. Values are validated once at startup and the config is
//! then shared immutably; nothing mutates it afterwards.

use crate::errors::JudgeError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArbiterConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of concurrent consumer loops, each judging one task at a time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Full score awarded for an accepted submission; partial credit is a
    /// floor-scaled fraction of this.
    #[serde(default = "default_full_score")]
    pub full_score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_url")]
    pub url: String,
    #[serde(default = "default_stream")]
    pub stream: String,
    #[serde(default = "default_group")]
    pub group: String,
    /// Consumer name within the group; generated when empty so several
    /// workers can share one config file.
    #[serde(default)]
    pub consumer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    #[serde(default = "default_image")]
    pub image: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
    #[serde(default = "default_cpu_count")]
    pub cpu_count: u64,
    /// Process/thread cap inside the container, blocking fork bombs.
    #[serde(default = "default_pids_limit")]
    pub pids_limit: i64,
    #[serde(default = "default_workdir")]
    pub workdir: String,
    #[serde(default = "default_run_timeout_ms")]
    pub run_timeout_ms: u64,
    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_ranking_url")]
    pub base_url: String,
}

impl ArbiterConfig {
    /// Validate ranges and required strings. Called once after loading.
    pub fn validate(&self) -> Result<(), JudgeError> {
        if self.worker.concurrency == 0 {
            return Err(JudgeError::ConfigError(
                "worker.concurrency must be at least 1".to_string(),
            ));
        }
        if self.sandbox.pool_size == 0 {
            return Err(JudgeError::ConfigError(
                "sandbox.pool_size must be at least 1".to_string(),
            ));
        }
        if self.sandbox.run_timeout_ms == 0 || self.sandbox.compile_timeout_ms == 0 {
            return Err(JudgeError::ConfigError(
                "sandbox timeouts must be greater than zero".to_string(),
            ));
        }
        if self.sandbox.image.trim().is_empty() {
            return Err(JudgeError::ConfigError(
                "sandbox.image must not be empty".to_string(),
            ));
        }
        if self.queue.stream.trim().is_empty() || self.queue.group.trim().is_empty() {
            return Err(JudgeError::ConfigError(
                "queue.stream and queue.group must not be empty".to_string(),
            ));
        }
        if self.catalog.base_url.trim().is_empty() {
            return Err(JudgeError::ConfigError(
                "catalog.base_url must not be empty".to_string(),
            ));
        }
        if self.ranking.base_url.trim().is_empty() {
            return Err(JudgeError::ConfigError(
                "ranking.base_url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective consumer name: the configured one, or a generated
    /// `worker-<uuid>` when left empty.
    pub fn consumer_name(&self) -> String {
        if self.queue.consumer.trim().is_empty() {
            format!("worker-{}", uuid::Uuid::new_v4())
        } else {
            self.queue.consumer.clone()
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            full_score: default_full_score(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: default_queue_url(),
            stream: default_stream(),
            group: default_group(),
            consumer: String::new(),
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            pool_size: default_pool_size(),
            memory_limit_mb: default_memory_limit_mb(),
            cpu_count: default_cpu_count(),
            pids_limit: default_pids_limit(),
            workdir: default_workdir(),
            run_timeout_ms: default_run_timeout_ms(),
            compile_timeout_ms: default_compile_timeout_ms(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_url(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            base_url: default_ranking_url(),
        }
    }
}

fn default_concurrency() -> usize {
    2
}

fn default_full_score() -> u32 {
    25
}

fn default_queue_url() -> String {
    "redis://127.0.0.1/".to_string()
}

fn default_stream() -> String {
    "oj:judge:queue".to_string()
}

fn default_group() -> String {
    "judge-workers".to_string()
}

fn default_image() -> String {
    "oj-sandbox:v1".to_string()
}

fn default_pool_size() -> usize {
    4
}

fn default_memory_limit_mb() -> u64 {
    100
}

fn default_cpu_count() -> u64 {
    1
}

fn default_pids_limit() -> i64 {
    64
}

fn default_workdir() -> String {
    "/app".to_string()
}

fn default_run_timeout_ms() -> u64 {
    10_000
}

fn default_compile_timeout_ms() -> u64 {
    20_000
}

fn default_catalog_url() -> String {
    "http://127.0.0.1:8101".to_string()
}

fn default_ranking_url() -> String {
    "http://127.0.0.1:8102".to_string()
}

//! Error types for failure handling across the judging pipeline
//!
//! Two layers: `JudgeError` is the crate-wide error for the consumer,
//! collaborators and configuration, categorized by the subsystem that failed
//! so the worker can decide between reporting a verdict and dropping the
//! message. `SandboxError` is specific to the container runtime boundary;
//! when it escapes the execution engine it is the signal that a leased
//! sandbox may be compromised and must be replaced rather than reused.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudgeError {
    #[error("Queue error: {0}")]
    QueueError(String),
    #[error("Problem catalog error: {0}")]
    CatalogError(String),
    #[error("Ranking board error: {0}")]
    RankingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Sandbox pool error: {0}")]
    PoolError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for JudgeError {
    fn from(err: std::io::Error) -> Self {
        JudgeError::InternalError(err.to_string())
    }
}

impl From<reqwest::Error> for JudgeError {
    fn from(err: reqwest::Error) -> Self {
        JudgeError::CatalogError(err.to_string())
    }
}

impl From<redis::RedisError> for JudgeError {
    fn from(err: redis::RedisError) -> Self {
        JudgeError::QueueError(err.to_string())
    }
}

// Specific error for the container runtime boundary
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Bollard (Docker client) error: {0}")]
    BollardError(#[from] bollard::errors::Error),
    #[error("I/O error during sandbox operation: {0}")]
    IoError(#[from] std::io::Error),
    #[error("UTF-8 decoding error from sandbox output: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
    #[error("Timed out after {0} ms waiting for sandbox command")]
    ExecTimeout(u64),
    #[error("Sandbox transport error: {0}")]
    Transport(String),
}

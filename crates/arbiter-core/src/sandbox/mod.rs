//! Sandboxed execution of untrusted code.
//!
//! Three layers, each behind its own seam:
//!
//! - [`ContainerRuntime`]: the raw container boundary (create/destroy,
//!   file upload, command execution with a timeout). Implemented for Docker
//!   by [`docker::DockerRuntime`]; tests substitute fakes.
//! - [`pool::SandboxPool`]: a fixed-size set of warm containers leased out
//!   under mutual exclusion.
//! - [`engine::ExecutionEngine`]: compile-and-run orchestration inside one
//!   leased sandbox.

use crate::errors::SandboxError;
use async_trait::async_trait;
use std::time::Duration;

pub mod docker;
pub mod engine;
pub mod pool;

/// Opaque identifier of one pooled, pre-started sandbox.
///
/// Deliberately not `Clone`: a handle is held by exactly one in-flight
/// execution at a time, and the pool never hands out the same handle twice
/// concurrently.
#[derive(Debug, PartialEq, Eq)]
pub struct SandboxHandle {
    id: String,
}

impl SandboxHandle {
    pub fn new(id: String) -> Self {
        Self { id }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Captured result of one command run inside a sandbox.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// The container/runtime boundary consumed by the pool and the engine.
///
/// Errors from these methods indicate trouble on the judging
/// infrastructure's side (transport failure, wait timeout), never a
/// misbehaving user program; a non-zero exit code inside [`ExecOutput`] is
/// the user-program error path.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create and start one warm sandbox, returning its handle.
    async fn create_sandbox(&self) -> Result<SandboxHandle, SandboxError>;

    /// Force-remove a sandbox.
    async fn destroy_sandbox(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;

    /// Remove all files from the sandbox working directory, so nothing
    /// leaks between submissions.
    async fn clean_workdir(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;

    /// Place `content` at `file_name` inside the sandbox working directory.
    async fn upload_file(
        &self,
        handle: &SandboxHandle,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), SandboxError>;

    /// Run a command inside the sandbox, capturing stdout/stderr and the
    /// exit code, bounded by `timeout` wall-clock time.
    async fn exec(
        &self,
        handle: &SandboxHandle,
        cmd: &[String],
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError>;
}

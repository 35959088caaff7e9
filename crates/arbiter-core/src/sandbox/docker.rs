//! Docker implementation of the container runtime boundary.
//!
//! Warm sandboxes are ordinary containers kept alive by a no-op long-running
//! command (`tail -f /dev/null`) with networking disabled and memory, CPU
//! and process-count caps applied at creation time. Files go in as in-memory
//! tar archives; commands run through the exec API with stdout/stderr
//! attached and the whole wait bounded by a wall-clock timeout.

use async_trait::async_trait;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecOptions, StartExecResults};
use bollard::models::ContainerCreateBody;
use bollard::query_parameters::{
    CreateContainerOptions as BollardCreateContainerOptionsQuery,
    RemoveContainerOptions as BollardRemoveContainerOptionsQuery,
    StartContainerOptions as BollardStartContainerOptionsQuery,
    UploadToContainerOptions as BollardUploadToContainerOptionsQuery,
};
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::default::Default;
use std::time::Duration;
use uuid::Uuid;

use super::{ContainerRuntime, ExecOutput, SandboxHandle};
use crate::config::SandboxConfig;
use crate::errors::SandboxError;

/// Timeout for housekeeping commands (workdir cleanup), separate from the
/// configured compile/run timeouts.
const HOUSEKEEPING_TIMEOUT: Duration = Duration::from_secs(10);

pub struct DockerRuntime {
    docker: Docker,
    config: SandboxConfig,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon.
    pub fn connect(config: SandboxConfig) -> Result<Self, SandboxError> {
        let docker = Docker::connect_with_local_defaults()?;
        Ok(Self { docker, config })
    }

    fn memory_limit_bytes(&self) -> i64 {
        (self.config.memory_limit_mb * 1_000_000) as i64
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_sandbox(&self) -> Result<SandboxHandle, SandboxError> {
        let options = Some(BollardCreateContainerOptionsQuery {
            name: Some(format!("judge-sandbox-{}", Uuid::new_v4())),
            ..Default::default()
        });

        let config = ContainerCreateBody {
            image: Some(self.config.image.clone()),
            // Keep the container alive without doing anything; work arrives
            // later through exec.
            cmd: Some(vec![
                "tail".to_string(),
                "-f".to_string(),
                "/dev/null".to_string(),
            ]),
            working_dir: Some(self.config.workdir.clone()),
            network_disabled: Some(true),
            attach_stdin: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            tty: Some(true),
            host_config: Some(bollard::models::HostConfig {
                memory: Some(self.memory_limit_bytes()),
                nano_cpus: Some((self.config.cpu_count * 1_000_000_000) as i64),
                pids_limit: Some(self.config.pids_limit),
                ..Default::default()
            }),
            ..Default::default()
        };

        let container = self.docker.create_container(options, config).await?;
        self.docker
            .start_container(&container.id, None::<BollardStartContainerOptionsQuery>)
            .await?;
        log::info!("Created warm sandbox container {}", container.id);
        Ok(SandboxHandle::new(container.id))
    }

    async fn destroy_sandbox(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        self.docker
            .remove_container(
                handle.id(),
                Some(BollardRemoveContainerOptionsQuery {
                    force: true,
                    ..Default::default()
                }),
            )
            .await?;
        log::info!("Destroyed sandbox container {}", handle.id());
        Ok(())
    }

    async fn clean_workdir(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        let cmd = vec![
            "sh".to_string(),
            "-c".to_string(),
            "rm -rf ./*".to_string(),
        ];
        let output = self.exec(handle, &cmd, HOUSEKEEPING_TIMEOUT).await?;
        if !output.succeeded() {
            log::warn!(
                "Workdir cleanup in sandbox {} exited with {}: {}",
                handle.id(),
                output.exit_code,
                output.stderr
            );
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        handle: &SandboxHandle,
        file_name: &str,
        content: &[u8],
    ) -> Result<(), SandboxError> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, file_name, content)?;
        let archive = builder.into_inner()?;

        self.docker
            .upload_to_container(
                handle.id(),
                Some(BollardUploadToContainerOptionsQuery {
                    path: self.config.workdir.clone(),
                    ..Default::default()
                }),
                bollard::body_full(archive.into()),
            )
            .await?;
        Ok(())
    }

    async fn exec(
        &self,
        handle: &SandboxHandle,
        cmd: &[String],
        timeout: Duration,
    ) -> Result<ExecOutput, SandboxError> {
        let exec = self
            .docker
            .create_exec(
                handle.id(),
                CreateExecOptions {
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    working_dir: Some(self.config.workdir.clone()),
                    cmd: Some(cmd.to_vec()),
                    ..Default::default()
                },
            )
            .await?;

        let started = self
            .docker
            .start_exec(&exec.id, None::<StartExecOptions>)
            .await?;

        let mut stdout = String::new();
        let mut stderr = String::new();

        match started {
            StartExecResults::Attached { mut output, .. } => {
                let drain = async {
                    while let Some(chunk) = output.next().await {
                        match chunk? {
                            LogOutput::StdErr { message } => {
                                stderr.push_str(std::str::from_utf8(&message)?)
                            }
                            // With a TTY attached, output can arrive on the
                            // console stream; treat anything that is not
                            // stderr as stdout, as the exit code decides the
                            // outcome.
                            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                                stdout.push_str(std::str::from_utf8(&message)?)
                            }
                            _ => {}
                        }
                    }
                    Ok::<(), SandboxError>(())
                };

                match tokio::time::timeout(timeout, drain).await {
                    Ok(result) => result?,
                    Err(_) => {
                        log::warn!(
                            "Command in sandbox {} exceeded {} ms",
                            handle.id(),
                            timeout.as_millis()
                        );
                        return Err(SandboxError::ExecTimeout(timeout.as_millis() as u64));
                    }
                }
            }
            StartExecResults::Detached => {
                return Err(SandboxError::Transport(
                    "exec unexpectedly started detached".to_string(),
                ));
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        let exit_code = inspect.exit_code.ok_or_else(|| {
            SandboxError::Transport("exec finished without an exit code".to_string())
        })?;

        Ok(ExecOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

//! Compile-and-run orchestration inside one leased sandbox.
//!
//! The engine owns the per-language profiles (source file name, optional
//! compile command, run command reading a fixed input file) and the
//! clean / upload / compile / run-per-case sequence. User-program failures
//! (compile errors, non-zero exits, including timeout-as-non-zero) come back
//! as an [`ExecutionResult`]; an `Err` from this module means the judging
//! infrastructure itself failed mid-run and the leased sandbox must be
//! treated as suspect.

use crate::config::SandboxConfig;
use crate::core_types::{ExecutionRequest, ExecutionResult, RunStatus};
use crate::errors::SandboxError;
use crate::sandbox::{ContainerRuntime, SandboxHandle};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Name of the fixed file each run command reads its standard input from.
const INPUT_FILE: &str = "input.txt";

struct LanguageProfile {
    source_file: &'static str,
    compile_cmd: Option<&'static str>,
    run_cmd: &'static str,
}

/// Normalize the submitted language label and map it to a profile.
fn profile_for(language: &str) -> Option<LanguageProfile> {
    match language.trim().to_lowercase().as_str() {
        "java" => Some(LanguageProfile {
            source_file: "Main.java",
            compile_cmd: Some("javac -encoding utf-8 Main.java"),
            run_cmd: "java -cp . Main < input.txt",
        }),
        "cpp" | "c++" => Some(LanguageProfile {
            source_file: "main.cpp",
            compile_cmd: Some("g++ -o Main main.cpp"),
            run_cmd: "./Main < input.txt",
        }),
        "python" | "python3" => Some(LanguageProfile {
            source_file: "main.py",
            compile_cmd: None,
            run_cmd: "python3 main.py < input.txt",
        }),
        _ => None,
    }
}

fn shell(command: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), command.to_string()]
}

pub struct ExecutionEngine {
    runtime: Arc<dyn ContainerRuntime>,
    run_timeout: Duration,
    compile_timeout: Duration,
}

impl ExecutionEngine {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, config: &SandboxConfig) -> Self {
        Self {
            runtime,
            run_timeout: Duration::from_millis(config.run_timeout_ms),
            compile_timeout: Duration::from_millis(config.compile_timeout_ms),
        }
    }

    /// Execute a request inside the leased sandbox.
    ///
    /// The run loop stops at the first non-zero exit: later cases are never
    /// attempted once one fails at the runtime level, so a runtime failure
    /// yields no partial credit. Output comparison only happens downstream
    /// when every case ran cleanly.
    pub async fn run(
        &self,
        sandbox: &SandboxHandle,
        request: &ExecutionRequest,
    ) -> Result<ExecutionResult, SandboxError> {
        let profile = match profile_for(&request.language) {
            Some(p) => p,
            None => {
                // No sandbox work for a language we cannot run.
                return Ok(ExecutionResult::system_error(format!(
                    "Unsupported language: {}",
                    request.language
                )));
            }
        };

        // Clear whatever the previous submission left behind.
        self.runtime.clean_workdir(sandbox).await?;

        self.runtime
            .upload_file(sandbox, profile.source_file, request.code.as_bytes())
            .await?;

        if let Some(compile_cmd) = profile.compile_cmd {
            let compiled = self
                .runtime
                .exec(sandbox, &shell(compile_cmd), self.compile_timeout)
                .await?;
            if !compiled.succeeded() {
                log::info!(
                    "Compilation failed in sandbox {} (exit {})",
                    sandbox.id(),
                    compiled.exit_code
                );
                return Ok(ExecutionResult {
                    status: RunStatus::CompileError,
                    outputs: Vec::new(),
                    message: format!("{}\n{}", compiled.stderr, compiled.stdout),
                    elapsed_ms: 0,
                    memory_kb: 0,
                });
            }
        }

        let mut outputs = Vec::with_capacity(request.inputs.len());
        let mut max_elapsed_ms: u64 = 0;

        for input in &request.inputs {
            self.runtime
                .upload_file(sandbox, INPUT_FILE, input.as_bytes())
                .await?;

            let started = Instant::now();
            let run = self
                .runtime
                .exec(sandbox, &shell(profile.run_cmd), self.run_timeout)
                .await?;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            max_elapsed_ms = max_elapsed_ms.max(elapsed_ms);

            if !run.succeeded() {
                log::info!(
                    "Run failed in sandbox {} (exit {})",
                    sandbox.id(),
                    run.exit_code
                );
                return Ok(ExecutionResult {
                    status: RunStatus::RuntimeError,
                    outputs: Vec::new(),
                    message: run.stderr,
                    elapsed_ms: max_elapsed_ms,
                    memory_kb: 0,
                });
            }
            outputs.push(run.stdout.trim().to_string());
        }

        // Per-run memory is not exposed by the warm-container setup; 0 means
        // unknown.
        Ok(ExecutionResult {
            status: RunStatus::Normal,
            outputs,
            message: String::new(),
            elapsed_ms: max_elapsed_ms,
            memory_kb: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ExecOutput;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn ok_exec(stdout: &str) -> Result<ExecOutput, SandboxError> {
        Ok(ExecOutput {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    fn failed_exec(exit_code: i64, stderr: &str) -> Result<ExecOutput, SandboxError> {
        Ok(ExecOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    /// Runtime that replays a queue of canned exec results and records what
    /// the engine asked of it.
    struct ScriptedRuntime {
        exec_results: Mutex<VecDeque<Result<ExecOutput, SandboxError>>>,
        uploads: Mutex<Vec<String>>,
        exec_count: AtomicUsize,
        touched: AtomicUsize,
    }

    impl ScriptedRuntime {
        fn new(results: Vec<Result<ExecOutput, SandboxError>>) -> Self {
            Self {
                exec_results: Mutex::new(results.into()),
                uploads: Mutex::new(Vec::new()),
                exec_count: AtomicUsize::new(0),
                touched: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContainerRuntime for ScriptedRuntime {
        async fn create_sandbox(&self) -> Result<SandboxHandle, SandboxError> {
            Ok(SandboxHandle::new("scripted".to_string()))
        }

        async fn destroy_sandbox(&self, _handle: &SandboxHandle) -> Result<(), SandboxError> {
            Ok(())
        }

        async fn clean_workdir(&self, _handle: &SandboxHandle) -> Result<(), SandboxError> {
            self.touched.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn upload_file(
            &self,
            _handle: &SandboxHandle,
            file_name: &str,
            _content: &[u8],
        ) -> Result<(), SandboxError> {
            self.touched.fetch_add(1, Ordering::SeqCst);
            self.uploads.lock().unwrap().push(file_name.to_string());
            Ok(())
        }

        async fn exec(
            &self,
            _handle: &SandboxHandle,
            _cmd: &[String],
            _timeout: Duration,
        ) -> Result<ExecOutput, SandboxError> {
            self.touched.fetch_add(1, Ordering::SeqCst);
            self.exec_count.fetch_add(1, Ordering::SeqCst);
            self.exec_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ok_exec(""))
        }
    }

    fn engine(runtime: Arc<ScriptedRuntime>) -> ExecutionEngine {
        ExecutionEngine::new(runtime, &SandboxConfig::default())
    }

    fn request(language: &str, inputs: &[&str]) -> ExecutionRequest {
        ExecutionRequest {
            code: "print(1)".to_string(),
            language: language.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_unknown_language_does_no_sandbox_work() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![]));
        let sandbox = SandboxHandle::new("s".to_string());
        let result = engine(runtime.clone())
            .run(&sandbox, &request("cobol", &["1"]))
            .await
            .unwrap();
        assert_eq!(result.status, RunStatus::SystemError);
        assert!(result.message.contains("cobol"));
        assert_eq!(runtime.touched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_compile_failure_short_circuits() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![failed_exec(
            1,
            "main.cpp:1: error: expected ';'",
        )]));
        let sandbox = SandboxHandle::new("s".to_string());
        let result = engine(runtime.clone())
            .run(&sandbox, &request("cpp", &["1 2", "4 5"]))
            .await
            .unwrap();
        assert_eq!(result.status, RunStatus::CompileError);
        assert!(result.message.contains("expected ';'"));
        // Only the source file went up; the compile exec was the sole exec.
        assert_eq!(*runtime.uploads.lock().unwrap(), vec!["main.cpp"]);
        assert_eq!(runtime.exec_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_runtime_failure_aborts_remaining_cases() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![
            ok_exec("3\n"),
            failed_exec(139, "Segmentation fault"),
        ]));
        let sandbox = SandboxHandle::new("s".to_string());
        let result = engine(runtime.clone())
            .run(&sandbox, &request("python", &["a", "b", "c"]))
            .await
            .unwrap();
        assert_eq!(result.status, RunStatus::RuntimeError);
        assert!(result.message.contains("Segmentation fault"));
        assert!(result.outputs.is_empty());
        // Two runs happened (python has no compile step), the third case was
        // never attempted.
        assert_eq!(runtime.exec_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_normal_run_collects_trimmed_outputs() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![
            ok_exec(" 3 \n"),
            ok_exec("9\n"),
        ]));
        let sandbox = SandboxHandle::new("s".to_string());
        let result = engine(runtime.clone())
            .run(&sandbox, &request("python3", &["1 2", "4 5"]))
            .await
            .unwrap();
        assert_eq!(result.status, RunStatus::Normal);
        assert_eq!(result.outputs, vec!["3", "9"]);
        assert_eq!(result.memory_kb, 0);
        // Source once, then input.txt per case.
        assert_eq!(
            *runtime.uploads.lock().unwrap(),
            vec!["main.py", "input.txt", "input.txt"]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces_as_engine_error() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![Err(SandboxError::Transport(
            "connection reset".to_string(),
        ))]));
        let sandbox = SandboxHandle::new("s".to_string());
        let outcome = engine(runtime)
            .run(&sandbox, &request("python", &["1"]))
            .await;
        assert!(outcome.is_err());
    }

    #[tokio::test]
    async fn test_java_profile_compiles_before_running() {
        let runtime = Arc::new(ScriptedRuntime::new(vec![ok_exec(""), ok_exec("42\n")]));
        let sandbox = SandboxHandle::new("s".to_string());
        let result = engine(runtime.clone())
            .run(&sandbox, &request(" Java ", &["in"]))
            .await
            .unwrap();
        assert_eq!(result.status, RunStatus::Normal);
        assert_eq!(result.outputs, vec!["42"]);
        assert_eq!(
            *runtime.uploads.lock().unwrap(),
            vec!["Main.java", "input.txt"]
        );
        assert_eq!(runtime.exec_count.load(Ordering::SeqCst), 2);
    }
}

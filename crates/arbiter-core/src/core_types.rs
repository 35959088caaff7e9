//! Shared data types flowing through the judging pipeline.
//!
//! A submission travels as `SubmissionTask` -> `ExecutionRequest` ->
//! `ExecutionResult` -> `Verdict`. Statuses are closed enums matched
//! exhaustively; the small-integer codes used on the wire by the catalog
//! service exist only at the serialization boundary via `code()`.

use serde::{Deserialize, Serialize};

/// A dequeued judging task. Immutable once fetched from the catalog.
/// Wire names follow the catalog service's JSON convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionTask {
    pub submit_id: i64,
    pub problem_id: i64,
    #[serde(default)]
    pub contest_id: Option<i64>,
    pub user_id: i64,
    pub language: String,
    pub code: String,
}

/// One input/expected-output pair, ordered within its problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub output: String,
}

/// What the execution engine is asked to run.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: String,
    pub inputs: Vec<String>,
}

impl ExecutionRequest {
    pub fn from_task(task: &SubmissionTask, cases: &[TestCase]) -> Self {
        Self {
            code: task.code.clone(),
            language: task.language.clone(),
            inputs: cases.iter().map(|c| c.input.clone()).collect(),
        }
    }
}

/// Outcome category of a sandbox run, before any output comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Normal,
    CompileError,
    RuntimeError,
    SystemError,
}

/// Raw result of executing a submission against all test inputs.
///
/// `outputs` holds one entry per input and is only populated when `status`
/// is `Normal`. `memory_kb` is best-effort and 0 when the runtime cannot
/// expose per-run memory.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: RunStatus,
    pub outputs: Vec<String>,
    pub message: String,
    pub elapsed_ms: u64,
    pub memory_kb: u64,
}

impl ExecutionResult {
    pub fn system_error(message: impl Into<String>) -> Self {
        Self {
            status: RunStatus::SystemError,
            outputs: Vec::new(),
            message: message.into(),
            elapsed_ms: 0,
            memory_kb: 0,
        }
    }
}

/// Terminal judging outcome category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgeResult {
    Accepted,
    WrongAnswer,
    CompileError,
    RuntimeError,
    SystemError,
}

impl JudgeResult {
    pub fn code(&self) -> u8 {
        match self {
            JudgeResult::Accepted => 1,
            JudgeResult::WrongAnswer => 2,
            JudgeResult::CompileError => 3,
            JudgeResult::RuntimeError => 4,
            JudgeResult::SystemError => 5,
        }
    }
}

/// Lifecycle of a submission record as stored by the catalog service.
/// The consumer only ever writes `Finished`; `Waiting` is set at intake and
/// `Judging` is implicit while a worker holds the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    Waiting,
    Judging,
    Finished,
}

impl SubmitStatus {
    pub fn code(&self) -> u8 {
        match self {
            SubmitStatus::Waiting => 10,
            SubmitStatus::Judging => 20,
            SubmitStatus::Finished => 30,
        }
    }
}

/// The terminal artifact of judging one submission.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub submit_id: i64,
    pub status: SubmitStatus,
    pub judge_result: JudgeResult,
    pub pass_count: u32,
    pub total_count: u32,
    pub score: u32,
    pub time_cost_ms: u64,
    pub memory_cost_kb: u64,
    pub error_message: Option<String>,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        self.judge_result == JudgeResult::Accepted
    }
}

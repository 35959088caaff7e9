//! Verdict derivation and partial-credit scoring.
//!
//! A pure function over the raw execution result and the problem's test
//! cases: no I/O, no clock, identical inputs always produce the identical
//! verdict. Because [`RunStatus`] is a closed enum matched exhaustively,
//! there is no "unknown status" branch to defend against.

use crate::core_types::{
    ExecutionResult, JudgeResult, RunStatus, SubmitStatus, TestCase, Verdict,
};

/// Classify an execution result into a terminal verdict and score it.
///
/// `full_score` is the per-problem constant supplied by the caller. Partial
/// credit is only reachable when execution status is `Normal`: a runtime
/// failure aborts the whole run upstream and scores zero.
pub fn judge(
    submit_id: i64,
    execution: &ExecutionResult,
    cases: &[TestCase],
    full_score: u32,
) -> Verdict {
    let total_count = cases.len() as u32;

    let (judge_result, pass_count, error_message) = match execution.status {
        RunStatus::CompileError => (
            JudgeResult::CompileError,
            0,
            Some(execution.message.clone()),
        ),
        RunStatus::RuntimeError => (
            JudgeResult::RuntimeError,
            0,
            Some(execution.message.clone()),
        ),
        RunStatus::SystemError => (
            JudgeResult::SystemError,
            0,
            Some(execution.message.clone()),
        ),
        RunStatus::Normal => compare_outputs(&execution.outputs, cases),
    };

    let score = compute_score(judge_result, pass_count, total_count, full_score);

    Verdict {
        submit_id,
        status: SubmitStatus::Finished,
        judge_result,
        pass_count,
        total_count,
        score,
        time_cost_ms: execution.elapsed_ms,
        memory_cost_kb: execution.memory_kb,
        error_message,
    }
}

/// Compare produced outputs with expected ones, trimming both sides.
///
/// Every case is visited so `pass_count` reflects all matches, but the
/// verdict is fixed at the first mismatch. Accepted only when everything
/// matched.
fn compare_outputs(
    outputs: &[String],
    cases: &[TestCase],
) -> (JudgeResult, u32, Option<String>) {
    if outputs.len() != cases.len() {
        return (
            JudgeResult::WrongAnswer,
            0,
            Some("output count mismatch".to_string()),
        );
    }

    let mut pass_count = 0;
    let mut first_mismatch: Option<usize> = None;

    for (index, (actual, case)) in outputs.iter().zip(cases.iter()).enumerate() {
        if actual.trim() == case.output.trim() {
            pass_count += 1;
        } else if first_mismatch.is_none() {
            first_mismatch = Some(index);
        }
    }

    match first_mismatch {
        None => (JudgeResult::Accepted, pass_count, None),
        Some(index) => (
            JudgeResult::WrongAnswer,
            pass_count,
            Some(format!("wrong answer on case {}", index + 1)),
        ),
    }
}

/// Full score on acceptance, floor-scaled fraction on partial passes, zero
/// otherwise.
fn compute_score(result: JudgeResult, pass_count: u32, total_count: u32, full_score: u32) -> u32 {
    if result == JudgeResult::Accepted {
        full_score
    } else if total_count > 0 && pass_count > 0 {
        ((pass_count as u64 * full_score as u64) / total_count as u64) as u32
    } else {
        0
    }
}

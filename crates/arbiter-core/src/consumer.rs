//! Queue-driven orchestration of the judging pipeline.
//!
//! One worker processes one message at a time to completion: fetch the
//! submission and test cases, screen the code, lease a sandbox, execute,
//! judge, publish the verdict, then acknowledge. Test cases run sequentially
//! inside a single lease so the reported time is a reliable maximum and the
//! run can stop early on the first failure.
//!
//! The message is acked only after the verdict write succeeds. Anything that
//! fails before that point produces a best-effort `SystemError` verdict and
//! a nack without requeue: the broker's redelivery of unacked messages is
//! the only retry mechanism, and a deterministically-failing task must not
//! loop forever.

use crate::catalog::ProblemCatalog;
use crate::core_types::{
    ExecutionRequest, ExecutionResult, JudgeResult, SubmissionTask, SubmitStatus, TestCase,
    Verdict,
};
use crate::errors::JudgeError;
use crate::queue::{Delivery, JudgeQueue};
use crate::ranking::RankingBoard;
use crate::sandbox::engine::ExecutionEngine;
use crate::sandbox::pool::SandboxPool;
use crate::screener::SecurityScreener;
use crate::strategy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub struct JudgeWorker {
    screener: Arc<SecurityScreener>,
    pool: Arc<SandboxPool>,
    engine: Arc<ExecutionEngine>,
    catalog: Arc<dyn ProblemCatalog>,
    ranking: Arc<dyn RankingBoard>,
    full_score: u32,
}

impl JudgeWorker {
    pub fn new(
        screener: Arc<SecurityScreener>,
        pool: Arc<SandboxPool>,
        engine: Arc<ExecutionEngine>,
        catalog: Arc<dyn ProblemCatalog>,
        ranking: Arc<dyn RankingBoard>,
        full_score: u32,
    ) -> Self {
        Self {
            screener,
            pool,
            engine,
            catalog,
            ranking,
            full_score,
        }
    }

    /// Consume tasks until the shutdown flag flips.
    pub async fn run(&self, queue: Arc<dyn JudgeQueue>, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::info!("Worker loop stopping");
                        return;
                    }
                }
                delivery = queue.next_task() => {
                    match delivery {
                        Ok(delivery) => self.handle_delivery(delivery).await,
                        Err(e) => {
                            log::error!("Queue receive failed: {}", e);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    }

    /// Process one delivery end to end and settle it with the broker.
    pub async fn handle_delivery(&self, delivery: Box<dyn Delivery>) {
        let submit_id = delivery.submit_id();
        match self.process(submit_id).await {
            Ok(()) => {
                if let Err(e) = delivery.ack().await {
                    log::error!("Failed to ack submit_id {}: {}", submit_id, e);
                }
            }
            Err(e) => {
                log::error!("Judging submit_id {} failed: {}", submit_id, e);
                // Best effort: leave a terminal verdict rather than a
                // submission stuck in Waiting.
                let verdict = system_error_verdict(submit_id, &e);
                if let Err(push) = self.catalog.update_verdict(&verdict).await {
                    log::warn!(
                        "Could not record error verdict for submit_id {}: {}",
                        submit_id,
                        push
                    );
                }
                if let Err(nack) = delivery.nack().await {
                    log::error!("Failed to nack submit_id {}: {}", submit_id, nack);
                }
            }
        }
    }

    async fn process(&self, submit_id: i64) -> Result<(), JudgeError> {
        let task = self.catalog.get_submission(submit_id).await?;
        let cases = self.catalog.get_test_cases(task.problem_id).await?;

        let execution = match self.screener.screen(&task.code, &task.language) {
            Some(violation) => {
                // Short-circuit: no sandbox is leased for code that fails
                // the static screen.
                log::warn!(
                    "Submission {} rejected by security screen: {}",
                    submit_id,
                    violation.pattern
                );
                ExecutionResult::system_error(format!(
                    "Malicious code detected: sensitive operation [{}]",
                    violation.pattern
                ))
            }
            None => self.execute(&task, &cases).await?,
        };

        let verdict = strategy::judge(submit_id, &execution, &cases, self.full_score);
        self.catalog.update_verdict(&verdict).await?;

        // Stats must never undo a recorded verdict; log and move on.
        if let Err(e) = self
            .ranking
            .record(
                task.user_id,
                task.problem_id,
                task.contest_id,
                verdict.score,
                verdict.is_accepted(),
            )
            .await
        {
            log::error!(
                "Ranking update failed for submit_id {}: {}",
                submit_id,
                e
            );
        }
        Ok(())
    }

    /// Lease a sandbox and run the engine, settling the lease on every path:
    /// a clean run returns the handle for reuse, an engine-level failure
    /// replaces it and is reported as a `SystemError` execution result.
    async fn execute(
        &self,
        task: &SubmissionTask,
        cases: &[TestCase],
    ) -> Result<ExecutionResult, JudgeError> {
        let request = ExecutionRequest::from_task(task, cases);
        let sandbox = self.pool.acquire().await?;
        match self.engine.run(&sandbox, &request).await {
            Ok(result) => {
                self.pool.release(sandbox).await;
                Ok(result)
            }
            Err(e) => {
                log::error!("Sandbox execution failed, handle is suspect: {}", e);
                self.pool.replace(sandbox).await;
                Ok(ExecutionResult::system_error(format!(
                    "Sandbox failure: {}",
                    e
                )))
            }
        }
    }
}

fn system_error_verdict(submit_id: i64, error: &JudgeError) -> Verdict {
    Verdict {
        submit_id,
        status: SubmitStatus::Finished,
        judge_result: JudgeResult::SystemError,
        pass_count: 0,
        total_count: 0,
        score: 0,
        time_cost_ms: 0,
        memory_cost_kb: 0,
        error_message: Some(error.to_string()),
    }
}

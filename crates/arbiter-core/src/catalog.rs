//! Problem catalog collaborator.
//!
//! The catalog service owns submissions, problems and their test cases. The
//! core consumes from it (submission code and language, ordered test cases)
//! and publishes back to it (the terminal verdict, which marks the
//! submission `Finished` and bumps the per-problem submit/accept counters
//! server-side). Only this narrow interface is visible to the pipeline.

use crate::core_types::{SubmissionTask, TestCase, Verdict};
use crate::errors::JudgeError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[async_trait]
pub trait ProblemCatalog: Send + Sync {
    /// Fetch the full submission for a dequeued id.
    async fn get_submission(&self, submit_id: i64) -> Result<SubmissionTask, JudgeError>;

    /// Fetch the problem's ordered test cases.
    async fn get_test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>, JudgeError>;

    /// Publish the terminal verdict for a submission.
    async fn update_verdict(&self, verdict: &Verdict) -> Result<(), JudgeError>;
}

/// HTTP client for the catalog service's internal endpoints.
pub struct HttpProblemCatalog {
    base_url: String,
    client: Client,
}

impl HttpProblemCatalog {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

/// Verdict as the catalog service expects it: statuses as small-integer
/// codes, camelCase field names.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerdictPayload<'a> {
    submit_id: i64,
    status: u8,
    judge_result: u8,
    pass_case_count: u32,
    total_case_count: u32,
    score: u32,
    time_cost: u64,
    memory_cost: u64,
    error_message: Option<&'a str>,
}

impl<'a> From<&'a Verdict> for VerdictPayload<'a> {
    fn from(verdict: &'a Verdict) -> Self {
        Self {
            submit_id: verdict.submit_id,
            status: verdict.status.code(),
            judge_result: verdict.judge_result.code(),
            pass_case_count: verdict.pass_count,
            total_case_count: verdict.total_count,
            score: verdict.score,
            time_cost: verdict.time_cost_ms,
            memory_cost: verdict.memory_cost_kb,
            error_message: verdict.error_message.as_deref(),
        }
    }
}

#[async_trait]
impl ProblemCatalog for HttpProblemCatalog {
    async fn get_submission(&self, submit_id: i64) -> Result<SubmissionTask, JudgeError> {
        let url = format!("{}/inner/submission/{}", self.base_url, submit_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(JudgeError::CatalogError(format!(
                "Fetching submission {} failed: HTTP {}",
                submit_id,
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn get_test_cases(&self, problem_id: i64) -> Result<Vec<TestCase>, JudgeError> {
        let url = format!("{}/inner/problem/{}/test-cases", self.base_url, problem_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(JudgeError::CatalogError(format!(
                "Fetching test cases for problem {} failed: HTTP {}",
                problem_id,
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    async fn update_verdict(&self, verdict: &Verdict) -> Result<(), JudgeError> {
        let url = format!("{}/inner/submission/verdict", self.base_url);
        let payload = VerdictPayload::from(verdict);
        let response = self.client.post(&url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(JudgeError::CatalogError(format!(
                "Publishing verdict for submission {} failed: HTTP {}",
                verdict.submit_id,
                response.status()
            )));
        }
        log::info!(
            "Published verdict for submit_id {}: {:?} ({}/{} cases, score {})",
            verdict.submit_id,
            verdict.judge_result,
            verdict.pass_count,
            verdict.total_count,
            verdict.score
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{JudgeResult, SubmitStatus};

    #[test]
    fn test_verdict_payload_uses_wire_codes() {
        let verdict = Verdict {
            submit_id: 9,
            status: SubmitStatus::Finished,
            judge_result: JudgeResult::WrongAnswer,
            pass_count: 1,
            total_count: 2,
            score: 12,
            time_cost_ms: 80,
            memory_cost_kb: 0,
            error_message: Some("wrong answer on case 2".to_string()),
        };
        let json = serde_json::to_value(VerdictPayload::from(&verdict)).unwrap();
        assert_eq!(json["submitId"], 9);
        assert_eq!(json["status"], 30);
        assert_eq!(json["judgeResult"], 2);
        assert_eq!(json["passCaseCount"], 1);
        assert_eq!(json["totalCaseCount"], 2);
        assert_eq!(json["score"], 12);
        assert_eq!(json["errorMessage"], "wrong answer on case 2");
    }

    #[test]
    fn test_base_url_trailing_slash_is_normalized() {
        let catalog = HttpProblemCatalog::new("http://localhost:8101/".to_string());
        assert_eq!(catalog.base_url, "http://localhost:8101");
    }
}

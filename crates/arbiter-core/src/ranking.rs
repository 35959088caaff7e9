//! Ranking board collaborator.
//!
//! Leaderboard aggregation lives entirely on the server side; the worker
//! only reports `(user, problem, score, accepted)` after each verdict. The
//! server's handling of repeat acceptances is idempotent, so reporting the
//! same AC twice never double-counts. Failures here are logged and swallowed
//! by the consumer: a lost ranking update must never roll back a verdict.

use crate::errors::JudgeError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[async_trait]
pub trait RankingBoard: Send + Sync {
    /// Report one judged submission for leaderboard aggregation.
    async fn record(
        &self,
        user_id: i64,
        problem_id: i64,
        contest_id: Option<i64>,
        score: u32,
        accepted: bool,
    ) -> Result<(), JudgeError>;
}

/// HTTP client for the ranking service's internal record endpoint.
pub struct HttpRankingBoard {
    base_url: String,
    client: Client,
}

impl HttpRankingBoard {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordPayload {
    user_id: i64,
    problem_id: i64,
    contest_id: Option<i64>,
    score: u32,
    accepted: bool,
}

#[async_trait]
impl RankingBoard for HttpRankingBoard {
    async fn record(
        &self,
        user_id: i64,
        problem_id: i64,
        contest_id: Option<i64>,
        score: u32,
        accepted: bool,
    ) -> Result<(), JudgeError> {
        let url = format!("{}/inner/ranking/record", self.base_url);
        let payload = RecordPayload {
            user_id,
            problem_id,
            contest_id,
            score,
            accepted,
        };
        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| JudgeError::RankingError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(JudgeError::RankingError(format!(
                "Ranking record for user {} failed: HTTP {}",
                user_id,
                response.status()
            )));
        }
        Ok(())
    }
}

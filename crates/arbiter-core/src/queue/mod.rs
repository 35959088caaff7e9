//! Inbound task queue abstraction.
//!
//! The consumer never sees a broker client: it receives a [`Delivery`] with
//! explicit ack/nack capabilities and the decoded submission id. The broker's
//! redelivery of unacknowledged messages is the sole retry mechanism; a nack
//! drops the message without requeueing so a deterministically-failing task
//! cannot loop forever.

use crate::errors::JudgeError;
use async_trait::async_trait;

pub mod redis;

pub use self::redis::RedisJudgeQueue;

/// One in-flight queue message.
#[async_trait]
pub trait Delivery: Send {
    /// Submission id carried by the message.
    fn submit_id(&self) -> i64;

    /// Confirm successful processing; the broker forgets the message.
    async fn ack(self: Box<Self>) -> Result<(), JudgeError>;

    /// Report failed processing; the message is dropped, not requeued.
    async fn nack(self: Box<Self>) -> Result<(), JudgeError>;
}

/// Source of judging tasks.
#[async_trait]
pub trait JudgeQueue: Send + Sync {
    /// Block until the next task arrives.
    async fn next_task(&self) -> Result<Box<dyn Delivery>, JudgeError>;
}

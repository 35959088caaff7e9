//! Redis Streams implementation of the judge queue.
//!
//! Tasks arrive as stream entries with a `submit_id` field, consumed through
//! a consumer group so every message is delivered to exactly one worker.
//! Acking removes the entry from the pending list; a worker crash leaves its
//! entries pending for broker-side reclaim, which is the at-least-once
//! redelivery path. Nack also acks: the poison message is dropped rather
//! than retried indefinitely.
//!
//! Blocking reads and acks never share a connection. `XREADGROUP ... BLOCK`
//! parks the connection it runs on, so each `next_task` call opens its own
//! read connection and the shared multiplexed connection carries only
//! non-blocking commands (`XACK`). Otherwise one idle worker's block would
//! stall every other worker's acks for up to the block interval.

use crate::errors::JudgeError;
use crate::queue::{Delivery, JudgeQueue};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

/// How long one blocking read waits before polling again, keeping the loop
/// responsive to shutdown.
const BLOCK_MS: usize = 5_000;

pub struct RedisJudgeQueue {
    client: redis::Client,
    // Ack-only connection; blocking reads use a dedicated one per call.
    conn: ConnectionManager,
    stream: String,
    group: String,
    consumer: String,
}

impl RedisJudgeQueue {
    /// Connect and make sure the consumer group exists.
    pub async fn connect(
        url: &str,
        stream: &str,
        group: &str,
        consumer: &str,
    ) -> Result<Self, JudgeError> {
        let client = redis::Client::open(url)
            .map_err(|e| JudgeError::QueueError(format!("Invalid redis URL: {}", e)))?;
        let mut conn = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| JudgeError::QueueError(format!("Failed to connect to redis: {}", e)))?;

        let created: Result<(), redis::RedisError> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(stream)
            .arg(group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;
        match created {
            Ok(()) => log::info!("Created consumer group '{}' on stream '{}'", group, stream),
            // The group surviving a worker restart is the normal case.
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                log::debug!("Consumer group '{}' already exists", group)
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Self {
            client,
            conn,
            stream: stream.to_string(),
            group: group.to_string(),
            consumer: consumer.to_string(),
        })
    }

    async fn ack_entry(
        conn: &mut ConnectionManager,
        stream: &str,
        group: &str,
        entry_id: &str,
    ) -> Result<(), JudgeError> {
        let _: i64 = conn.xack(stream, group, &[entry_id]).await?;
        Ok(())
    }
}

#[async_trait]
impl JudgeQueue for RedisJudgeQueue {
    async fn next_task(&self) -> Result<Box<dyn Delivery>, JudgeError> {
        // The blocking read parks this connection for up to BLOCK_MS, so it
        // must not be the shared ack connection.
        let mut read_conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                JudgeError::QueueError(format!("Failed to open read connection: {}", e))
            })?;
        let mut ack_conn = self.conn.clone();
        loop {
            let options = StreamReadOptions::default()
                .group(&self.group, &self.consumer)
                .block(BLOCK_MS)
                .count(1);
            let reply: StreamReadReply = read_conn
                .xread_options(&[&self.stream], &[">"], &options)
                .await?;

            for key in reply.keys {
                for entry in key.ids {
                    let submit_id = entry
                        .map
                        .get("submit_id")
                        .and_then(|v| redis::from_redis_value::<i64>(v).ok());
                    match submit_id {
                        Some(submit_id) => {
                            log::info!(
                                "Received judging task, submit_id: {} (entry {})",
                                submit_id,
                                entry.id
                            );
                            return Ok(Box::new(RedisDelivery {
                                conn: ack_conn,
                                stream: self.stream.clone(),
                                group: self.group.clone(),
                                entry_id: entry.id,
                                submit_id,
                            }));
                        }
                        None => {
                            // Malformed entry: drop it so it cannot poison
                            // the pending list.
                            log::warn!(
                                "Dropping malformed queue entry {} (no submit_id)",
                                entry.id
                            );
                            Self::ack_entry(&mut ack_conn, &self.stream, &self.group, &entry.id)
                                .await?;
                        }
                    }
                }
            }
            // Blocking read timed out with nothing to do; poll again.
        }
    }
}

struct RedisDelivery {
    conn: ConnectionManager,
    stream: String,
    group: String,
    entry_id: String,
    submit_id: i64,
}

#[async_trait]
impl Delivery for RedisDelivery {
    fn submit_id(&self) -> i64 {
        self.submit_id
    }

    async fn ack(self: Box<Self>) -> Result<(), JudgeError> {
        let mut this = *self;
        RedisJudgeQueue::ack_entry(&mut this.conn, &this.stream, &this.group, &this.entry_id)
            .await
    }

    async fn nack(self: Box<Self>) -> Result<(), JudgeError> {
        let mut this = *self;
        log::warn!(
            "Dropping task for submit_id {} (entry {}) without requeue",
            this.submit_id,
            this.entry_id
        );
        RedisJudgeQueue::ack_entry(&mut this.conn, &this.stream, &this.group, &this.entry_id)
            .await
    }
}

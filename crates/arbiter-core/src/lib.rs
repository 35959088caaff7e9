//! Core library for the Arbiter judging worker.
//!
//! This crate implements the judging subsystem of the online judge: it
//! consumes submitted-code tasks from a queue, statically screens the code
//! for denylisted operations, executes it inside resource-capped,
//! network-isolated containers drawn from a warm pool, compares the produced
//! output against the expected results, and publishes a graded verdict back
//! to the problem catalog and ranking services.
//!
//! # Architecture Overview
//!
//! The subsystem is organized leaf-to-root:
//!
//! - **Security screener**: pattern-based static rejection of known-dangerous
//!   operations, per source language
//! - **Sandbox pool**: fixed-size set of warm, pre-started containers handed
//!   out under mutual exclusion
//! - **Execution engine**: upload, compile, run-per-test-case inside a leased
//!   sandbox with wall-clock timeouts
//! - **Judge strategy**: pure classification of raw execution results into a
//!   verdict with partial-credit scoring
//! - **Task consumer**: queue-driven orchestration of the above with explicit
//!   ack/nack handling
//!
//! Everything outside the pipeline (problem catalog, ranking board, the queue
//! broker) is an external collaborator reached through a narrow trait.

pub mod catalog;
pub mod config;
pub mod consumer;
pub mod core_types;
pub mod errors;
pub mod queue;
pub mod ranking;
pub mod sandbox;
pub mod screener;
pub mod strategy;

pub use catalog::ProblemCatalog;
pub use config::{ArbiterConfig, ConfigLoader};
pub use consumer::JudgeWorker;
pub use core_types::{
    ExecutionRequest, ExecutionResult, JudgeResult, RunStatus, SubmissionTask, SubmitStatus,
    TestCase, Verdict,
};
pub use errors::{JudgeError, SandboxError};
pub use queue::{Delivery, JudgeQueue};
pub use ranking::RankingBoard;
pub use sandbox::engine::ExecutionEngine;
pub use sandbox::pool::SandboxPool;
pub use sandbox::ContainerRuntime;
pub use screener::SecurityScreener;

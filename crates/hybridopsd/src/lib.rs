//! hybridopsd - HybridOps supervisor API
//!
//! Operator login, job store, Slack intake and the plan/execute protocol
//! that gates every tool call.

pub mod auth;
pub mod idempotency;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod slack;
pub mod supervisor;

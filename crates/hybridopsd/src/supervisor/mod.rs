//! Supervisor: confirm-before-act protocol in front of the tool gate

pub mod client;
pub mod orchestrator;

pub use client::{GateReply, HttpToolGateClient, ToolGateClient};
pub use orchestrator::Orchestrator;

//! hybridopsctl library - exposes modules for testing

pub mod cli;
pub mod client;
pub mod commands;

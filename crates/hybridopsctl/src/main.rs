//! hybridopsctl - operator CLI for the HybridOps supervisor

use anyhow::Result;
use clap::Parser;
use hybridops_common::logging;
use hybridopsctl::cli::Cli;
use hybridopsctl::commands;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("warn");
    commands::run(Cli::parse()).await
}

//! Subcommand execution

use crate::cli::{Cli, Commands};
use crate::client::ApiClient;
use anyhow::Result;
use hybridops_common::protocol::{ExecuteRequest, PlanRequest, Status, ToolParams};
use serde::Serialize;
use tracing::debug;

pub async fn run(cli: Cli) -> Result<()> {
    let client = ApiClient::new(&cli.api_url, cli.token)?;
    debug!("Supervisor API: {}", cli.api_url);

    match cli.command {
        Commands::Login { email, password } => {
            let resp = client.login(&email, &password).await?;
            eprintln!("Logged in as {} ({})", resp.user.email, resp.user.role);
            println!("{}", resp.token);
        }
        Commands::Plan { text, language } => {
            let resp = client.plan(&PlanRequest { text, language }).await?;
            print_json(&resp)?;
            if let (Some(tool), Some(token)) = (&resp.parsed_tool, &resp.confirm_token) {
                if let Some(instruction) = &resp.execute_instruction {
                    eprintln!("\n{}", instruction);
                }
                eprintln!("  hybridopsctl execute --tool {} --confirm-token {} --command ...", tool, token);
            }
        }
        Commands::Execute {
            command,
            confirm_token,
            tool,
            params,
        } => {
            let req = ExecuteRequest {
                execute_command: command,
                confirm_token,
                tool,
                params: params.into_iter().collect::<ToolParams>(),
            };
            let resp = client.execute(&req).await?;
            print_json(&resp)?;
            if resp.status == Status::Error {
                std::process::exit(1);
            }
        }
        Commands::Tools => print_json(&client.tools().await?)?,
        Commands::Status => print_json(&client.status().await?)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

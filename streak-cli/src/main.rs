//! STREAK command-line client

mod cli;
mod commands;
mod state;

use clap::Parser;
use serde::Serialize;

use cli::{Cli, Commands};
use commands::{timer, CommandResult};
use state::AppState;

#[tokio::main]
async fn main() {
    streak_core::init_logging();

    if let Err(e) = run().await {
        let result = CommandResult::<()>::err(format!("{:#}", e));
        println!("{}", serde_json::to_string(&result).unwrap_or_default());
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let state = AppState::new(cli.config.as_deref())?;

    let success = match cli.command {
        Commands::History => emit(&timer::history(&state).await)?,
        Commands::Active => emit(&timer::active(&state).await)?,
        Commands::Start { abstinence } => emit(&timer::start(&state, abstinence).await)?,
        Commands::End => emit(&timer::end(&state).await)?,
        Commands::Watch => {
            timer::watch(&state).await?;
            true
        }
    };

    state.client().dispose();
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn emit<T: Serialize>(result: &CommandResult<T>) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(result.success)
}

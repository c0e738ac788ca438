use std::path::Path;

use crate::cli::RemoteCommands;
use crate::commands::common::{write_output, CliContext};
use crate::error::CliError;

pub async fn run_remote(context: &CliContext, command: RemoteCommands) -> Result<(), CliError> {
    match command {
        RemoteCommands::Pull { output } => run_pull(context, output.as_deref()).await,
        RemoteCommands::Delete { yes } => run_delete(context, yes).await,
    }
}

async fn run_pull(context: &CliContext, output_path: Option<&Path>) -> Result<(), CliError> {
    let mut state = context.load_state()?;
    let orchestrator = context.orchestrator(&state);
    let pulled = orchestrator.pull().await;
    context.remember_rate_limit(&mut state, &orchestrator)?;

    let pulled = pulled.inspect_err(|error| tracing::warn!("Pull failed: {}", error))?;
    match pulled {
        Some(snapshot) => {
            tracing::info!(basket = %context.config.basket_name, "Pulled cloud basket");
            write_output(&serde_json::to_string_pretty(&snapshot)?, output_path)
        }
        None => {
            tracing::info!(basket = %context.config.basket_name, "Cloud basket is empty");
            println!("No cloud data found for basket '{}'", context.config.basket_name);
            Ok(())
        }
    }
}

pub async fn run_delete(context: &CliContext, confirmed: bool) -> Result<(), CliError> {
    if !confirmed {
        return Err(CliError::ConfirmationRequired(format!(
            "delete cloud basket '{}'",
            context.config.basket_name
        )));
    }

    let mut state = context.load_state()?;
    let orchestrator = context.orchestrator(&state);
    let deleted = orchestrator.delete_remote().await;
    context.remember_rate_limit(&mut state, &orchestrator)?;
    deleted.inspect_err(|error| tracing::warn!("Delete failed: {}", error))?;
    tracing::info!(basket = %context.config.basket_name, "Deleted cloud basket");

    println!("Deleted cloud basket '{}'", context.config.basket_name);
    Ok(())
}

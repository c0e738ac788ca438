use lpt_core::sync::{format_time_remaining, render_change_lines, SyncAction};
use lpt_core::SyncResult;

use crate::commands::common::CliContext;
use crate::error::CliError;

/// Sync local data with the basket and apply any merge locally.
pub async fn sync_local_data(
    context: &CliContext,
    no_wait: bool,
) -> Result<SyncResult, CliError> {
    let mut state = context.load_state()?;
    let orchestrator = context.orchestrator(&state);

    let rate_limit = orchestrator.rate_limit_status();
    if !rate_limit.can_make_request {
        let remaining = format_time_remaining(rate_limit.time_until_next_request);
        if no_wait {
            return Err(CliError::RateLimited(remaining));
        }
        eprintln!("Rate limited, waiting {remaining} before syncing...");
    }

    let store = context.local_store();
    let outcome = orchestrator.sync_store(&store).await;
    // Failed requests still used up rate budget.
    context.remember_rate_limit(&mut state, &orchestrator)?;

    match outcome {
        Ok(result) => {
            let summary = result.changes.summary();
            tracing::info!(
                action = ?result.action,
                situations = %summary.situations,
                opportunities = %summary.opportunities,
                events = %summary.events,
                "Sync finished"
            );
            Ok(result)
        }
        Err(error) => {
            tracing::warn!("Sync failed: {}", error);
            Err(error.into())
        }
    }
}

pub async fn run_sync(context: &CliContext, as_json: bool, no_wait: bool) -> Result<(), CliError> {
    let result = sync_local_data(context, no_wait).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.message);
    if result.action != SyncAction::Synced {
        let summary = result.changes.summary();
        println!(
            "Situations {} | Opportunities {} | Events {}",
            summary.situations, summary.opportunities, summary.events
        );
        for line in render_change_lines(&result.changes) {
            println!("{line}");
        }
    }
    Ok(())
}

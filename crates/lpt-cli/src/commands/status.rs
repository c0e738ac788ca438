use chrono::DateTime;
use lpt_core::sync::{format_time_remaining, RateLimitStatus};
use serde::Serialize;

use crate::commands::common::CliContext;
use crate::error::CliError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusItem {
    pub logged_in: bool,
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub basket: String,
    pub rate_limit: RateLimitStatus,
}

pub fn collect_status(context: &CliContext) -> Result<StatusItem, CliError> {
    let state = context.load_state()?;
    let orchestrator = context.orchestrator(&state);
    Ok(StatusItem {
        logged_in: state.account.is_some(),
        email: state.account.as_ref().map(|account| account.email.clone()),
        user_id: state.account.as_ref().map(|account| account.user_id.clone()),
        basket: context.config.basket_name.clone(),
        rate_limit: orchestrator.rate_limit_status(),
    })
}

pub fn run_status(context: &CliContext, as_json: bool) -> Result<(), CliError> {
    let status = collect_status(context)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    for line in format_status_lines(&status) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_status_lines(status: &StatusItem) -> Vec<String> {
    let mut lines = Vec::new();
    match &status.email {
        Some(email) => lines.push(format!("Account: {email}")),
        None => lines.push("Account: not logged in".to_string()),
    }
    lines.push(format!("Basket: {}", status.basket));

    let rate_limit = &status.rate_limit;
    if rate_limit.can_make_request {
        lines.push("Sync: ready".to_string());
    } else {
        lines.push(format!(
            "Sync: rate limited, wait {}",
            format_time_remaining(rate_limit.time_until_next_request)
        ));
    }
    if let Some(last) = DateTime::from_timestamp_millis(rate_limit.last_request_time)
        .filter(|_| rate_limit.last_request_time > 0)
    {
        lines.push(format!("Last request: {}", last.to_rfc3339()));
    }
    lines
}

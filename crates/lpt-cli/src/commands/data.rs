use std::path::{Path, PathBuf};

use lpt_core::export::{parse_import, render_json_export, suggested_export_file_name};
use lpt_core::store::LocalStore;
use lpt_core::util::now_millis;

use crate::commands::common::{write_output, CliContext};
use crate::error::CliError;

pub async fn run_export(context: &CliContext, output_path: Option<&Path>) -> Result<(), CliError> {
    let snapshot = context.local_store().load_snapshot().await?;
    let rendered = render_json_export(&snapshot)?;
    let target = output_path.map(resolve_export_path);
    write_output(&rendered, target.as_deref())?;

    let stats = snapshot.current_stats();
    tracing::info!(
        situations = stats.situations,
        opportunities = stats.opportunities,
        events = stats.events,
        "Exported local data"
    );
    Ok(())
}

/// A directory target gets a timestamped file name inside it.
fn resolve_export_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(suggested_export_file_name(now_millis()))
    } else {
        path.to_path_buf()
    }
}

pub async fn run_import(context: &CliContext, input_path: &Path) -> Result<(), CliError> {
    let raw = tokio::fs::read_to_string(input_path).await?;
    let snapshot = parse_import(&raw)?;
    context.local_store().save_snapshot(&snapshot).await?;

    let stats = snapshot.current_stats();
    tracing::info!(path = %input_path.display(), "Imported local data");
    println!(
        "Imported {} situations, {} opportunities, {} events",
        stats.situations, stats.opportunities, stats.events
    );
    Ok(())
}

//! JSON backup format shared by every front end.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Event, Opportunity, Situation, Snapshot, Timestamp};
use crate::util::now_millis;

pub const EXPORT_VERSION: &str = "1.0";

/// Collections carried by an export
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportData {
    #[serde(default)]
    pub situations: Vec<Situation>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_date: Timestamp,
    pub data: ExportData,
}

/// Wrap the collections of `snapshot` in an export document stamped now.
#[must_use]
pub fn build_export(snapshot: &Snapshot) -> ExportDocument {
    ExportDocument {
        version: EXPORT_VERSION.to_string(),
        export_date: Timestamp::now(),
        data: ExportData {
            situations: snapshot.situations.clone(),
            opportunities: snapshot.opportunities.clone(),
            events: snapshot.events.clone(),
        },
    }
}

/// Render `snapshot` as a pretty-printed export document.
pub fn render_json_export(snapshot: &Snapshot) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&build_export(snapshot))
}

/// Read an export document back into a snapshot.
///
/// Only the `data` object is required; missing collections import as empty.
/// The imported snapshot is stamped with the import time.
pub fn parse_import(raw: &str) -> Result<Snapshot> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let Some(data) = value.get("data").filter(|data| data.is_object()) else {
        return Err(Error::InvalidInput("Invalid import data format".to_string()));
    };
    let data: ExportData = serde_json::from_value(data.clone())
        .map_err(|error| Error::InvalidInput(format!("Invalid import data format: {error}")))?;

    let snapshot = Snapshot {
        situations: data.situations,
        opportunities: data.opportunities,
        events: data.events,
        last_updated: now_millis(),
        stats: None,
    };
    snapshot.validate()?;
    Ok(snapshot)
}

/// Build a deterministic default file name for export flows.
#[must_use]
pub fn suggested_export_file_name(timestamp_ms: i64) -> String {
    format!("life-progress-export-{timestamp_ms}.json")
}

//! Human-readable rendering of sync outcomes.

use super::diff::{ChangeSet, SyncChanges, SyncEntity};
use crate::util::truncate_chars;

const DESCRIPTION_PREVIEW_CHARS: usize = 50;

/// One line per changed record, grouped by collection then by kind.
///
/// Collections without changes are omitted; an empty result means nothing
/// changed.
#[must_use]
pub fn render_change_lines(changes: &SyncChanges) -> Vec<String> {
    let mut lines = Vec::new();
    render_collection(&mut lines, "Situations", &changes.situations);
    render_collection(&mut lines, "Opportunities", &changes.opportunities);
    render_collection(&mut lines, "Events", &changes.events);
    lines
}

fn render_collection<T: SyncEntity>(lines: &mut Vec<String>, label: &str, set: &ChangeSet<T>) {
    if set.is_empty() {
        return;
    }
    lines.push(format!("{label} ({})", set.counts()));

    if !set.added.is_empty() {
        lines.push(format!("  Added ({})", set.added.len()));
        lines.extend(set.added.iter().map(record_line));
    }
    if !set.modified.is_empty() {
        lines.push(format!("  Updated ({})", set.modified.len()));
        lines.extend(set.modified.iter().map(record_line));
    }
    if !set.deleted.is_empty() {
        lines.push(format!("  Removed ({})", set.deleted.len()));
        lines.extend(set.deleted.iter().map(|id| format!("    - ID: {id}")));
    }
}

fn record_line<T: SyncEntity>(record: &T) -> String {
    let title = if record.display_title().is_empty() {
        "(untitled)"
    } else {
        record.display_title()
    };
    match record.display_description().filter(|d| !d.trim().is_empty()) {
        Some(description) => format!(
            "    - {title} - {}",
            truncate_chars(description, DESCRIPTION_PREVIEW_CHARS)
        ),
        None => format!("    - {title}"),
    }
}

/// Compact countdown such as `45s` or `1m 5s`; partial seconds round up.
#[must_use]
pub fn format_time_remaining(ms: u64) -> String {
    if ms == 0 {
        return "0s".to_string();
    }
    let seconds = ms.div_ceil(1000);
    if seconds < 60 {
        return format!("{seconds}s");
    }
    format!("{}m {}s", seconds / 60, seconds % 60)
}

//! Fold change sets onto the remote snapshot.

use std::collections::{HashMap, HashSet};

use super::diff::{ChangeSet, SyncChanges, SyncEntity};
use crate::models::{EntityId, Snapshot};
use crate::util::now_millis;

/// Apply one collection's changes to a copy of the remote records.
///
/// Order is fixed: append `added`, replace `modified` in place (appending
/// when the id is unexpectedly absent), then drop `deleted` ids.
pub fn merge_collection<T: SyncEntity>(remote: &[T], changes: &ChangeSet<T>) -> Vec<T> {
    let mut merged: Vec<T> = remote.to_vec();
    merged.extend(changes.added.iter().cloned());

    let mut index_by_id: HashMap<EntityId, usize> = merged
        .iter()
        .enumerate()
        .map(|(index, item)| (item.entity_id().clone(), index))
        .collect();

    for item in &changes.modified {
        if let Some(&index) = index_by_id.get(item.entity_id()) {
            merged[index] = item.clone();
        } else {
            tracing::warn!(
                collection = T::COLLECTION,
                id = %item.entity_id(),
                "Modified record missing from remote, appending"
            );
            index_by_id.insert(item.entity_id().clone(), merged.len());
            merged.push(item.clone());
        }
    }

    if !changes.deleted.is_empty() {
        let deleted: HashSet<&EntityId> = changes.deleted.iter().collect();
        merged.retain(|item| !deleted.contains(item.entity_id()));
    }

    merged
}

/// Merger over all three collections.
///
/// Remote-only top-level data is kept; stats are recounted and `lastUpdated`
/// is set to the merge time.
pub fn merge_snapshots(remote: &Snapshot, changes: &SyncChanges) -> Snapshot {
    let mut merged = Snapshot {
        situations: merge_collection(&remote.situations, &changes.situations),
        opportunities: merge_collection(&remote.opportunities, &changes.opportunities),
        events: merge_collection(&remote.events, &changes.events),
        last_updated: now_millis(),
        stats: remote.stats,
    };
    if merged.stats.is_some() {
        merged.stats = Some(merged.current_stats());
    }
    merged
}

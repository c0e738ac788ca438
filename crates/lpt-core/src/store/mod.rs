//! Local persistence contract.
//!
//! The sync engine never writes local data itself. After a merge the front
//! end hands the merged snapshot to a [`LocalStore`], which applies it record
//! by record using the same added/modified/deleted partition the differencer
//! produces.

mod json_file;
mod memory;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

pub use json_file::JsonFileStore;
pub use memory::MemoryLocalStore;

use crate::error::Result;
use crate::models::{EntityId, Snapshot};
use crate::sync::{merge_collection, ChangeSet, ChangeSummary, SyncChanges, SyncEntity};

/// Where the local copy of the tracker data lives
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Current local snapshot; an unused store yields an empty one.
    async fn load_snapshot(&self) -> Result<Snapshot>;

    /// Bring local data in line with `merged`, returning what was touched.
    async fn apply_merged_snapshot(&self, merged: &Snapshot) -> Result<ChangeSummary>;
}

/// Partition `merged` against `current`: records to insert, records whose
/// content differs, and local ids the merge dropped.
#[must_use]
pub fn plan_local_apply(current: &Snapshot, merged: &Snapshot) -> SyncChanges {
    SyncChanges {
        situations: plan_collection(&current.situations, &merged.situations),
        opportunities: plan_collection(&current.opportunities, &merged.opportunities),
        events: plan_collection(&current.events, &merged.events),
    }
}

/// Apply a plan from [`plan_local_apply`] to `current`.
///
/// Existing records keep their position; new ones are appended. Timestamp and
/// stats are taken from `merged`.
#[must_use]
pub fn apply_local_plan(current: &Snapshot, plan: &SyncChanges, merged: &Snapshot) -> Snapshot {
    let mut applied = Snapshot {
        situations: merge_collection(&current.situations, &plan.situations),
        opportunities: merge_collection(&current.opportunities, &plan.opportunities),
        events: merge_collection(&current.events, &plan.events),
        last_updated: merged.last_updated,
        stats: merged.stats,
    };
    if applied.stats.is_some() {
        applied.stats = Some(applied.current_stats());
    }
    applied
}

fn plan_collection<T: SyncEntity + PartialEq>(current: &[T], merged: &[T]) -> ChangeSet<T> {
    let current_by_id: HashMap<&EntityId, &T> =
        current.iter().map(|item| (item.entity_id(), item)).collect();
    let mut plan = ChangeSet::default();

    for item in merged {
        match current_by_id.get(item.entity_id()) {
            None => plan.added.push(item.clone()),
            Some(existing) if *existing != item => plan.modified.push(item.clone()),
            Some(_) => {}
        }
    }

    let merged_ids: HashSet<&EntityId> = merged.iter().map(SyncEntity::entity_id).collect();
    plan.deleted = current
        .iter()
        .map(SyncEntity::entity_id)
        .filter(|id| !merged_ids.contains(id))
        .cloned()
        .collect();
    plan
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{Event, Opportunity, Situation};

    fn snapshot(situations: Vec<Situation>, opportunities: Vec<Opportunity>) -> Snapshot {
        Snapshot {
            situations,
            opportunities,
            ..Snapshot::default()
        }
    }

    #[test]
    fn plan_partitions_by_id_and_content() {
        let shared = Situation::new(1, "Same");
        let current = snapshot(
            vec![shared.clone(), Situation::new(2, "Old")],
            vec![Opportunity::new(7, "Gone")],
        );
        let merged = snapshot(
            vec![shared, Situation::new(2, "New"), Situation::new(3, "Fresh")],
            Vec::new(),
        );

        let plan = plan_local_apply(&current, &merged);
        assert_eq!(plan.situations.added.len(), 1);
        assert_eq!(plan.situations.added[0].title, "Fresh");
        assert_eq!(plan.situations.modified.len(), 1);
        assert_eq!(plan.situations.modified[0].title, "New");
        assert!(plan.situations.deleted.is_empty());
        assert_eq!(plan.opportunities.deleted, vec![EntityId::Int(7)]);
    }

    #[test]
    fn applying_plan_reproduces_merged_content() {
        let current = Snapshot {
            events: vec![Event::new(1, 2), Event::new(2, 3)],
            ..Snapshot::default()
        };
        let merged = Snapshot {
            events: vec![Event::new(2, 4), Event::new(9, 1)],
            last_updated: 77,
            ..Snapshot::default()
        };

        let plan = plan_local_apply(&current, &merged);
        let applied = apply_local_plan(&current, &plan, &merged);
        assert_eq!(applied, merged);
    }

    #[test]
    fn identical_snapshots_need_no_work() {
        let current = snapshot(vec![Situation::new(1, "A")], Vec::new());
        assert!(!plan_local_apply(&current, &current.clone()).has_changes());
    }
}

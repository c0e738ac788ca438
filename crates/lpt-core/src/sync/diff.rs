//! Local-vs-remote differencing.
//!
//! Each collection is partitioned by id into local-only (`added`), present
//! on both sides and judged different (`modified`) and remote-only
//! (`deleted`). Remote-only ids are local deletions to propagate, never
//! records to pull down.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{EntityId, Event, Opportunity, Situation, Snapshot, Timestamp};

/// How tag lists are compared in the modification test
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TagComparison {
    /// Same tags in a different order count as a change
    #[default]
    Positional,
    /// Order and duplicates are ignored
    Set,
}

impl TagComparison {
    #[must_use]
    pub fn differs(self, local: &[String], remote: &[String]) -> bool {
        match self {
            Self::Positional => local != remote,
            Self::Set => {
                let local: HashSet<&str> = local.iter().map(String::as_str).collect();
                let remote: HashSet<&str> = remote.iter().map(String::as_str).collect();
                local != remote
            }
        }
    }
}

impl FromStr for TagComparison {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(Self::Positional),
            "set" => Ok(Self::Set),
            other => Err(format!(
                "unknown tag comparison '{other}' (expected positional or set)"
            )),
        }
    }
}

/// A record that takes part in sync
pub trait SyncEntity: Clone {
    /// Collection name used in logs and reports
    const COLLECTION: &'static str;

    fn entity_id(&self) -> &EntityId;

    /// Timestamp used for last-writer-wins
    fn modified_at(&self) -> Option<&Timestamp>;

    /// Collection-specific content comparison, used when timestamps tie
    fn fields_differ(&self, other: &Self, tags: TagComparison) -> bool;

    fn display_title(&self) -> &str;

    fn display_description(&self) -> Option<&str>;
}

impl SyncEntity for Situation {
    const COLLECTION: &'static str = "situations";

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn modified_at(&self) -> Option<&Timestamp> {
        Self::modified_at(self)
    }

    fn fields_differ(&self, other: &Self, tags: TagComparison) -> bool {
        self.title != other.title
            || self.description != other.description
            || tags.differs(&self.tags, &other.tags)
    }

    fn display_title(&self) -> &str {
        &self.title
    }

    fn display_description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl SyncEntity for Opportunity {
    const COLLECTION: &'static str = "opportunities";

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn modified_at(&self) -> Option<&Timestamp> {
        Self::modified_at(self)
    }

    fn fields_differ(&self, other: &Self, tags: TagComparison) -> bool {
        self.title != other.title
            || self.description != other.description
            || self.current_level != other.current_level
            || self.current_xp != other.current_xp
            || tags.differs(&self.tags, &other.tags)
    }

    fn display_title(&self) -> &str {
        &self.title
    }

    fn display_description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl SyncEntity for Event {
    const COLLECTION: &'static str = "events";

    fn entity_id(&self) -> &EntityId {
        &self.id
    }

    fn modified_at(&self) -> Option<&Timestamp> {
        Self::modified_at(self)
    }

    fn fields_differ(&self, other: &Self, _tags: TagComparison) -> bool {
        self.title != other.title
            || self.event_description != other.event_description
            || self.choice_value != other.choice_value
            || self.xp_change != other.xp_change
            || self.situation_id != other.situation_id
    }

    fn display_title(&self) -> &str {
        &self.title
    }

    fn display_description(&self) -> Option<&str> {
        self.event_description.as_deref()
    }
}

/// Per-collection partition relative to the remote side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet<T> {
    pub added: Vec<T>,
    pub modified: Vec<T>,
    pub deleted: Vec<EntityId>,
}

impl<T> Default for ChangeSet<T> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            modified: Vec::new(),
            deleted: Vec::new(),
        }
    }
}

impl<T> ChangeSet<T> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            added: self.added.len(),
            modified: self.modified.len(),
            deleted: self.deleted.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCounts {
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
}

impl ChangeCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.added + self.modified + self.deleted
    }
}

impl fmt::Display for ChangeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} ~{} -{}", self.added, self.modified, self.deleted)
    }
}

/// Change sets for all three collections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChanges {
    pub situations: ChangeSet<Situation>,
    pub opportunities: ChangeSet<Opportunity>,
    pub events: ChangeSet<Event>,
}

impl SyncChanges {
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !(self.situations.is_empty() && self.opportunities.is_empty() && self.events.is_empty())
    }

    #[must_use]
    pub fn summary(&self) -> ChangeSummary {
        ChangeSummary {
            situations: self.situations.counts(),
            opportunities: self.opportunities.counts(),
            events: self.events.counts(),
        }
    }

    /// Everything in `snapshot` as `added`, as reported for a first upload
    #[must_use]
    pub fn all_added(snapshot: &Snapshot) -> Self {
        Self {
            situations: ChangeSet {
                added: snapshot.situations.clone(),
                ..ChangeSet::default()
            },
            opportunities: ChangeSet {
                added: snapshot.opportunities.clone(),
                ..ChangeSet::default()
            },
            events: ChangeSet {
                added: snapshot.events.clone(),
                ..ChangeSet::default()
            },
        }
    }
}

/// Counts per collection, for status lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub situations: ChangeCounts,
    pub opportunities: ChangeCounts,
    pub events: ChangeCounts,
}

impl ChangeSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.situations.total() + self.opportunities.total() + self.events.total()
    }
}

/// Whether `local` should overwrite `remote`.
///
/// Parsable timestamps on both sides decide first: newer local wins, older
/// local loses even if its fields differ. Equal or missing timestamps fall
/// through to the field comparison.
pub fn is_modified<T: SyncEntity>(local: &T, remote: &T, tags: TagComparison) -> bool {
    let local_ms = local.modified_at().and_then(Timestamp::as_millis);
    let remote_ms = remote.modified_at().and_then(Timestamp::as_millis);

    if let (Some(local_ms), Some(remote_ms)) = (local_ms, remote_ms) {
        if local_ms > remote_ms {
            return true;
        }
        if local_ms < remote_ms {
            return false;
        }
    }

    local.fields_differ(remote, tags)
}

/// Partition one collection. Linear in the size of both sides.
pub fn diff_collection<T: SyncEntity>(
    local: &[T],
    remote: &[T],
    tags: TagComparison,
) -> ChangeSet<T> {
    let remote_by_id: HashMap<&EntityId, &T> =
        remote.iter().map(|item| (item.entity_id(), item)).collect();
    let mut local_ids = HashSet::with_capacity(local.len());
    let mut changes = ChangeSet::default();

    for item in local {
        local_ids.insert(item.entity_id());
        match remote_by_id.get(item.entity_id()) {
            None => changes.added.push(item.clone()),
            Some(remote_item) if is_modified(item, *remote_item, tags) => {
                changes.modified.push(item.clone());
            }
            Some(_) => {}
        }
    }

    changes.deleted = remote
        .iter()
        .map(SyncEntity::entity_id)
        .filter(|id| !local_ids.contains(id))
        .cloned()
        .collect();

    tracing::debug!(
        collection = T::COLLECTION,
        local = local.len(),
        remote = remote.len(),
        added = changes.added.len(),
        modified = changes.modified.len(),
        deleted = changes.deleted.len(),
        "Compared collection"
    );
    changes
}

/// Differencer over all three collections
pub fn diff_snapshots(local: &Snapshot, remote: &Snapshot, tags: TagComparison) -> SyncChanges {
    SyncChanges {
        situations: diff_collection(&local.situations, &remote.situations, tags),
        opportunities: diff_collection(&local.opportunities, &remote.opportunities, tags),
        events: diff_collection(&local.events, &remote.events, tags),
    }
}

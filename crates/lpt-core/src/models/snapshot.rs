//! Snapshot model: all three entity collections at one point in time

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{EntityId, Event, Opportunity, Situation};
use crate::error::{Error, Result};

/// Record counts the local loader attaches to a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStats {
    #[serde(default)]
    pub situations: usize,
    #[serde(default)]
    pub opportunities: usize,
    /// Situation/opportunity links; not part of the synced collections
    #[serde(default)]
    pub links: usize,
    #[serde(default)]
    pub events: usize,
}

/// The full bundle of synced collections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub situations: Vec<Situation>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    #[serde(default)]
    pub events: Vec<Event>,
    /// Unix ms of the last write that produced this snapshot
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<DataStats>,
}

impl Snapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.situations.is_empty() && self.opportunities.is_empty() && self.events.is_empty()
    }

    /// Counts of the current collections, keeping `links` from previous stats
    #[must_use]
    pub fn current_stats(&self) -> DataStats {
        DataStats {
            situations: self.situations.len(),
            opportunities: self.opportunities.len(),
            links: self.stats.map_or(0, |stats| stats.links),
            events: self.events.len(),
        }
    }

    /// Reject snapshots the sync engine cannot reason about.
    ///
    /// Ids must be unique per collection, opportunity progress must be in
    /// range and event choices must be 1-4.
    pub fn validate(&self) -> Result<()> {
        self.check_unique_ids().map_err(Error::InvalidInput)?;

        if let Some(opportunity) = self.opportunities.iter().find(|o| !o.has_valid_progress()) {
            return Err(Error::InvalidInput(format!(
                "opportunity {} has level {} / xp {} outside the allowed range",
                opportunity.id, opportunity.current_level, opportunity.current_xp
            )));
        }

        if let Some(event) = self.events.iter().find(|e| !e.has_valid_choice()) {
            return Err(Error::InvalidInput(format!(
                "event {} has choice_value {} (expected 1-4)",
                event.id, event.choice_value
            )));
        }

        Ok(())
    }

    /// Only the id-uniqueness part of [`Snapshot::validate`], as a message.
    pub fn check_unique_ids(&self) -> std::result::Result<(), String> {
        first_duplicate(self.situations.iter().map(|s| &s.id))
            .map(|id| format!("duplicate situation id {id}"))
            .or_else(|| {
                first_duplicate(self.opportunities.iter().map(|o| &o.id))
                    .map(|id| format!("duplicate opportunity id {id}"))
            })
            .or_else(|| {
                first_duplicate(self.events.iter().map(|e| &e.id))
                    .map(|id| format!("duplicate event id {id}"))
            })
            .map_or(Ok(()), Err)
    }
}

fn first_duplicate<'a, I>(ids: I) -> Option<&'a EntityId>
where
    I: IntoIterator<Item = &'a EntityId>,
{
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}

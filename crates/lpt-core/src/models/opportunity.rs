//! Opportunity model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityId, Timestamp};

/// Highest XP value before an opportunity levels up
pub const MAX_XP: i64 = 99;

/// A skill the user grows by handling situations well
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Level, starting at 1
    #[serde(default = "default_level")]
    pub current_level: i64,
    /// Progress within the current level, `0..=MAX_XP`
    #[serde(default)]
    pub current_xp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_level() -> i64 {
    1
}

impl Opportunity {
    /// Create a level-1 opportunity stamped with the current time
    #[must_use]
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            current_level: default_level(),
            current_xp: 0,
            created_at: Some(now.clone()),
            updated_at: Some(now),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub const fn with_progress(mut self, level: i64, xp: i64) -> Self {
        self.current_level = level;
        self.current_xp = xp;
        self
    }

    /// `updated_at`, falling back to `created_at`
    #[must_use]
    pub const fn modified_at(&self) -> Option<&Timestamp> {
        match &self.updated_at {
            Some(updated) => Some(updated),
            None => self.created_at.as_ref(),
        }
    }

    /// Whether level and XP are inside their allowed ranges
    #[must_use]
    pub const fn has_valid_progress(&self) -> bool {
        self.current_level >= 1 && self.current_xp >= 0 && self.current_xp <= MAX_XP
    }
}

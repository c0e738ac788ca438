//! Situation model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityId, Timestamp};

/// A recurring life situation the user wants to handle better
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Situation {
    /// Unique identifier within the snapshot
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tag list; order is preserved as stored
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// Fields the sync engine does not interpret (thought lists, difficulty)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Situation {
    /// Create a situation stamped with the current time
    #[must_use]
    pub fn new(id: impl Into<EntityId>, title: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
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
}

//! Event model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityId, Timestamp};

/// A logged reaction to a situation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EntityId,
    #[serde(default)]
    pub title: String,
    /// Situation the event happened in. Lookup only; deleting the situation
    /// leaves the event untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub situation_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_description: Option<String>,
    /// 1 = misguided, 2 = avoided, 3 = attempted, 4 = excellent
    pub choice_value: i64,
    #[serde(default)]
    pub xp_change: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    /// When the event happened, as recorded by the local store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    #[must_use]
    pub fn new(id: impl Into<EntityId>, choice_value: i64) -> Self {
        Self {
            id: id.into(),
            title: choice_label(choice_value).to_string(),
            situation_id: None,
            event_description: None,
            choice_value,
            xp_change: 0,
            created_at: None,
            updated_at: None,
            timestamp: Some(Timestamp::now()),
            extra: Map::new(),
        }
    }

    #[must_use]
    pub fn in_situation(mut self, situation_id: impl Into<EntityId>) -> Self {
        self.situation_id = Some(situation_id.into());
        self
    }

    /// `updated_at`, then `created_at`. `timestamp` records when the event
    /// happened, not when the record was edited, so it never decides a conflict.
    #[must_use]
    pub fn modified_at(&self) -> Option<&Timestamp> {
        self.updated_at.as_ref().or(self.created_at.as_ref())
    }

    #[must_use]
    pub const fn has_valid_choice(&self) -> bool {
        matches!(self.choice_value, 1..=4)
    }
}

/// Default event title for a choice value
#[must_use]
pub const fn choice_label(choice_value: i64) -> &'static str {
    match choice_value {
        1 => "Misguided Response",
        2 => "Avoided Challenge",
        3 => "Attempted Response",
        4 => "Excellent Response",
        _ => "Life Event",
    }
}

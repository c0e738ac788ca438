//! Entity identifier model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a synced record.
///
/// The local store hands out auto-increment integers, but baskets written by
/// other clients may carry string ids, so both shapes are accepted. `5` and
/// `"5"` are distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_accepts_both_json_shapes() {
        let int: EntityId = serde_json::from_str("7").unwrap();
        let text: EntityId = serde_json::from_str("\"sit-7\"").unwrap();
        assert_eq!(int, EntityId::Int(7));
        assert_eq!(text, EntityId::from("sit-7"));
    }

    #[test]
    fn test_entity_id_integer_and_string_differ() {
        assert_ne!(EntityId::from(5), EntityId::from("5"));
        assert_eq!(EntityId::from(5).to_string(), "5");
    }
}

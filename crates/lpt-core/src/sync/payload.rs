//! Versioned basket document.
//!
//! The remote basket is a JSON object tagged by `version`. Only `"1.0"` is
//! known; documents without a version predate tagging and are read as
//! `"1.0"`. Anything else is refused rather than guessed at.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Snapshot;

pub const CURRENT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "version")]
pub enum BasketPayload {
    #[serde(rename = "1.0")]
    V1(BasketV1),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketV1 {
    /// User that last wrote the basket
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub snapshot: Snapshot,
}

impl BasketPayload {
    #[must_use]
    pub fn new(snapshot: Snapshot, user_id: Option<String>) -> Self {
        Self::V1(BasketV1 { user_id, snapshot })
    }

    /// Decode a fetched basket, migrating untagged documents.
    pub fn decode(value: Value) -> Result<Self> {
        let Value::Object(mut document) = value else {
            return Err(Error::MalformedRemoteData(
                "basket is not a JSON object".to_string(),
            ));
        };

        match document.get("version") {
            None | Some(Value::Null) => {
                tracing::debug!("Basket has no version tag, reading as {CURRENT_VERSION}");
                document.insert("version".to_string(), Value::from(CURRENT_VERSION));
            }
            Some(Value::String(version)) if version == CURRENT_VERSION => {}
            Some(other) => {
                return Err(Error::MalformedRemoteData(format!(
                    "unsupported basket version {other}"
                )));
            }
        }

        serde_json::from_value(Value::Object(document))
            .map_err(|error| Error::MalformedRemoteData(error.to_string()))
    }

    pub fn encode(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    #[must_use]
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            Self::V1(basket) => basket.snapshot,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::models::{EntityId, Situation};

    #[test]
    fn encode_tags_version_and_flattens_snapshot() {
        let snapshot = Snapshot {
            situations: vec![Situation::new(1, "A")],
            last_updated: 42,
            ..Snapshot::default()
        };
        let encoded = BasketPayload::new(snapshot, Some("user-1".to_string()))
            .encode()
            .unwrap();

        assert_eq!(encoded["version"], "1.0");
        assert_eq!(encoded["userId"], "user-1");
        assert_eq!(encoded["lastUpdated"], 42);
        assert_eq!(encoded["situations"][0]["title"], "A");
    }

    #[test]
    fn decode_round_trips() {
        let payload = BasketPayload::new(
            Snapshot {
                situations: vec![Situation::new("s-1", "A")],
                ..Snapshot::default()
            },
            None,
        );
        let decoded = BasketPayload::decode(payload.encode().unwrap()).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn untagged_document_is_read_as_current_version() {
        let decoded = BasketPayload::decode(json!({
            "situations": [{"id": 3, "title": "Legacy"}],
            "lastUpdated": 5
        }))
        .unwrap();
        let snapshot = decoded.into_snapshot();
        assert_eq!(snapshot.situations[0].id, EntityId::Int(3));
        assert_eq!(snapshot.last_updated, 5);
    }

    #[test]
    fn unknown_version_and_non_objects_are_rejected() {
        let error = BasketPayload::decode(json!({"version": "2.0"})).unwrap_err();
        assert!(matches!(error, Error::MalformedRemoteData(_)));

        let error = BasketPayload::decode(json!(["not", "a", "basket"])).unwrap_err();
        assert!(matches!(error, Error::MalformedRemoteData(_)));
    }

    #[test]
    fn wrongly_typed_collection_is_malformed() {
        let error = BasketPayload::decode(json!({"version": "1.0", "events": "none"})).unwrap_err();
        assert!(matches!(error, Error::MalformedRemoteData(_)));
    }
}

//! Sync entry point.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use super::diff::{diff_snapshots, SyncChanges, TagComparison};
use super::merge::merge_snapshots;
use super::payload::BasketPayload;
use super::rate_limit::{RateLimitStatus, RateLimiter};
use super::remote::{PantryClient, RemoteBody, RemoteStore};
use crate::auth::{Account, CredentialProvider};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::models::Snapshot;
use crate::store::LocalStore;
use crate::util::{now_millis, truncate_chars};

const MESSAGE_UPLOADED: &str = "Local data uploaded to cloud (first time)";
const MESSAGE_MERGED: &str = "Data synchronized with merge";
const MESSAGE_SYNCED: &str = "Data is already in sync";

/// Whether overlapping `sync` calls may interleave their requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncIsolation {
    /// Only individual requests are serialized; a second sync may read the
    /// basket before the first one writes it.
    #[default]
    PerRequest,
    /// One sync at a time from fetch through write.
    Exclusive,
}

impl FromStr for SyncIsolation {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per-request" | "per_request" => Ok(Self::PerRequest),
            "exclusive" => Ok(Self::Exclusive),
            other => Err(format!(
                "unknown sync isolation '{other}' (expected per-request or exclusive)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    /// No remote basket existed; local data became the basket
    Uploaded,
    /// Local changes were folded onto the remote basket and written back
    Merged,
    /// Nothing to do
    Synced,
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Uploaded => "uploaded",
            Self::Merged => "merged",
            Self::Synced => "synced",
        };
        f.write_str(label)
    }
}

/// Outcome of one sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub action: SyncAction,
    pub message: String,
    pub changes: SyncChanges,
    /// Snapshot the caller should apply locally; only set for `merged`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged_data: Option<Snapshot>,
}

impl SyncResult {
    fn uploaded(local: &Snapshot) -> Self {
        Self {
            action: SyncAction::Uploaded,
            message: MESSAGE_UPLOADED.to_string(),
            changes: SyncChanges::all_added(local),
            merged_data: None,
        }
    }

    fn merged(changes: SyncChanges, merged: Snapshot) -> Self {
        Self {
            action: SyncAction::Merged,
            message: MESSAGE_MERGED.to_string(),
            changes,
            merged_data: Some(merged),
        }
    }

    fn synced() -> Self {
        Self {
            action: SyncAction::Synced,
            message: MESSAGE_SYNCED.to_string(),
            changes: SyncChanges::default(),
            merged_data: None,
        }
    }
}

/// Runs syncs for the bound account against one basket.
///
/// All remote traffic goes through the orchestrator's [`RateLimiter`], so a
/// sync that has to write costs two rate-limited requests.
pub struct SyncOrchestrator {
    remote: Arc<dyn RemoteStore>,
    limiter: RateLimiter,
    credentials: Arc<dyn CredentialProvider>,
    basket_name: String,
    tag_comparison: TagComparison,
    isolation: SyncIsolation,
    sync_gate: Mutex<()>,
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("basket_name", &self.basket_name)
            .field("tag_comparison", &self.tag_comparison)
            .field("isolation", &self.isolation)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        limiter: RateLimiter,
        credentials: Arc<dyn CredentialProvider>,
        basket_name: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            limiter,
            credentials,
            basket_name: basket_name.into(),
            tag_comparison: TagComparison::default(),
            isolation: SyncIsolation::default(),
            sync_gate: Mutex::new(()),
        }
    }

    /// Pantry-backed orchestrator with a fresh limiter.
    pub fn from_config(
        config: &SyncConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let client = PantryClient::new(&config.base_url, config.request_timeout)?;
        let limiter = RateLimiter::new(config.rate_limit_interval, config.request_timeout);
        Ok(Self::new(Arc::new(client), limiter, credentials, config.basket_name.clone())
            .with_tag_comparison(config.tag_comparison)
            .with_isolation(config.isolation))
    }

    #[must_use]
    pub fn with_tag_comparison(mut self, tag_comparison: TagComparison) -> Self {
        self.tag_comparison = tag_comparison;
        self
    }

    #[must_use]
    pub fn with_isolation(mut self, isolation: SyncIsolation) -> Self {
        self.isolation = isolation;
        self
    }

    #[must_use]
    pub const fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    #[must_use]
    pub fn basket_name(&self) -> &str {
        &self.basket_name
    }

    #[must_use]
    pub fn rate_limit_status(&self) -> RateLimitStatus {
        self.limiter.status()
    }

    /// Reconcile `local` with the remote basket.
    ///
    /// Remote records missing locally are treated as local deletions. The
    /// returned `merged_data` is not applied locally; see
    /// [`Self::sync_store`] for that.
    pub async fn sync(&self, local: &Snapshot) -> Result<SyncResult> {
        let account = self.require_account()?;
        local.validate()?;

        let _gate = match self.isolation {
            SyncIsolation::Exclusive => Some(self.sync_gate.lock().await),
            SyncIsolation::PerRequest => None,
        };

        tracing::info!(basket = %self.basket_name, "Starting sync");
        let Some(remote) = self.fetch_snapshot(&account).await? else {
            let mut upload = local.clone();
            upload.last_updated = now_millis();
            self.write_snapshot(&account, upload).await?;
            tracing::info!("No remote data yet, uploaded local snapshot");
            return Ok(SyncResult::uploaded(local));
        };

        remote
            .check_unique_ids()
            .map_err(Error::MalformedRemoteData)?;

        let changes = diff_snapshots(local, &remote, self.tag_comparison);
        if !changes.has_changes() {
            tracing::info!("Remote already matches local data");
            return Ok(SyncResult::synced());
        }

        let summary = changes.summary();
        let merged = merge_snapshots(&remote, &changes);
        self.write_snapshot(&account, merged.clone()).await?;
        tracing::info!(
            situations = %summary.situations,
            opportunities = %summary.opportunities,
            events = %summary.events,
            "Merged local changes into remote"
        );
        Ok(SyncResult::merged(changes, merged))
    }

    /// Load from `store`, sync, and apply the merge back to `store`.
    pub async fn sync_store(&self, store: &dyn LocalStore) -> Result<SyncResult> {
        let local = store.load_snapshot().await?;
        let result = self.sync(&local).await?;
        if let Some(merged) = &result.merged_data {
            store.apply_merged_snapshot(merged).await?;
        }
        Ok(result)
    }

    /// Remote snapshot, or `None` when the basket does not exist.
    pub async fn pull(&self) -> Result<Option<Snapshot>> {
        let account = self.require_account()?;
        self.fetch_snapshot(&account).await
    }

    /// Overwrite the remote basket with `snapshot`.
    pub async fn push(&self, snapshot: &Snapshot) -> Result<()> {
        let account = self.require_account()?;
        snapshot.validate()?;
        let mut upload = snapshot.clone();
        upload.last_updated = now_millis();
        self.write_snapshot(&account, upload).await
    }

    /// Delete the remote basket. Deleting a missing basket is not an error.
    pub async fn delete_remote(&self) -> Result<()> {
        let account = self.require_account()?;
        let remote = Arc::clone(&self.remote);
        let account_id = account.account_id;
        let basket = self.basket_name.clone();
        let deleted = self
            .limiter
            .enqueue(move || async move { remote.delete_basket(&account_id, &basket).await })
            .await;
        match deleted {
            Err(error) if error.is_not_found() => Ok(()),
            other => other,
        }
    }

    fn require_account(&self) -> Result<Account> {
        self.credentials.current_account().ok_or_else(|| {
            Error::AuthenticationRequired("log in with a Pantry id before syncing".to_string())
        })
    }

    async fn fetch_snapshot(&self, account: &Account) -> Result<Option<Snapshot>> {
        let remote = Arc::clone(&self.remote);
        let account_id = account.account_id.clone();
        let basket = self.basket_name.clone();
        let fetched = self
            .limiter
            .enqueue(move || async move { remote.fetch_basket(&account_id, &basket).await })
            .await;

        match fetched {
            Ok(RemoteBody::Json(value)) => BasketPayload::decode(value)
                .map(BasketPayload::into_snapshot)
                .map(Some),
            Ok(RemoteBody::Text(text)) => Err(Error::MalformedRemoteData(format!(
                "expected a JSON basket, got: {}",
                truncate_chars(&text, 80)
            ))),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn write_snapshot(&self, account: &Account, snapshot: Snapshot) -> Result<()> {
        let data: Value = BasketPayload::new(snapshot, Some(account.user_id.clone())).encode()?;
        let remote = Arc::clone(&self.remote);
        let account_id = account.account_id.clone();
        let basket = self.basket_name.clone();
        self.limiter
            .enqueue(move || async move { remote.put_basket(&account_id, &basket, &data).await })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::auth::StaticCredentials;
    use crate::models::{EntityId, Event, Opportunity, Situation, Timestamp};
    use crate::store::MemoryLocalStore;
    use crate::sync::remote::{MemoryRemoteStore, RemoteOperation};

    const ACCOUNT: &str = "pantry-1";
    const BASKET: &str = "LCG";

    fn account() -> Account {
        Account::from_login("someone@example.com", ACCOUNT).unwrap()
    }

    fn orchestrator(remote: &Arc<MemoryRemoteStore>) -> SyncOrchestrator {
        SyncOrchestrator::new(
            Arc::clone(remote) as Arc<dyn RemoteStore>,
            RateLimiter::new(Duration::from_secs(60), None),
            Arc::new(StaticCredentials::new(account())),
            BASKET,
        )
    }

    fn stored_snapshot(remote: &MemoryRemoteStore) -> Snapshot {
        match remote.basket(ACCOUNT, BASKET) {
            Some(RemoteBody::Json(value)) => BasketPayload::decode(value).unwrap().into_snapshot(),
            other => panic!("expected JSON basket, got {other:?}"),
        }
    }

    fn seed(remote: &MemoryRemoteStore, snapshot: Snapshot) {
        let value = BasketPayload::new(snapshot, None).encode().unwrap();
        remote.insert_basket(ACCOUNT, BASKET, RemoteBody::Json(value));
    }

    fn stamped_situation(id: i64, title: &str, updated_at: i64) -> Situation {
        let mut situation = Situation::new(id, title);
        situation.updated_at = Some(Timestamp::Millis(updated_at));
        situation
    }

    #[tokio::test(start_paused = true)]
    async fn first_sync_uploads_local_snapshot() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let local = Snapshot {
            situations: vec![Situation::new(1, "Commute")],
            ..Snapshot::default()
        };

        let result = orchestrator(&remote).sync(&local).await.unwrap();
        assert_eq!(result.action, SyncAction::Uploaded);
        assert_eq!(result.message, "Local data uploaded to cloud (first time)");
        assert_eq!(result.changes.situations.added.len(), 1);
        assert!(result.merged_data.is_none());

        let stored = stored_snapshot(&remote);
        assert_eq!(stored.situations, local.situations);
        assert!(stored.last_updated > 0);
        match remote.basket(ACCOUNT, BASKET) {
            Some(RemoteBody::Json(value)) => {
                assert_eq!(value["userId"], json!(account().user_id));
                assert_eq!(value["version"], "1.0");
            }
            other => panic!("unexpected basket {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_data_does_not_write() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let local = Snapshot {
            opportunities: vec![Opportunity::new(2, "Public speaking")],
            ..Snapshot::default()
        };
        seed(&remote, local.clone());

        let result = orchestrator(&remote).sync(&local).await.unwrap();
        assert_eq!(result.action, SyncAction::Synced);
        assert_eq!(result.message, "Data is already in sync");
        assert!(!result.changes.has_changes());
        assert_eq!(remote.put_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_sync_is_idempotent() {
        let remote = Arc::new(MemoryRemoteStore::new());
        seed(&remote, Snapshot::default());
        let sync = orchestrator(&remote);
        let local = Snapshot {
            events: vec![Event::new(3, 4)],
            ..Snapshot::default()
        };

        let first = sync.sync(&local).await.unwrap();
        assert_eq!(first.action, SyncAction::Merged);
        let second = sync.sync(&local).await.unwrap();
        assert_eq!(second.action, SyncAction::Synced);
        assert_eq!(remote.put_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn merge_adds_local_records_and_drops_remote_only_ones() {
        let remote = Arc::new(MemoryRemoteStore::new());
        seed(
            &remote,
            Snapshot {
                situations: vec![Situation::new(1, "Shared")],
                opportunities: vec![Opportunity::new(9, "Stale")],
                ..Snapshot::default()
            },
        );
        let shared = stored_snapshot(&remote).situations[0].clone();
        let local = Snapshot {
            situations: vec![shared, Situation::new(5, "New")],
            ..Snapshot::default()
        };

        let result = orchestrator(&remote).sync(&local).await.unwrap();
        assert_eq!(result.action, SyncAction::Merged);
        assert_eq!(result.message, "Data synchronized with merge");
        assert_eq!(result.changes.situations.added.len(), 1);
        assert_eq!(result.changes.situations.added[0].id, EntityId::Int(5));
        assert_eq!(result.changes.opportunities.deleted, vec![EntityId::Int(9)]);

        let merged = result.merged_data.unwrap();
        assert_eq!(merged.situations.len(), 2);
        assert!(merged.opportunities.is_empty());
        assert_eq!(stored_snapshot(&remote).situations, merged.situations);
    }

    #[tokio::test(start_paused = true)]
    async fn end_to_end_newer_local_edit_wins_and_older_loses() {
        let remote = Arc::new(MemoryRemoteStore::new());
        seed(
            &remote,
            Snapshot {
                situations: vec![
                    stamped_situation(1, "Remote newer", 2_000),
                    stamped_situation(2, "Remote older", 1_000),
                ],
                ..Snapshot::default()
            },
        );
        let local = Snapshot {
            situations: vec![
                stamped_situation(1, "Local older", 1_000),
                stamped_situation(2, "Local newer", 2_000),
            ],
            ..Snapshot::default()
        };

        let result = orchestrator(&remote).sync(&local).await.unwrap();
        let titles: Vec<String> = stored_snapshot(&remote)
            .situations
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["Remote newer", "Local newer"]);
        assert_eq!(result.changes.situations.modified.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_requires_bound_account() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let sync = SyncOrchestrator::new(
            Arc::clone(&remote) as Arc<dyn RemoteStore>,
            RateLimiter::default(),
            Arc::new(StaticCredentials::anonymous()),
            BASKET,
        );

        let error = sync.sync(&Snapshot::default()).await.unwrap_err();
        assert!(matches!(error, Error::AuthenticationRequired(_)));
        assert_eq!(remote.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_write_leaves_remote_untouched() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let original = Snapshot {
            situations: vec![Situation::new(1, "Remote")],
            ..Snapshot::default()
        };
        seed(&remote, original.clone());
        remote.fail_operation(RemoteOperation::Put, 500);

        let local = Snapshot {
            situations: vec![Situation::new(2, "Local")],
            ..Snapshot::default()
        };
        let error = orchestrator(&remote).sync(&local).await.unwrap_err();
        assert_eq!(error.to_string(), "Remote API error: 500 Internal Server Error");
        assert_eq!(stored_snapshot(&remote), original);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_other_than_not_found_aborts() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.fail_operation(RemoteOperation::Fetch, 503);

        let error = orchestrator(&remote).sync(&Snapshot::default()).await.unwrap_err();
        assert!(matches!(error, Error::Transport { status: 503, .. }));
        assert_eq!(remote.put_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn text_body_is_malformed() {
        let remote = Arc::new(MemoryRemoteStore::new());
        remote.insert_basket(ACCOUNT, BASKET, RemoteBody::Text("<html>".to_string()));

        let error = orchestrator(&remote).sync(&Snapshot::default()).await.unwrap_err();
        assert!(matches!(error, Error::MalformedRemoteData(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_remote_ids_are_malformed() {
        let remote = Arc::new(MemoryRemoteStore::new());
        seed(
            &remote,
            Snapshot {
                situations: vec![Situation::new(1, "A"), Situation::new(1, "B")],
                ..Snapshot::default()
            },
        );

        let error = orchestrator(&remote).sync(&Snapshot::default()).await.unwrap_err();
        assert!(matches!(error, Error::MalformedRemoteData(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_local_snapshot_is_rejected_before_any_request() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let local = Snapshot {
            events: vec![Event::new(1, 7)],
            ..Snapshot::default()
        };

        let error = orchestrator(&remote).sync(&local).await.unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert_eq!(remote.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_store_applies_merged_data_locally() {
        let remote = Arc::new(MemoryRemoteStore::new());
        seed(
            &remote,
            Snapshot {
                opportunities: vec![Opportunity::new(9, "Remote only")],
                ..Snapshot::default()
            },
        );
        let store = MemoryLocalStore::new(Snapshot {
            situations: vec![Situation::new(1, "Local")],
            ..Snapshot::default()
        });

        let result = orchestrator(&remote).sync_store(&store).await.unwrap();
        assert_eq!(result.action, SyncAction::Merged);
        assert_eq!(store.snapshot().await, result.merged_data.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn merge_costs_two_rate_limited_requests() {
        let remote = Arc::new(MemoryRemoteStore::new());
        seed(&remote, Snapshot::default());
        let sync = orchestrator(&remote);
        let started = tokio::time::Instant::now();

        let local = Snapshot {
            situations: vec![Situation::new(1, "A")],
            ..Snapshot::default()
        };
        sync.sync(&local).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(!sync.rate_limit_status().can_make_request);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_push_and_delete_remote() {
        let remote = Arc::new(MemoryRemoteStore::new());
        let sync = orchestrator(&remote);
        assert!(sync.pull().await.unwrap().is_none());

        let snapshot = Snapshot {
            situations: vec![Situation::new("s-1", "Pushed")],
            ..Snapshot::default()
        };
        sync.push(&snapshot).await.unwrap();
        let pulled = sync.pull().await.unwrap().unwrap();
        assert_eq!(pulled.situations, snapshot.situations);

        sync.delete_remote().await.unwrap();
        assert!(remote.basket(ACCOUNT, BASKET).is_none());
        sync.delete_remote().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn exclusive_isolation_serializes_overlapping_syncs() {
        let remote = Arc::new(MemoryRemoteStore::new());
        seed(&remote, Snapshot::default());
        let sync = orchestrator(&remote).with_isolation(SyncIsolation::Exclusive);

        let first = Situation::new(1, "First");
        let first_local = Snapshot {
            situations: vec![first.clone()],
            ..Snapshot::default()
        };
        let second_local = Snapshot {
            situations: vec![first, Situation::new(2, "Second")],
            ..Snapshot::default()
        };

        let (first, second) = tokio::join!(sync.sync(&first_local), sync.sync(&second_local));
        assert_eq!(first.unwrap().action, SyncAction::Merged);
        let second = second.unwrap();
        assert_eq!(second.action, SyncAction::Merged);
        assert_eq!(second.changes.situations.added.len(), 1);
        assert_eq!(stored_snapshot(&remote).situations.len(), 2);
    }

    #[test]
    fn sync_result_serializes_camel_case_and_omits_missing_merge() {
        let value = serde_json::to_value(SyncResult::synced()).unwrap();
        assert_eq!(value["action"], "synced");
        assert!(value.get("mergedData").is_none());
        assert_eq!(value["changes"]["situations"]["added"], json!([]));
    }

    #[test]
    fn isolation_parses_names() {
        assert_eq!("exclusive".parse::<SyncIsolation>().unwrap(), SyncIsolation::Exclusive);
        assert_eq!(" Per-Request ".parse::<SyncIsolation>().unwrap(), SyncIsolation::PerRequest);
        assert!("global".parse::<SyncIsolation>().is_err());
    }
}

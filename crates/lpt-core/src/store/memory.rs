use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{apply_local_plan, plan_local_apply, LocalStore};
use crate::error::Result;
use crate::models::Snapshot;
use crate::sync::ChangeSummary;

/// Local store held in memory, used by tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    snapshot: Mutex<Snapshot>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.lock().await.clone()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        Ok(self.snapshot().await)
    }

    async fn apply_merged_snapshot(&self, merged: &Snapshot) -> Result<ChangeSummary> {
        let mut current = self.snapshot.lock().await;
        let plan = plan_local_apply(&current, merged);
        *current = apply_local_plan(&current, &plan, merged);
        Ok(plan.summary())
    }
}

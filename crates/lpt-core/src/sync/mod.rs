//! Cloud sync engine.
//!
//! A sync reads the remote basket through the [`RateLimiter`], diffs it
//! against the local snapshot, folds local changes onto the remote copy and
//! writes the result back. Only [`SyncOrchestrator`] is meant to be driven by
//! front ends; the other pieces are public for reuse and testing.

mod diff;
mod merge;
mod orchestrator;
mod payload;
mod rate_limit;
mod remote;
mod report;

pub use diff::{
    diff_collection, diff_snapshots, is_modified, ChangeCounts, ChangeSet, ChangeSummary,
    SyncChanges, SyncEntity, TagComparison,
};
pub use merge::{merge_collection, merge_snapshots};
pub use orchestrator::{SyncAction, SyncIsolation, SyncOrchestrator, SyncResult};
pub use payload::{BasketPayload, BasketV1, CURRENT_VERSION};
pub use rate_limit::{RateLimitStatus, RateLimiter, RATE_LIMIT_INTERVAL};
pub use remote::{MemoryRemoteStore, PantryClient, RemoteBody, RemoteOperation, RemoteStore};
pub use report::{format_time_remaining, render_change_lines};

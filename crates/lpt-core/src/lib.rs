//! lpt-core - Core library for Life Progress Tracker
//!
//! This crate contains the entity models, the cloud sync engine (rate limiter,
//! remote basket client, differencer, merger and orchestrator) and the local
//! store contract used by every Life Progress Tracker front end.

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{EntityId, Event, Opportunity, Situation, Snapshot, Timestamp};
pub use sync::{SyncAction, SyncOrchestrator, SyncResult};

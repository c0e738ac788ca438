//! Data models for Life Progress Tracker

mod event;
mod id;
mod opportunity;
mod situation;
mod snapshot;
mod timestamp;

pub use event::Event;
pub use id::EntityId;
pub use opportunity::Opportunity;
pub use situation::Situation;
pub use snapshot::{DataStats, Snapshot};
pub use timestamp::Timestamp;

//! skillscope-core: Evidence store and skill analytics.
//!
//! This crate owns the per-student evidence windows and the pure analytics
//! built on top of them: mastery estimation, priority ranking, growth
//! velocity, and a read-only store audit.

pub mod audit;
pub mod clock;
pub mod error;
pub mod growth;
pub mod ladder;
pub mod mastery;
pub mod model;
pub mod priority;
pub mod storage;
pub mod store;

pub use error::StoreError;
pub use ladder::IntensityLadder;
pub use model::{EvidenceEvent, EvidenceEventInput, Tier};
pub use store::EvidenceStore;

//! skillscope-config: Configuration and intensity-ladder intake.
//!
//! Loads `skillscope.toml` and fetches the intensity ladder document from
//! HTTP or a local file into a [`SharedLadder`] that analytics read from.

pub mod config;
pub mod error;
pub mod loader;
pub mod source;

pub use config::{load_config, load_config_from, LadderConfig, SkillscopeConfig};
pub use error::LadderError;
pub use loader::{load_into, spawn_ladder_refresh, SharedLadder};
pub use source::{FileLadderSource, HttpLadderSource, LadderSource};

//! Subcommand implementations and the helpers they share.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use skillscope_config::{load_config_from, spawn_ladder_refresh, SharedLadder, SkillscopeConfig};
use skillscope_core::clock::SystemClock;
use skillscope_core::storage::FileStorage;
use skillscope_core::{EvidenceStore, IntensityLadder};

pub mod audit;
pub mod growth;
pub mod init;
pub mod priority;
pub mod record;
pub mod snapshot;
pub mod track;

pub(crate) fn load(config_path: Option<PathBuf>) -> Result<SkillscopeConfig> {
    load_config_from(config_path.as_deref())
}

/// Open the file-backed store under the configured data directory.
pub(crate) fn open_store(config: &SkillscopeConfig) -> Result<EvidenceStore> {
    let storage = FileStorage::new(&config.data_dir)
        .with_context(|| format!("failed to open data dir: {}", config.data_dir.display()))?;
    Ok(EvidenceStore::open(Arc::new(storage), Arc::new(SystemClock)))
}

/// The built-in ladder, refreshed once from the configured source. A failed
/// refresh leaves the defaults in place.
pub(crate) async fn resolve_ladder(config: &SkillscopeConfig) -> Result<IntensityLadder> {
    let shared = SharedLadder::default();
    if let Some(source) = config.ladder_source()? {
        if let Err(e) = spawn_ladder_refresh(shared.clone(), source).await {
            tracing::warn!(error = %e, "ladder refresh task did not complete");
        }
    }
    Ok(shared.current())
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn read_arg_or_file(arg: &str) -> Result<String> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("failed to read {path}")),
        None => Ok(arg.to_string()),
    }
}

pub(crate) fn format_ts(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

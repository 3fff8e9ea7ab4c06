//! Application configuration.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use skillscope_core::audit::SkillCatalog;
use skillscope_core::mastery::{MasteryParams, DEFAULT_ALPHA};

use crate::source::{FileLadderSource, HttpLadderSource, LadderSource, DEFAULT_TIMEOUT_SECS};

pub const CONFIG_FILE_NAME: &str = "skillscope.toml";

/// Where the intensity ladder document is fetched from. `url` wins when both
/// are set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Top-level skillscope configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillscopeConfig {
    /// Directory holding the persisted evidence document.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// EWMA smoothing factor for mastery.
    #[serde(default = "default_alpha")]
    pub mastery_alpha: f64,
    /// Inline skill catalog, merged with `catalog_path`.
    #[serde(default)]
    pub known_skills: Vec<String>,
    /// JSON array or one-id-per-line file of known skill ids.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    #[serde(default)]
    pub ladder: LadderConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./skillscope-data")
}
fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

impl Default for SkillscopeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            mastery_alpha: default_alpha(),
            known_skills: Vec::new(),
            catalog_path: None,
            ladder: LadderConfig {
                timeout_secs: default_timeout_secs(),
                ..Default::default()
            },
        }
    }
}

impl SkillscopeConfig {
    pub fn mastery_params(&self) -> MasteryParams {
        MasteryParams::with_alpha(self.mastery_alpha)
    }

    /// The configured ladder source, if any.
    pub fn ladder_source(&self) -> Result<Option<Arc<dyn LadderSource>>> {
        if let Some(url) = self.ladder.url.as_deref().filter(|u| !u.trim().is_empty()) {
            let source = HttpLadderSource::new(url.trim(), self.ladder.timeout_secs)
                .with_context(|| format!("invalid ladder url: {url}"))?;
            return Ok(Some(Arc::new(source)));
        }
        Ok(self
            .ladder
            .path
            .as_ref()
            .map(|p| Arc::new(FileLadderSource::new(p)) as Arc<dyn LadderSource>))
    }

    /// The skill catalog from `known_skills` and `catalog_path`, or `None`
    /// when neither is configured.
    pub fn load_catalog(&self) -> Result<Option<SkillCatalog>> {
        self.load_catalog_with(None)
    }

    /// Like [`load_catalog`](Self::load_catalog), with an extra catalog file
    /// taking the place of `catalog_path`.
    pub fn load_catalog_with(&self, override_path: Option<&Path>) -> Result<Option<SkillCatalog>> {
        let path = override_path.or(self.catalog_path.as_deref());
        if self.known_skills.is_empty() && path.is_none() {
            return Ok(None);
        }

        let from_file = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read skill catalog: {}", p.display()))?;
                SkillCatalog::parse(&raw)
            }
            None => SkillCatalog::default(),
        };

        Ok(Some(
            self.known_skills
                .iter()
                .map(String::as_str)
                .chain(from_file.ids())
                .collect(),
        ))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(p: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&p.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `skillscope.toml` in the current directory
/// 2. `~/.config/skillscope/config.toml`
///
/// Environment variable overrides: `SKILLSCOPE_DATA_DIR`, `SKILLSCOPE_LADDER_URL`.
pub fn load_config() -> Result<SkillscopeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<SkillscopeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<SkillscopeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => SkillscopeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(dir) = std::env::var("SKILLSCOPE_DATA_DIR") {
        if !dir.trim().is_empty() {
            config.data_dir = PathBuf::from(dir);
        }
    }
    if let Ok(url) = std::env::var("SKILLSCOPE_LADDER_URL") {
        if !url.trim().is_empty() {
            config.ladder.url = Some(url);
        }
    }

    config.data_dir = resolve_path(&config.data_dir);
    config.catalog_path = config.catalog_path.as_deref().map(resolve_path);
    config.ladder.url = config.ladder.url.as_deref().map(resolve_env_vars);
    config.ladder.path = config.ladder.path.as_deref().map(resolve_path);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("skillscope"))
}

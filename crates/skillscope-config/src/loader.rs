//! Shared in-memory ladder and its best-effort refresh.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use skillscope_core::ladder::{IntensityLadder, LadderWarning};

use crate::error::LadderError;
use crate::source::LadderSource;

/// The ladder currently in force. Cloning shares the same slot.
///
/// Starts on the built-in defaults and is replaced wholesale when a fetched
/// document has been applied.
#[derive(Debug, Clone, Default)]
pub struct SharedLadder {
    inner: Arc<RwLock<IntensityLadder>>,
}

impl SharedLadder {
    pub fn new(ladder: IntensityLadder) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ladder)),
        }
    }

    /// A copy of the ladder in force.
    pub fn current(&self) -> IntensityLadder {
        self.inner.read().clone()
    }

    pub fn version(&self) -> String {
        self.inner.read().version.clone()
    }

    pub fn replace(&self, ladder: IntensityLadder) {
        *self.inner.write() = ladder;
    }
}

/// Fetch one document from `source` and apply it.
///
/// On success the validated ladder replaces the current one and the field
/// warnings are returned. On failure the current ladder is untouched.
pub async fn load_into(
    shared: &SharedLadder,
    source: &dyn LadderSource,
) -> Result<Vec<LadderWarning>, LadderError> {
    let doc = source.fetch().await?;
    let (ladder, warnings) = IntensityLadder::from_document(&doc);

    for w in &warnings {
        let tier = w.tier.map(|t| t.to_string()).unwrap_or_else(|| "-".into());
        warn!(source = %source.describe(), %tier, "{}", w.message);
    }
    debug!(version = %ladder.version, "ladder applied");
    shared.replace(ladder);

    Ok(warnings)
}

/// Load the ladder in the background. Failures are logged and the ladder
/// in force is kept; there is no retry.
pub fn spawn_ladder_refresh(shared: SharedLadder, source: Arc<dyn LadderSource>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match load_into(&shared, source.as_ref()).await {
            Ok(warnings) => info!(
                source = %source.describe(),
                version = %shared.version(),
                warnings = warnings.len(),
                "intensity ladder loaded"
            ),
            Err(e) => warn!(
                source = %source.describe(),
                error = %e,
                "intensity ladder unavailable, keeping current"
            ),
        }
    })
}

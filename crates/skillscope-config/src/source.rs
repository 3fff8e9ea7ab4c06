//! Where intensity ladder documents come from.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use crate::error::LadderError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// A source of raw `{ version, tiers }` ladder documents.
///
/// Sources only fetch and parse JSON; field validation happens when the
/// document is applied to a ladder.
#[async_trait]
pub trait LadderSource: Send + Sync {
    /// Short description used in log messages.
    fn describe(&self) -> String;

    async fn fetch(&self) -> Result<Value, LadderError>;
}

/// Fetches the ladder document with an HTTP GET.
pub struct HttpLadderSource {
    url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpLadderSource {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, LadderError> {
        let timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LadderError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.to_string(),
            timeout_secs,
            client,
        })
    }
}

#[async_trait]
impl LadderSource for HttpLadderSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Value, LadderError> {
        let response = self
            .client
            .get(&self.url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LadderError::Timeout(self.timeout_secs)
                } else {
                    LadderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.text().await.unwrap_or_default();
            return Err(LadderError::Status { status, message });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                LadderError::Timeout(self.timeout_secs)
            } else {
                LadderError::Network(e.to_string())
            }
        })?;

        serde_json::from_str(&body).map_err(|e| LadderError::Parse(e.to_string()))
    }
}

/// Reads the ladder document from a local JSON file.
pub struct FileLadderSource {
    path: PathBuf,
}

impl FileLadderSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LadderSource for FileLadderSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<Value, LadderError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| LadderError::Io {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&raw).map_err(|e| LadderError::Parse(e.to_string()))
    }
}

//! Per-run session artifact store (§3.1): one small JSON file per scraped
//! URL under `{cache_dir}/sessions/{request_id}/`, read back for summary
//! synthesis and deleted in full once the run reaches a terminal state.
//!
//! Kept deliberately separate from the page cache (see the module doc on
//! [`crate::cache`]): session artifacts are per-run and short-lived, page
//! cache entries are per-URL and long-lived. Unifying them would couple two
//! different eviction lifetimes into one store.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

const MAX_ARTIFACT_READ_BYTES: u64 = 1024 * 1024;

/// One scraped-and-summarized source, persisted for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionArtifact {
    pub url: String,
    pub focus_area: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub reliability: f64,
}

pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(sessions_dir: PathBuf, request_id: &str) -> Self {
        Self {
            dir: sessions_dir.join(request_id),
        }
    }

    /// Best-effort: a failure to persist an artifact degrades synthesis
    /// quality but must never fail the run (§4: "per-source errors never
    /// fail the run").
    pub async fn persist(&self, artifact: &SessionArtifact) {
        if let Err(e) = self.try_persist(artifact).await {
            log::warn!("failed to persist session artifact for {}: {e}", artifact.url);
        }
    }

    async fn try_persist(&self, artifact: &SessionArtifact) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let key = hex::encode(xxhash_rust::xxh3::xxh3_64(artifact.url.as_bytes()).to_be_bytes());
        let path = self.dir.join(format!("{key}.json"));
        let serialized = serde_json::to_vec(artifact).unwrap_or_default();
        tokio::fs::write(path, serialized).await
    }

    /// Read back every artifact written so far, skipping any file over the
    /// 1 MiB re-read cap (§4.8 step 5, §5 resource limits).
    pub async fn read_all(&self) -> Vec<SessionArtifact> {
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return Vec::new();
        };

        let mut artifacts = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if metadata.len() > MAX_ARTIFACT_READ_BYTES {
                log::warn!("skipping oversized session artifact at {}", path.display());
                continue;
            }
            if let Ok(bytes) = tokio::fs::read(&path).await {
                if let Ok(artifact) = serde_json::from_slice::<SessionArtifact>(&bytes) {
                    artifacts.push(artifact);
                }
            }
        }
        artifacts
    }

    /// Remove the run's entire session directory (§3 Lifecycles: "removed
    /// on run termination ... except content promoted to the page cache" —
    /// session artifacts themselves are never promoted, only the scraper's
    /// own page-cache writes are).
    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.dir).await;
    }
}

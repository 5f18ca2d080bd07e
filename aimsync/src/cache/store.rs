//! Persistence of the transform cache document

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument};

use super::key::CacheKey;
use super::types::{Cache, Template};
use crate::{Error, Result};

/// JSON file backing the transform cache.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted cache, or start an empty one if none exists.
    ///
    /// An unreadable document is reported as [`Error::CacheCorrupt`] rather
    /// than replaced, so learned templates are never silently discarded.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Cache> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No persisted cache, starting empty");
                return Ok(Cache::new());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| Error::CacheCorrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    /// Stamp `stats.last_updated` and write the whole cache.
    ///
    /// The document is written to a sibling `.tmp` file and renamed over the
    /// target, so a failed write leaves the previous document intact.
    #[instrument(skip(self, cache), fields(path = %self.path.display(), templates = cache.templates.len()))]
    pub async fn save(&self, cache: &mut Cache) -> Result<()> {
        cache.stats.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(cache)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let written = async {
            fs::write(&tmp_path, json.as_bytes()).await?;
            fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!("Saved transform cache ({} bytes)", json.len());
        Ok(())
    }

    /// Template for `key`, if any. Never touches the counters.
    pub fn lookup<'a>(key: &CacheKey, cache: &'a Cache) -> Option<&'a Template> {
        cache.template(key)
    }
}

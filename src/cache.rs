//! # Stage Caching
//!
//! JSON caches for expensive pipeline stages, keyed by a fingerprint
//! of the stage inputs. A cache entry is only honored when the
//! fingerprint matches and every artifact it points at still exists,
//! so deleting output files naturally forces a re-run.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{AssemblyRecord, ReferenceSummary};

/// Cached results that reference files on disk.
pub trait CachedArtifacts {
    /// Paths that must exist for the cached result to be usable.
    fn artifact_paths(&self) -> Vec<PathBuf>;
}

#[derive(Deserialize)]
struct CacheEntry<T> {
    created_at: DateTime<Utc>,
    fingerprint: String,
    data: T,
}

#[derive(Serialize)]
struct CacheEntryRef<'a, T> {
    created_at: DateTime<Utc>,
    fingerprint: &'a str,
    data: &'a T,
}

/// Digest of a stage's inputs.
///
/// Any change in the parts produces a different fingerprint and thus
/// invalidates the stage's cache entry.
pub fn fingerprint<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut context = md5::Context::new();
    for part in parts {
        context.consume(part.as_ref());
        context.consume(b"\0");
    }
    format!("{:x}", context.compute())
}

/// Per-stage result cache rooted at one directory.
pub struct StageCache {
    cache_dir: PathBuf,
}

impl StageCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    fn entry_path(&self, stage: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", stage))
    }

    /// Loads the cached result of `stage` if it is still valid.
    ///
    /// Missing, unreadable, stale or file-incomplete entries all come
    /// back as `None`; the caller just re-runs the stage.
    pub fn load<T>(&self, stage: &str, fingerprint: &str) -> Option<T>
    where
        T: DeserializeOwned + CachedArtifacts,
    {
        let path = self.entry_path(stage);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(_) => {
                debug!("No cache entry for stage {}", stage);
                return None;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Ignoring unreadable cache entry {}: {}", path.display(), err);
                return None;
            }
        };

        if entry.fingerprint != fingerprint {
            debug!("Cache entry for stage {} is stale", stage);
            return None;
        }

        let artifacts = entry.data.artifact_paths();
        if artifacts.iter().any(|p| !p.exists()) {
            warn!("Cache entry for stage {} points at missing files", stage);
            return None;
        }

        info!(
            "Using cached {} result from {} ({} files)",
            stage,
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            artifacts.len()
        );
        Some(entry.data)
    }

    /// Writes the result of `stage` under the current fingerprint.
    pub fn store<T: Serialize>(&self, stage: &str, fingerprint: &str, data: &T) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;

        let entry = CacheEntryRef {
            created_at: Utc::now(),
            fingerprint,
            data,
        };
        let json = serde_json::to_string_pretty(&entry)?;
        fs::write(self.entry_path(stage), json)?;

        debug!("Stored cache entry for stage {}", stage);
        Ok(())
    }
}

impl CachedArtifacts for BTreeMap<String, ReferenceSummary> {
    fn artifact_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for summary in self.values() {
            paths.push(summary.audio_path.clone());
            paths.extend(summary.transcription_file.clone());
            paths.extend(summary.translation_file.clone());
        }
        paths
    }
}

impl CachedArtifacts for AssemblyRecord {
    fn artifact_paths(&self) -> Vec<PathBuf> {
        vec![self.output_path.clone()]
    }
}

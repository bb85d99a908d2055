// src/fetch/cache.rs

//! On-disk cache of raw response bodies.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::CacheConfig;

/// Response bodies stored one file per request, named by the SHA-256 of
/// the request's cache key.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    max_age: Option<Duration>,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, max_age: Option<Duration>) -> Self {
        Self {
            dir: dir.into(),
            max_age,
        }
    }

    /// Cache described by `config`, or `None` when caching is disabled.
    pub fn from_config(config: &CacheConfig) -> Option<Self> {
        config.enabled.then(|| {
            Self::new(
                config.dir.clone(),
                config.max_age_secs.map(Duration::from_secs),
            )
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.cache", hex::encode(digest)))
    }

    /// Cached body for `key`; expired or unreadable entries are misses.
    pub fn get(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        let metadata = fs::metadata(&path).ok()?;

        if let Some(max_age) = self.max_age {
            let expired = metadata
                .modified()
                .ok()
                .and_then(|modified| modified.elapsed().ok())
                .is_some_and(|age| age > max_age);
            if expired {
                log::debug!("Cache entry for {} expired", key);
                return None;
            }
        }

        fs::read_to_string(&path).ok()
    }

    pub fn put(&self, key: &str, body: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), body)?;
        Ok(())
    }

    /// Remove every cached entry, returning how many were deleted.
    pub fn clear(&self) -> Result<usize> {
        if !self.dir.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "cache") {
                fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path().join("nested"), None);

        assert_eq!(cache.get("permit/2020-26"), None);
        cache.put("permit/2020-26", "<html>event</html>").unwrap();
        assert_eq!(
            cache.get("permit/2020-26").as_deref(),
            Some("<html>event</html>")
        );
        assert_eq!(cache.get("permit/2020-27"), None);
    }

    #[test]
    fn expired_entries_are_misses() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), Some(Duration::from_millis(5)));

        cache.put("results/1", "body").unwrap();
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get("results/1"), None);
    }

    #[test]
    fn clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResponseCache::new(dir.path(), None);
        cache.put("a", "1").unwrap();
        cache.put("b", "2").unwrap();

        assert_eq!(cache.clear().unwrap(), 2);
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn disabled_config_has_no_cache() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        assert!(ResponseCache::from_config(&config).is_none());
    }
}

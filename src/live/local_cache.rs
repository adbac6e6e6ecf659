// Last known good snapshot, kept close to the process.

use std::fs;
use std::path::{Path, PathBuf};

use election_results::Snapshot;
use log::{debug, warn};
use parking_lot::Mutex;
use snafu::prelude::*;

#[derive(Debug, Snafu)]
pub enum CacheError {
    #[snafu(display("Error writing the local cache {path}"))]
    WritingCache {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error serializing the snapshot for the local cache"))]
    EncodingCache { source: serde_json::Error },
}

/// Durable storage for one snapshot.
///
/// Content that cannot be read back as a snapshot is treated as absent.
pub trait LocalCache: Send + Sync {
    fn get(&self) -> Option<Snapshot>;

    fn set(&self, snapshot: &Snapshot) -> Result<(), CacheError>;
}

fn parse_cached(contents: &str, origin: &str) -> Option<Snapshot> {
    match serde_json::from_str(contents) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("local cache: ignoring unreadable content in {}: {}", origin, e);
            None
        }
    }
}

/// A JSON file named after the cache key.
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> FileCache {
        FileCache {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalCache for FileCache {
    fn get(&self) -> Option<Snapshot> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                debug!("local cache: nothing read from {:?}: {}", self.path, e);
                return None;
            }
        };
        parse_cached(&contents, &self.path.display().to_string())
    }

    fn set(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let contents = serde_json::to_string(snapshot).context(EncodingCacheSnafu {})?;
        let path = self.path.display().to_string();
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context(WritingCacheSnafu { path: path.clone() })?;
        }
        // Readers never see a half written file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).context(WritingCacheSnafu { path: path.clone() })?;
        fs::rename(&tmp, &self.path).context(WritingCacheSnafu { path })?;
        Ok(())
    }
}

/// Keeps the serialized snapshot in memory, for the lifetime of the process.
#[derive(Default)]
pub struct MemoryCache {
    slot: Mutex<Option<String>>,
}

impl MemoryCache {
    pub fn new() -> MemoryCache {
        MemoryCache::default()
    }

    /// A cache that already holds the given content, valid or not.
    pub fn with_contents(contents: &str) -> MemoryCache {
        MemoryCache {
            slot: Mutex::new(Some(contents.to_string())),
        }
    }
}

impl LocalCache for MemoryCache {
    fn get(&self) -> Option<Snapshot> {
        let slot = self.slot.lock();
        slot.as_deref()
            .and_then(|contents| parse_cached(contents, "memory"))
    }

    fn set(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let contents = serde_json::to_string(snapshot).context(EncodingCacheSnafu {})?;
        *self.slot.lock() = Some(contents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use election_results::default_snapshot;

    #[test]
    fn file_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), "backup");
        assert_eq!(cache.get(), None);

        let snapshot = default_snapshot();
        cache.set(&snapshot).unwrap();
        assert_eq!(cache.path(), dir.path().join("backup.json"));
        assert_eq!(cache.get(), Some(snapshot));
    }

    #[test]
    fn file_cache_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path().join("nested").join("dir"), "backup");
        cache.set(&default_snapshot()).unwrap();
        assert!(cache.get().is_some());
    }

    #[test]
    fn file_cache_ignores_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileCache::new(dir.path(), "backup");
        fs::write(cache.path(), "{ not json").unwrap();
        assert_eq!(cache.get(), None);

        // A later write replaces the garbage.
        cache.set(&default_snapshot()).unwrap();
        assert_eq!(cache.get(), Some(default_snapshot()));
    }

    #[test]
    fn memory_cache() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get(), None);
        cache.set(&default_snapshot()).unwrap();
        assert_eq!(cache.get(), Some(default_snapshot()));

        let broken = MemoryCache::with_contents("[{\"id\":");
        assert_eq!(broken.get(), None);
    }
}

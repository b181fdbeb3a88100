use std::{collections::HashMap, fs, path::PathBuf};

use eyre::Result;
use tracing::warn;

use crate::{hash::ObjectHash, utils::save_as_msgpack};

/// Persistent memory of the digest last stored for each working-tree path.
///
/// This is what drives delta compression: when a later snapshot stores a
/// different digest for a path, the digest recorded here identifies the
/// object to rewrite as a delta. The cache is disposable; losing it does
/// not corrupt any snapshot, it only disables compression the next time.
///
/// Keys are POSIX-normalized relative paths (`.` for the root tree node,
/// forward slashes below it) as produced by [`crate::utils::posix_join`].
#[derive(Debug)]
pub struct PathCache {
    path: PathBuf,
    entries: HashMap<String, ObjectHash>
}

impl PathCache {
    /// Load the cache from its backing file.
    ///
    /// A missing or unreadable file yields an empty cache rather than an
    /// error, at the cost of one uncompressed snapshot.
    pub fn load(path: impl Into<PathBuf>) -> PathCache {
        let path = path.into();

        let entries = match fs::read(&path) {
            Ok(bytes) => match rmp_serde::from_slice(&bytes) {
                Ok(entries) => entries,

                Err(error) => {
                    warn!(%error, "path cache is unreadable; the next snapshot will not be delta compressed");

                    HashMap::new()
                }
            },

            Err(_) => HashMap::new()
        };

        PathCache { path, entries }
    }

    pub fn save(&self) -> Result<()> {
        save_as_msgpack(&self.entries, &self.path)
    }

    pub fn get(&self, path_key: &str) -> Option<ObjectHash> {
        self.entries.get(path_key).copied()
    }

    pub fn set(&mut self, path_key: &str, hash: ObjectHash) {
        self.entries.insert(path_key.to_string(), hash);
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::hash::digest_bytes;

    use super::PathCache;

    #[test]
    fn entries_survive_a_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let backing = dir.path().join("objhashcache");

        let mut cache = PathCache::load(&backing);

        cache.set("notes.txt", digest_bytes(b"notes"));
        cache.set("sub/inner.txt", digest_bytes(b"inner"));

        cache.save().unwrap();

        let reloaded = PathCache::load(&backing);

        assert_eq!(reloaded.get("notes.txt"), Some(digest_bytes(b"notes")));
        assert_eq!(reloaded.get("sub/inner.txt"), Some(digest_bytes(b"inner")));
        assert_eq!(reloaded.get("absent"), None);
    }

    #[test]
    fn a_corrupt_backing_file_degrades_to_an_empty_cache() {
        let dir = tempfile::tempdir().unwrap();
        let backing = dir.path().join("objhashcache");

        fs::write(&backing, b"\xc1 not messagepack for a map").unwrap();

        let cache = PathCache::load(&backing);

        assert_eq!(cache.get("anything"), None);
    }
}

use std::{collections::HashSet, fs, path::PathBuf};

use eyre::{Context, Result};
use tracing::debug;

use crate::{delta::{self, DeltaRecord}, error::RepoError, hash::{ObjectHash, digest_bytes}, unwrap};

/// Content-addressed object storage under a two-level fan-out directory.
///
/// An object file is *fresh* when its bytes hash to the digest encoded in
/// its path. Anything else is read as a [`DeltaRecord`] pointing at a newer
/// object, and [`ObjectStore::read`] rebuilds the original bytes by walking
/// that chain back to a fresh object. The hash equality test is the only
/// discriminator; an envelope carries no marker that could alias a
/// legitimate payload.
#[derive(Debug)]
pub struct ObjectStore {
    objects_dir: PathBuf
}

impl ObjectStore {
    pub fn new(objects_dir: impl Into<PathBuf>) -> ObjectStore {
        ObjectStore {
            objects_dir: objects_dir.into()
        }
    }

    /// The on-disk location of an object: a directory named by the first
    /// two hex characters, then a file named by the remaining 38.
    pub fn object_path(&self, hash: ObjectHash) -> PathBuf {
        let full = hash.full();

        let (fan_out, rest) = full.split_at(2);

        self.objects_dir
            .join(fan_out)
            .join(rest)
    }

    pub fn exists(&self, hash: ObjectHash) -> bool {
        self.object_path(hash).is_file()
    }

    /// Store `bytes` literally at `hash`, creating the fan-out directory
    /// if needed.
    ///
    /// An existing file that still hashes to `hash` is left untouched: the
    /// same content can be reached from several working-tree paths, and a
    /// rewrite on behalf of one path must not clobber the shared object.
    /// An existing file that no longer hashes to `hash` is a delta record
    /// whose digest has resurfaced (a snapshot taken after loading an old
    /// snapshot); it is overwritten with the literal bytes so the newest
    /// version of the content is fresh again and no delta chain can close
    /// into a cycle.
    pub fn put_fresh(&self, hash: ObjectHash, bytes: &[u8]) -> Result<()> {
        let path = self.object_path(hash);

        if path.is_file() {
            let on_disk = unwrap!(
                fs::read(&path),
                "failed to read object file: {}", path.display()
            );

            if digest_bytes(&on_disk) == hash {
                return Ok(());
            }

            debug!(object = %hash, "restoring a resurfaced object to fresh form");
        }

        let fan_out = unwrap!(path.parent(), "object path has no parent: {}", path.display());

        unwrap!(
            fs::create_dir_all(fan_out),
            "failed to create fan-out directory: {}", fan_out.display()
        );

        unwrap!(
            fs::write(&path, bytes),
            "failed to write object file: {}", path.display()
        );

        Ok(())
    }

    /// Overwrite the object at `hash` with a delta envelope.
    ///
    /// The caller is responsible for making sure the envelope reconstructs
    /// the bytes previously stored at `hash` when resolved against its
    /// origin object.
    pub fn replace_with_delta(&self, hash: ObjectHash, record: &DeltaRecord) -> Result<()> {
        let path = self.object_path(hash);

        debug!(object = %hash, origin = %record.origin, "rewriting object as a delta");

        unwrap!(
            fs::write(&path, record.to_bytes()?),
            "failed to write delta envelope: {}", path.display()
        );

        Ok(())
    }

    /// Read the bytes of an object, rebuilding through any delta chain.
    ///
    /// Resolution is iterative: patches are collected while walking toward
    /// the fresh end of the chain, then applied in reverse. A visited set
    /// bounds the walk so a damaged store fails with
    /// [`RepoError::DeltaChainBroken`] instead of looping.
    pub fn read(&self, hash: ObjectHash) -> Result<Vec<u8>> {
        let mut patches: Vec<Vec<u8>> = vec![];
        let mut visited = HashSet::new();
        let mut current = hash;

        let fresh = loop {
            if !visited.insert(current) {
                return Err(RepoError::DeltaChainBroken(hash).into());
            }

            let path = self.object_path(current);

            if !path.is_file() {
                if current == hash {
                    return Err(RepoError::MissingObject(hash).into());
                }

                return Err(RepoError::DeltaChainBroken(hash).into());
            }

            let bytes = unwrap!(
                fs::read(&path),
                "failed to read object file: {}", path.display()
            );

            if digest_bytes(&bytes) == current {
                break bytes;
            }

            let Some(record) = DeltaRecord::from_bytes(&bytes) else {
                if current == hash {
                    return Err(RepoError::CorruptObject(hash).into());
                }

                return Err(RepoError::DeltaChainBroken(hash).into());
            };

            patches.push(record.patch);

            current = record.origin;
        };

        let mut bytes = fresh;

        while let Some(step) = patches.pop() {
            bytes = delta::patch(&step, &bytes)
                .wrap_err(RepoError::DeltaChainBroken(hash))?;
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{delta::{self, DeltaRecord}, error::RepoError, hash::digest_bytes};

    use super::ObjectStore;

    fn store_in(dir: &tempfile::TempDir) -> ObjectStore {
        ObjectStore::new(dir.path().join("objects"))
    }

    #[test]
    fn fresh_objects_read_back_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let hash = digest_bytes(b"hello");

        store.put_fresh(hash, b"hello").unwrap();

        assert!(store.exists(hash));
        assert_eq!(store.read(hash).unwrap(), b"hello");
    }

    #[test]
    fn put_fresh_leaves_an_existing_fresh_object_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let hash = digest_bytes(b"shared");

        store.put_fresh(hash, b"shared").unwrap();
        store.put_fresh(hash, b"shared").unwrap();

        assert_eq!(fs::read(store.object_path(hash)).unwrap(), b"shared");
    }

    #[test]
    fn missing_objects_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let report = store.read(digest_bytes(b"never written")).unwrap_err();

        assert!(matches!(
            report.downcast_ref::<RepoError>(),
            Some(RepoError::MissingObject(_))
        ));
    }

    #[test]
    fn garbage_that_does_not_hash_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let hash = digest_bytes(b"original");

        store.put_fresh(hash, b"original").unwrap();

        fs::write(store.object_path(hash), b"scribbled over").unwrap();

        let report = store.read(hash).unwrap_err();

        assert!(matches!(
            report.downcast_ref::<RepoError>(),
            Some(RepoError::CorruptObject(_))
        ));
    }

    #[test]
    fn delta_chains_resolve_back_to_the_original_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let v1 = b"version one".to_vec();
        let v2 = b"version two".to_vec();
        let v3 = b"version three".to_vec();

        let h1 = digest_bytes(&v1);
        let h2 = digest_bytes(&v2);
        let h3 = digest_bytes(&v3);

        // Simulate three snapshots of one path: the newest version stays
        // fresh, each older file becomes a patch against its successor.
        store.put_fresh(h1, &v1).unwrap();

        store.put_fresh(h2, &v2).unwrap();
        store.replace_with_delta(h1, &DeltaRecord {
            origin: h2,
            patch: delta::diff(&v2, &v1).unwrap()
        }).unwrap();

        store.put_fresh(h3, &v3).unwrap();
        store.replace_with_delta(h2, &DeltaRecord {
            origin: h3,
            patch: delta::diff(&v3, &v2).unwrap()
        }).unwrap();

        assert_eq!(store.read(h3).unwrap(), v3);
        assert_eq!(store.read(h2).unwrap(), v2);
        assert_eq!(store.read(h1).unwrap(), v1);
    }

    #[test]
    fn a_cycle_is_reported_instead_of_looping() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let a = digest_bytes(b"a");
        let b = digest_bytes(b"b");

        store.put_fresh(a, b"a").unwrap();
        store.put_fresh(b, b"b").unwrap();

        store.replace_with_delta(a, &DeltaRecord { origin: b, patch: vec![] }).unwrap();
        store.replace_with_delta(b, &DeltaRecord { origin: a, patch: vec![] }).unwrap();

        let report = store.read(a).unwrap_err();

        assert!(matches!(
            report.downcast_ref::<RepoError>(),
            Some(RepoError::DeltaChainBroken(_))
        ));
    }

    #[test]
    fn put_fresh_restores_a_resurfaced_delta_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let v1 = b"first".to_vec();
        let v2 = b"second".to_vec();

        let h1 = digest_bytes(&v1);
        let h2 = digest_bytes(&v2);

        store.put_fresh(h1, &v1).unwrap();
        store.put_fresh(h2, &v2).unwrap();
        store.replace_with_delta(h1, &DeltaRecord {
            origin: h2,
            patch: delta::diff(&v2, &v1).unwrap()
        }).unwrap();

        // The old digest comes around again: the file must become fresh.
        store.put_fresh(h1, &v1).unwrap();

        assert_eq!(fs::read(store.object_path(h1)).unwrap(), v1);
        assert_eq!(store.read(h2).unwrap(), v2);
    }
}

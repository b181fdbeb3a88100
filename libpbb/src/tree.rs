use std::{fs, path::Path, str::FromStr};

use eyre::Result;
use tracing::warn;

use crate::{
    cache::PathCache,
    delta::{self, DeltaRecord},
    hash::{ObjectHash, digest_bytes},
    objects::ObjectStore,
    unwrap,
    utils::{list_directories, list_files, posix_join}
};

pub const TREE_KIND: &str = "tree";
pub const BLOB_KIND: &str = "blob";

/// Format one entry of a tree payload.
///
/// Fixed ASCII columns: the kind in 0..4, a space, the 40-char digest in
/// 5..45, a space, then the name to the end of the line.
pub fn format_entry(kind: &str, hash: ObjectHash, name: &str) -> String {
    format!("{kind} {} {name}", hash.full())
}

/// Split a tree line into `(kind, digest, name)` by the fixed columns.
///
/// Returns `None` for anything that does not fit the shape; the caller
/// decides what a malformed line means.
pub fn parse_entry(line: &str) -> Option<(&str, ObjectHash, &str)> {
    let kind = line.get(..5)?.trim_end();

    let hash = ObjectHash::from_str(line.get(5 .. 45)?).ok()?;

    let name = line.get(46 ..)?;

    if name.is_empty() {
        return None;
    }

    Some((kind, hash, name))
}

/// Join tree entries into the node payload: lines joined by `\n` with one
/// trailing `\n`. An empty directory's payload is a single newline.
fn tree_payload(entries: &[String]) -> String {
    let mut payload = entries.join("\n");

    payload.push('\n');

    payload
}

/// Walks a working tree, writing blob and tree objects through the
/// delta-storage policy, and returns the root tree digest.
///
/// Subdirectories are serialized before files at every level, each group
/// sorted by name, so the same working tree always produces the same root
/// digest.
pub struct TreeSerializer<'a> {
    store: &'a ObjectStore,
    cache: &'a mut PathCache,
    repo_dir_name: &'a str
}

impl<'a> TreeSerializer<'a> {
    pub fn new(store: &'a ObjectStore, cache: &'a mut PathCache, repo_dir_name: &'a str) -> TreeSerializer<'a> {
        TreeSerializer {
            store,
            cache,
            repo_dir_name
        }
    }

    /// Snapshot `root_dir`, writing every object, and return the root
    /// tree digest.
    pub fn snapshot_tree(&mut self, root_dir: &Path) -> Result<ObjectHash> {
        self.serialize_dir(root_dir, ".")
    }

    fn serialize_dir(&mut self, dir: &Path, key: &str) -> Result<ObjectHash> {
        let mut entries = vec![];

        for name in list_directories(dir, self.repo_dir_name)? {
            let child_hash = self.serialize_dir(&dir.join(&name), &posix_join(key, &name))?;

            entries.push(format_entry(TREE_KIND, child_hash, &name));
        }

        for name in list_files(dir)? {
            let path = dir.join(&name);

            let bytes = unwrap!(
                fs::read(&path),
                "failed to read file: {}", path.display()
            );

            let blob_hash = digest_bytes(&bytes);

            self.store_node(&posix_join(key, &name), blob_hash, &bytes)?;

            entries.push(format_entry(BLOB_KIND, blob_hash, &name));
        }

        let payload = tree_payload(&entries);

        let tree_hash = digest_bytes(payload.as_bytes());

        self.store_node(key, tree_hash, payload.as_bytes())?;

        Ok(tree_hash)
    }

    /// The delta-storage policy.
    ///
    /// The newest version of a path is always stored fresh. When the path
    /// previously stored a different digest, that older object file is
    /// rewritten as a patch against the new object, so history forms a
    /// chain from old versions forward to the one fresh file.
    fn store_node(&mut self, key: &str, new_hash: ObjectHash, bytes: &[u8]) -> Result<()> {
        let Some(old_hash) = self.cache.get(key) else {
            self.store.put_fresh(new_hash, bytes)?;

            self.cache.set(key, new_hash);

            return Ok(());
        };

        if old_hash == new_hash {
            return Ok(());
        }

        if !self.store.exists(old_hash) {
            warn!(path = key, old = %old_hash, "cached object is missing; storing fresh without a delta");

            self.store.put_fresh(new_hash, bytes)?;

            self.cache.set(key, new_hash);

            return Ok(());
        }

        // Read the old bytes before touching either file; the old digest
        // may itself sit behind a delta chain by now.
        let old_bytes = self.store.read(old_hash)?;

        self.store.put_fresh(new_hash, bytes)?;

        let patch = delta::diff(bytes, &old_bytes)?;

        self.store.replace_with_delta(old_hash, &DeltaRecord {
            origin: new_hash,
            patch
        })?;

        self.cache.set(key, new_hash);

        Ok(())
    }
}

/// Hash the tree that a snapshot of `root_dir` would produce, without
/// writing anything. Used to detect a dirty working tree before checkout.
pub fn tree_hash_only(root_dir: &Path, repo_dir_name: &str) -> Result<ObjectHash> {
    let mut entries = vec![];

    for name in list_directories(root_dir, repo_dir_name)? {
        let child_hash = tree_hash_only(&root_dir.join(&name), repo_dir_name)?;

        entries.push(format_entry(TREE_KIND, child_hash, &name));
    }

    for name in list_files(root_dir)? {
        let path = root_dir.join(&name);

        let bytes = unwrap!(
            fs::read(&path),
            "failed to read file: {}", path.display()
        );

        entries.push(format_entry(BLOB_KIND, digest_bytes(&bytes), &name));
    }

    Ok(digest_bytes(tree_payload(&entries).as_bytes()))
}

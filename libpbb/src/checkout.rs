use std::{fs, path::Path};

use eyre::Result;

use crate::{
    error::RepoError,
    hash::ObjectHash,
    objects::ObjectStore,
    tree::{BLOB_KIND, TREE_KIND, parse_entry},
    unwrap,
    utils::{list_directories, list_files}
};

/// Rebuilds a working tree from a root tree digest.
pub struct CheckoutEngine<'a> {
    store: &'a ObjectStore,
    repo_dir_name: &'a str
}

impl<'a> CheckoutEngine<'a> {
    pub fn new(store: &'a ObjectStore, repo_dir_name: &'a str) -> CheckoutEngine<'a> {
        CheckoutEngine {
            store,
            repo_dir_name
        }
    }

    /// Clear `root_dir` of everything except the repository directory,
    /// then materialize the tree under `tree_hash` into it.
    ///
    /// There is no transactional guarantee: a failure part-way through
    /// leaves the directory partially rebuilt, and the caller retries.
    pub fn rebuild(&self, root_dir: &Path, tree_hash: ObjectHash) -> Result<()> {
        for name in list_files(root_dir)? {
            let path = root_dir.join(name);

            unwrap!(
                fs::remove_file(&path),
                "failed to remove file: {}", path.display()
            );
        }

        for name in list_directories(root_dir, self.repo_dir_name)? {
            let path = root_dir.join(name);

            unwrap!(
                fs::remove_dir_all(&path),
                "failed to remove directory: {}", path.display()
            );
        }

        self.build_tree(root_dir, tree_hash)
    }

    fn build_tree(&self, dir: &Path, tree_hash: ObjectHash) -> Result<()> {
        let bytes = self.store.read(tree_hash)?;

        let Ok(payload) = String::from_utf8(bytes) else {
            return Err(RepoError::CorruptTree(tree_hash).into());
        };

        for line in payload.lines().filter(|line| !line.is_empty()) {
            let Some((kind, hash, name)) = parse_entry(line) else {
                return Err(RepoError::CorruptTree(tree_hash).into());
            };

            let path = dir.join(name);

            match kind {
                TREE_KIND => {
                    unwrap!(
                        fs::create_dir(&path),
                        "failed to create directory: {}", path.display()
                    );

                    self.build_tree(&path, hash)?;
                }

                BLOB_KIND => {
                    let content = self.store.read(hash)?;

                    unwrap!(
                        fs::write(&path, content),
                        "failed to write file: {}", path.display()
                    );
                }

                _ => return Err(RepoError::CorruptTree(tree_hash).into())
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::{
        cache::PathCache,
        error::RepoError,
        hash::digest_bytes,
        objects::ObjectStore,
        tree::{TreeSerializer, tree_hash_only}
    };

    use super::CheckoutEngine;

    #[test]
    fn rebuild_restores_a_serialized_tree_exactly() {
        let dir = tempfile::tempdir().unwrap();

        let worktree = dir.path().join("work");
        fs::create_dir(&worktree).unwrap();

        fs::write(worktree.join("a.txt"), "hello").unwrap();
        fs::create_dir(worktree.join("sub")).unwrap();
        fs::write(worktree.join("sub").join("inner.txt"), "inner").unwrap();

        let store = ObjectStore::new(dir.path().join("objects"));
        let mut cache = PathCache::load(dir.path().join("objhashcache"));

        let root = TreeSerializer::new(&store, &mut cache, ".pbb")
            .snapshot_tree(&worktree)
            .unwrap();

        // Scribble over the working tree, then rebuild it.
        fs::write(worktree.join("a.txt"), "changed").unwrap();
        fs::write(worktree.join("stray.txt"), "stray").unwrap();

        CheckoutEngine::new(&store, ".pbb")
            .rebuild(&worktree, root)
            .unwrap();

        assert_eq!(fs::read(worktree.join("a.txt")).unwrap(), b"hello");
        assert_eq!(fs::read(worktree.join("sub").join("inner.txt")).unwrap(), b"inner");
        assert!(!worktree.join("stray.txt").exists());

        assert_eq!(tree_hash_only(&worktree, ".pbb").unwrap(), root);
    }

    #[test]
    fn a_non_tree_object_is_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();

        let worktree = dir.path().join("work");
        fs::create_dir(&worktree).unwrap();

        let store = ObjectStore::new(dir.path().join("objects"));

        // A fresh object whose payload is not tree-shaped.
        let bogus = digest_bytes(b"not a tree at all");
        store.put_fresh(bogus, b"not a tree at all").unwrap();

        let report = CheckoutEngine::new(&store, ".pbb")
            .rebuild(&worktree, bogus)
            .unwrap_err();

        assert!(matches!(
            report.downcast_ref::<RepoError>(),
            Some(RepoError::CorruptTree(_))
        ));
    }
}

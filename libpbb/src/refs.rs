use std::{fs, path::PathBuf, str::FromStr};

use eyre::{Result, bail};

use crate::{hash::ObjectHash, unwrap, utils::list_files};

/// What HEAD points at: the name of a branch (attached), or a bare
/// snapshot digest (detached).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Head {
    Branch(String),
    Detached(ObjectHash)
}

/// The HEAD pointer plus the branch ref files under `refs/heads`.
///
/// Each branch is one file named after the branch, containing the 40-char
/// hex digest of its tip snapshot.
#[derive(Debug)]
pub struct RefStore {
    head_path: PathBuf,
    heads_dir: PathBuf
}

impl RefStore {
    pub fn new(head_path: impl Into<PathBuf>, heads_dir: impl Into<PathBuf>) -> RefStore {
        RefStore {
            head_path: head_path.into(),
            heads_dir: heads_dir.into()
        }
    }

    /// Read HEAD, inferring its kind.
    ///
    /// A value naming an existing branch ref is attached. Failing that, a
    /// well-formed 40-char hex digest is detached; anything else is an
    /// attached branch that simply has no snapshots yet (a fresh
    /// repository's `master`).
    pub fn read_head(&self) -> Result<Head> {
        let raw = unwrap!(
            fs::read_to_string(&self.head_path),
            "failed to read HEAD: {}", self.head_path.display()
        );

        let value = raw.trim();

        if self.heads_dir.join(value).is_file() {
            return Ok(Head::Branch(value.to_string()));
        }

        if let Ok(hash) = ObjectHash::from_str(value) {
            return Ok(Head::Detached(hash));
        }

        Ok(Head::Branch(value.to_string()))
    }

    pub fn write_head(&self, head: &Head) -> Result<()> {
        let value = match head {
            Head::Branch(name) => name.clone(),
            Head::Detached(hash) => hash.full()
        };

        unwrap!(
            fs::write(&self.head_path, value),
            "failed to write HEAD: {}", self.head_path.display()
        );

        Ok(())
    }

    /// The digest a branch points at, or `None` when no ref file exists
    /// for the name yet.
    pub fn read_branch(&self, name: &str) -> Result<Option<ObjectHash>> {
        let path = self.heads_dir.join(name);

        if !path.is_file() {
            return Ok(None);
        }

        let raw = unwrap!(
            fs::read_to_string(&path),
            "failed to read branch ref: {}", path.display()
        );

        let hash = unwrap!(
            ObjectHash::from_str(raw.trim()),
            "branch ref {name:?} does not contain a digest"
        );

        Ok(Some(hash))
    }

    pub fn write_branch(&self, name: &str, hash: ObjectHash) -> Result<()> {
        validate_branch_name(name)?;

        let path = self.heads_dir.join(name);

        unwrap!(
            fs::write(&path, hash.full()),
            "failed to write branch ref: {}", path.display()
        );

        Ok(())
    }

    /// The names of all branches, sorted.
    pub fn list_branches(&self) -> Result<Vec<String>> {
        list_files(&self.heads_dir)
    }
}

/// A branch name must be usable as a single file name under `refs/heads`,
/// and must never be mistakable for a detached digest in HEAD.
fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("branch names cannot be empty");
    }

    if name.contains(['/', '\\']) {
        bail!("branch name {name:?} contains a path separator");
    }

    if ObjectHash::from_str(name).is_ok() {
        bail!("branch name {name:?} would be ambiguous with a snapshot digest");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::hash::digest_bytes;

    use super::{Head, RefStore};

    fn ref_store_in(dir: &tempfile::TempDir) -> RefStore {
        let heads_dir = dir.path().join("refs").join("heads");

        fs::create_dir_all(&heads_dir).unwrap();

        RefStore::new(dir.path().join("HEAD"), heads_dir)
    }

    #[test]
    fn a_branch_name_without_a_ref_is_still_attached() {
        let dir = tempfile::tempdir().unwrap();
        let refs = ref_store_in(&dir);

        refs.write_head(&Head::Branch("master".to_string())).unwrap();

        assert_eq!(refs.read_head().unwrap(), Head::Branch("master".to_string()));
        assert_eq!(refs.read_branch("master").unwrap(), None);
    }

    #[test]
    fn a_digest_with_no_matching_branch_is_detached() {
        let dir = tempfile::tempdir().unwrap();
        let refs = ref_store_in(&dir);

        let hash = digest_bytes(b"some tree");

        refs.write_head(&Head::Detached(hash)).unwrap();

        assert_eq!(refs.read_head().unwrap(), Head::Detached(hash));
    }

    #[test]
    fn branch_refs_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let refs = ref_store_in(&dir);

        let hash = digest_bytes(b"tip");

        refs.write_branch("feature", hash).unwrap();

        assert_eq!(refs.read_branch("feature").unwrap(), Some(hash));
        assert_eq!(refs.list_branches().unwrap(), ["feature"]);
    }

    #[test]
    fn branch_names_with_separators_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let refs = ref_store_in(&dir);

        let hash = digest_bytes(b"tip");

        assert!(refs.write_branch("a/b", hash).is_err());
        assert!(refs.write_branch("", hash).is_err());
        assert!(refs.write_branch(&hash.full(), hash).is_err());
    }
}

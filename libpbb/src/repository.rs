use std::{fs, path::{Path, PathBuf}, str::FromStr};

use eyre::Result;
use tracing::info;

use crate::{
    cache::PathCache,
    catalog::{SnapshotCatalog, SnapshotRow},
    checkout::CheckoutEngine,
    error::RepoError,
    hash::ObjectHash,
    objects::ObjectStore,
    refs::{Head, RefStore},
    tree::{TreeSerializer, tree_hash_only},
    unwrap
};

/// The name of the hidden directory holding all repository state.
pub const REPO_DIR: &str = ".pbb";

const OBJECTS_DIR: &str = "objects";
const REFS_DIR: &str = "refs";
const HEADS_DIR: &str = "heads";

const CACHE_FILE: &str = "objhashcache";
const HEAD_FILE: &str = "HEAD";
const SNAPSHOTS_FILE: &str = "snapshots";

const DEFAULT_BRANCH: &str = "master";

/// What a call to [`Repository::snapshot`] did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SnapshotOutcome {
    /// The working tree hashes to the current snapshot; nothing was
    /// recorded.
    NoChanges,

    /// A new snapshot was recorded at this root digest.
    Saved(ObjectHash)
}

/// Manages a repository instance.
///
/// Directory structure, relative to the working tree root:
///
/// ```text
/// .pbb/
///   objects/<first 2 hash chars>/<remaining 38 hash chars>
///   refs/heads/<branch name>
///   HEAD
///   objhashcache
///   snapshots
/// ```
#[derive(Debug)]
pub struct Repository {
    pub root_dir: PathBuf,

    store: ObjectStore,
    cache: PathCache,
    catalog: SnapshotCatalog,
    refs: RefStore
}

impl Repository {
    /// Open the repository rooted at `root`.
    ///
    /// With `create`, a missing or incomplete layout is created and
    /// initialized: HEAD attached to `master`, an empty path cache, and an
    /// empty snapshot catalog. Without it, an invalid layout fails with
    /// [`RepoError::NotARepository`].
    pub fn open(root: impl AsRef<Path>, create: bool) -> Result<Repository> {
        let root_dir = unwrap!(
            root.as_ref().canonicalize(),
            "could not canonicalize path: {}", root.as_ref().display()
        );

        if !layout_is_valid(&root_dir) {
            if create {
                create_layout(&root_dir)?;
            }
            else {
                return Err(RepoError::NotARepository(root_dir).into());
            }
        }

        let repo_dir = root_dir.join(REPO_DIR);

        let store = ObjectStore::new(repo_dir.join(OBJECTS_DIR));
        let cache = PathCache::load(repo_dir.join(CACHE_FILE));
        let catalog = SnapshotCatalog::new(repo_dir.join(SNAPSHOTS_FILE));
        let refs = RefStore::new(
            repo_dir.join(HEAD_FILE),
            repo_dir.join(REFS_DIR).join(HEADS_DIR)
        );

        Ok(Repository {
            root_dir,
            store,
            cache,
            catalog,
            refs
        })
    }

    /// The object store backing this repository.
    pub fn object_store(&self) -> &ObjectStore {
        &self.store
    }

    /// Capture the current state of the working tree as a snapshot.
    ///
    /// When the tree hashes to the current snapshot, nothing is written
    /// and [`SnapshotOutcome::NoChanges`] is returned. Otherwise HEAD must
    /// be attached; the branch ref advances to the new root digest and a
    /// row is appended to the catalog.
    pub fn snapshot(&mut self, label: &str, message: &str, user: &str) -> Result<SnapshotOutcome> {
        let root_digest = TreeSerializer::new(&self.store, &mut self.cache, REPO_DIR)
            .snapshot_tree(&self.root_dir)?;

        let head = self.refs.read_head()?;

        let current = match &head {
            Head::Branch(name) => self.refs.read_branch(name)?,
            Head::Detached(hash) => Some(*hash)
        };

        if current == Some(root_digest) {
            return Ok(SnapshotOutcome::NoChanges);
        }

        let Head::Branch(branch) = head else {
            return Err(RepoError::DetachedHead.into());
        };

        self.cache.save()?;

        self.refs.write_branch(&branch, root_digest)?;

        self.catalog.insert(root_digest, &branch, label, message, user)?;

        info!(branch = %branch, snapshot = %root_digest, "saved snapshot");

        Ok(SnapshotOutcome::Saved(root_digest))
    }

    /// Create (or move) a branch.
    ///
    /// Without `snapshot`, the branch points at the current snapshot;
    /// otherwise at the snapshot the (possibly partial) identifier
    /// resolves to. Returns the digest the branch now points at.
    pub fn create_branch(&self, name: &str, snapshot: Option<&str>) -> Result<ObjectHash> {
        let hash = match snapshot {
            Some(identifier) => self.resolve_partial(identifier)?,

            None => {
                let (current, _) = self.current_snapshot_hash()?;

                unwrap!(current, "cannot create a branch before the first snapshot")
            }
        };

        self.refs.write_branch(name, hash)?;

        info!(branch = %name, snapshot = %hash, "created branch");

        Ok(hash)
    }

    /// Check out the snapshot a (possibly partial) hex identifier
    /// resolves to, rebuilding the working tree.
    ///
    /// Without `force`, a working tree that differs from the current
    /// snapshot fails with [`RepoError::DirtyDirectory`]. With
    /// `new_branch`, a branch of that name is created at the target and
    /// HEAD attaches to it. Otherwise HEAD attaches to a branch whose tip
    /// is the target, and detaches to the bare digest when there is none.
    pub fn checkout(&mut self, identifier: &str, force: bool, new_branch: Option<&str>) -> Result<ObjectHash> {
        let target = self.resolve_partial(identifier)?;

        self.ensure_clean(force)?;

        let head = match new_branch {
            Some(name) => {
                self.refs.write_branch(name, target)?;

                Head::Branch(name.to_string())
            }

            None => match self.branch_pointing_at(target)? {
                Some(name) => Head::Branch(name),
                None => Head::Detached(target)
            }
        };

        self.refs.write_head(&head)?;

        self.rebuild_worktree(target)?;

        Ok(target)
    }

    /// Check out the tip of a branch, leaving HEAD attached to it.
    pub fn checkout_branch(&mut self, name: &str, force: bool) -> Result<ObjectHash> {
        let Some(target) = self.refs.read_branch(name)? else {
            return Err(RepoError::UnknownBranch(name.to_string()).into());
        };

        self.ensure_clean(force)?;

        self.refs.write_head(&Head::Branch(name.to_string()))?;

        self.rebuild_worktree(target)?;

        Ok(target)
    }

    pub fn list_snapshots(&self) -> Result<Vec<SnapshotRow>> {
        self.catalog.list()
    }

    pub fn list_branches(&self) -> Result<Vec<String>> {
        self.refs.list_branches()
    }

    /// The branch HEAD is attached to, or `None` when detached.
    pub fn current_branch(&self) -> Result<Option<String>> {
        match self.refs.read_head()? {
            Head::Branch(name) => Ok(Some(name)),
            Head::Detached(_) => Ok(None)
        }
    }

    /// The snapshot digest the working tree is based on, plus whether
    /// HEAD is detached.
    ///
    /// The digest is `None` when HEAD names a branch that has no
    /// snapshots yet.
    pub fn current_snapshot_hash(&self) -> Result<(Option<ObjectHash>, bool)> {
        match self.refs.read_head()? {
            Head::Branch(name) => Ok((self.refs.read_branch(&name)?, false)),
            Head::Detached(hash) => Ok((Some(hash), true))
        }
    }

    /// Hash the working tree as a snapshot would, without writing.
    pub fn worktree_hash(&self) -> Result<ObjectHash> {
        tree_hash_only(&self.root_dir, REPO_DIR)
    }

    /// Resolve a partial hex identifier to the unique snapshot digest
    /// that begins with it, matched case-insensitively.
    ///
    /// Zero matches and multiple matches both fail with
    /// [`RepoError::InvalidHash`] carrying the candidate list.
    pub fn resolve_partial(&self, identifier: &str) -> Result<ObjectHash> {
        let needle = identifier.to_lowercase();

        let mut candidates: Vec<String> = vec![];

        for hash in self.catalog.hashes()? {
            if hash.starts_with(&needle) && !candidates.contains(&hash) {
                candidates.push(hash);
            }
        }

        if let [only] = candidates.as_slice() {
            return Ok(ObjectHash::from_str(only)?);
        }

        Err(RepoError::InvalidHash {
            prefix: identifier.to_string(),
            candidates
        }.into())
    }

    fn ensure_clean(&self, force: bool) -> Result<()> {
        if force {
            return Ok(());
        }

        let worktree = self.worktree_hash()?;

        let (current, _) = self.current_snapshot_hash()?;

        if current != Some(worktree) {
            return Err(RepoError::DirtyDirectory.into());
        }

        Ok(())
    }

    /// The name of a branch whose tip is `hash`, preferring the first in
    /// name order so the choice is stable.
    fn branch_pointing_at(&self, hash: ObjectHash) -> Result<Option<String>> {
        for name in self.refs.list_branches()? {
            if self.refs.read_branch(&name)? == Some(hash) {
                return Ok(Some(name));
            }
        }

        Ok(None)
    }

    fn rebuild_worktree(&self, target: ObjectHash) -> Result<()> {
        info!(snapshot = %target, "rebuilding working tree");

        CheckoutEngine::new(&self.store, REPO_DIR).rebuild(&self.root_dir, target)
    }
}

fn layout_is_valid(root_dir: &Path) -> bool {
    let repo_dir = root_dir.join(REPO_DIR);

    let dirs = [
        repo_dir.clone(),
        repo_dir.join(OBJECTS_DIR),
        repo_dir.join(REFS_DIR),
        repo_dir.join(REFS_DIR).join(HEADS_DIR)
    ];

    let files = [
        repo_dir.join(CACHE_FILE),
        repo_dir.join(HEAD_FILE),
        repo_dir.join(SNAPSHOTS_FILE)
    ];

    dirs.iter().all(|dir| dir.is_dir()) && files.iter().all(|file| file.is_file())
}

fn create_layout(root_dir: &Path) -> Result<()> {
    let repo_dir = root_dir.join(REPO_DIR);

    for dir in [
        repo_dir.join(OBJECTS_DIR),
        repo_dir.join(REFS_DIR).join(HEADS_DIR)
    ] {
        unwrap!(
            fs::create_dir_all(&dir),
            "failed to create directory: {}", dir.display()
        );
    }

    hide_repository_dir(&repo_dir);

    RefStore::new(
        repo_dir.join(HEAD_FILE),
        repo_dir.join(REFS_DIR).join(HEADS_DIR)
    ).write_head(&Head::Branch(DEFAULT_BRANCH.to_string()))?;

    PathCache::load(repo_dir.join(CACHE_FILE)).save()?;

    SnapshotCatalog::new(repo_dir.join(SNAPSHOTS_FILE)).init()?;

    info!(repository = %repo_dir.display(), "created repository");

    Ok(())
}

/// Mark the repository directory hidden. On Windows this needs a file
/// attribute; elsewhere the leading dot already does the job. Failure is
/// not an error.
#[cfg(windows)]
fn hide_repository_dir(path: &Path) {
    use std::os::windows::ffi::OsStrExt;

    use windows_sys::Win32::Storage::FileSystem::{FILE_ATTRIBUTE_HIDDEN, SetFileAttributesW};

    let wide: Vec<u16> = path
        .as_os_str()
        .encode_wide()
        .chain(std::iter::once(0))
        .collect();

    unsafe {
        SetFileAttributesW(wide.as_ptr(), FILE_ATTRIBUTE_HIDDEN);
    }
}

#[cfg(not(windows))]
fn hide_repository_dir(_path: &Path) {}

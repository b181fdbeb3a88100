use std::path::PathBuf;

use thiserror::Error;

use crate::hash::ObjectHash;

/// The failure taxonomy for repository operations.
///
/// Operations return [`eyre::Result`], and failures that a front-end may
/// want to react to are reported as values of this type so that callers can
/// recover them with `Report::downcast_ref`. Everything else (raw I/O,
/// database errors) is propagated as plain context-wrapped reports.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Opened without `create` where the repository layout is absent or
    /// incomplete.
    #[error("not a repository (or repository is invalid): {}", .0.display())]
    NotARepository(PathBuf),

    /// A snapshot was attempted while HEAD points at a bare digest.
    #[error("cannot save a snapshot while HEAD is detached")]
    DetachedHead,

    /// The working tree differs from the current snapshot.
    #[error("the working directory has unsaved changes")]
    DirtyDirectory,

    /// A partial hash matched zero snapshots, or more than one.
    #[error("{prefix:?} matches {} snapshot hashes", .candidates.len())]
    InvalidHash {
        prefix: String,
        candidates: Vec<String>
    },

    /// No file exists for the requested digest.
    #[error("object {0:?} does not exist in the store")]
    MissingObject(ObjectHash),

    /// The object's file neither hashes to its digest nor parses as a
    /// delta record.
    #[error("object {0:?} is neither fresh content nor a delta record")]
    CorruptObject(ObjectHash),

    /// Resolving the delta chain behind an object failed part-way.
    #[error("the delta chain behind object {0:?} is broken")]
    DeltaChainBroken(ObjectHash),

    /// A tree object's payload is not decodable as tree entry lines.
    #[error("tree object {0:?} is malformed")]
    CorruptTree(ObjectHash),

    /// A branch name was used that has no ref file.
    #[error("branch {0:?} does not exist")]
    UnknownBranch(String)
}

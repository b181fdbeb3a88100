use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};

use crate::hash::ObjectHash;

/// Produce a patch that rebuilds `target` from `source`.
///
/// The patch format is whatever xdelta3 emits; nothing outside this module
/// interprets it. For all `a` and `b`, `patch(&diff(a, b)?, a)? == b`.
pub fn diff(source: &[u8], target: &[u8]) -> Result<Vec<u8>> {
    xdelta3::encode(target, source)
        .ok_or_else(|| eyre!("xdelta3 failed to encode a patch ({} -> {} bytes)", source.len(), target.len()))
}

/// Apply a patch produced by [`diff`] to `source`, returning the target bytes.
pub fn patch(patch: &[u8], source: &[u8]) -> Result<Vec<u8>> {
    xdelta3::decode(patch, source)
        .ok_or_else(|| eyre!("xdelta3 failed to apply a {}-byte patch", patch.len()))
}

/// The envelope written over an older object file once a newer version of
/// the same working-tree path has been stored: the digest of the newer
/// object, plus the patch that turns the newer object's bytes back into
/// this object's bytes.
///
/// On disk this is MessagePack. There is deliberately no marker byte; a
/// reader decides fresh-vs-delta purely by checking whether the file's
/// bytes hash to the digest in its path.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DeltaRecord {
    pub origin: ObjectHash,

    #[serde(with = "serde_bytes")]
    pub patch: Vec<u8>
}

impl DeltaRecord {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = rmp_serde::to_vec(self)?;

        Ok(bytes)
    }

    /// Decode an envelope, returning `None` when the bytes are not one.
    pub fn from_bytes(bytes: &[u8]) -> Option<DeltaRecord> {
        rmp_serde::from_slice(bytes).ok()
    }
}

use std::{fmt::{Debug, Display, Formatter}, str::FromStr};

use eyre::bail;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

pub type RawObjectHash = [u8; 20];

/// A SHA-1 wrapper type used to uniquely identify objects in the store.
///
/// The hex form of this hash is the object's identity everywhere: it names
/// the object's file on disk, appears in tree payload lines, and is what
/// branch refs and a detached HEAD contain.
#[derive(Clone, Copy, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(transparent)]
pub struct ObjectHash(#[serde(with = "serde_bytes")] RawObjectHash);

impl ObjectHash {
    /// Get the full hash as a 40-character lowercase hex string.
    ///
    /// In this type's implementation of [`Display`], the hash is shrunk
    /// to 10 characters. This instead returns the full hash.
    pub fn full(&self) -> String {
        format!("{self:?}")
    }

    /// Get the individual bytes that make up this `ObjectHash`.
    pub fn as_bytes(&self) -> &RawObjectHash {
        &self.0
    }
}

impl From<RawObjectHash> for ObjectHash {
    fn from(value: RawObjectHash) -> Self {
        Self(value)
    }
}

impl Display for ObjectHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.full()[..10])
    }
}

impl Debug for ObjectHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ObjectHash {
    type Err = eyre::Report;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(value)?;

        if bytes.len() != 20 {
            bail!("invalid length of string hash: {} (expected 20)", bytes.len());
        }

        Ok(ObjectHash(bytes[..].try_into()?))
    }
}

/// Compute the SHA-1 digest of a byte payload.
///
/// Text payloads must be encoded as UTF-8 before hashing; the digest is
/// always of the resulting bytes.
pub fn digest_bytes(input: impl AsRef<[u8]>) -> ObjectHash {
    let mut hasher = Sha1::new();

    hasher.update(input);

    let raw_hash: RawObjectHash = hasher.finalize().into();

    raw_hash.into()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{ObjectHash, digest_bytes};

    #[test]
    fn digest_matches_known_value() {
        let hash = digest_bytes(b"hello");

        assert_eq!(hash.full(), "aaf4c61ddcc5e8a2dabede0f3b482cd9aea9434d");
    }

    #[test]
    fn digest_of_single_newline() {
        // The payload of an empty tree node.
        let hash = digest_bytes(b"\n");

        assert_eq!(hash.full(), "adc83b19e793491b1c6ea0fd8b46cd9f32e592fc");
    }

    #[test]
    fn hex_round_trip() {
        let hash = digest_bytes(b"round trip");

        let parsed = ObjectHash::from_str(&hash.full()).unwrap();

        assert_eq!(parsed, hash);
    }

    #[test]
    fn rejects_short_hex() {
        assert!(ObjectHash::from_str("abc123").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(ObjectHash::from_str("zz".repeat(20).as_str()).is_err());
    }
}

//! Hashing helpers for the event feed and voter proofs

use crate::types::Hash;
use crate::Result;

/// Blake3 digest utilities
pub struct Digest;

impl Digest {
    /// Hash arbitrary data with Blake3
    pub fn hash(data: &[u8]) -> Hash {
        blake3::hash(data).into()
    }

    /// Hash a serializable value through its canonical JSON encoding
    pub fn hash_json<T: serde::Serialize>(value: &T) -> Result<Hash> {
        let bytes = serde_json::to_vec(value)?;
        Ok(Self::hash(&bytes))
    }

    /// Digest of an identity document, as presented at voter registration
    pub fn proof(document: &[u8]) -> Hash {
        let mut hasher = blake3::Hasher::new_derive_key("vote-ledger voter proof v1");
        hasher.update(document);
        hasher.finalize().into()
    }

    /// Verify that two hashes are equal in constant time
    pub fn constant_time_eq(a: &Hash, b: &Hash) -> bool {
        use subtle::ConstantTimeEq;
        a.ct_eq(b).into()
    }

    /// Convert a hash to a hex string
    pub fn hash_to_hex(hash: &Hash) -> String {
        hex::encode(hash)
    }
}

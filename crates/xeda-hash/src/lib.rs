//! Canonical serialization and content-addressed hashing.
//!
//! Grounded on `xchecker_utils::canonicalization::emit_jcs`: any `Serialize`
//! value is converted to a `serde_json::Value` and re-emitted through the
//! JCS (RFC 8785) canonicalizer, which sorts object keys lexicographically
//! and produces a byte-stable representation regardless of the original
//! field order. That canonical text is then hashed with SHA3-256. The
//! directory-name suffix used by `xeda-runpath` is the first 16 hex
//! characters of the same digest (mirrors `xeda`'s own
//! `DIR_NAME_HASH_LEN = 16` truncation of `semantic_hash(...)`).

use serde::Serialize;
use sha2::{Digest, Sha256};
use sha3::Sha3_256;
use thiserror::Error;

/// Number of hex characters kept when deriving a run-path directory suffix.
pub const DIR_SUFFIX_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to serialize value to JSON: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to canonicalize JSON using JCS: {0}")]
    Canonicalize(#[source] serde_json_canonicalizer::CanonicalizationError),
    #[error("canonicalized JSON was not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Serialize `value` to canonical JSON text (RFC 8785 JCS): object keys
/// sorted lexicographically at every nesting level, sequences preserve
/// their original order, scalars serialize to their JSON textual form.
///
/// This directly satisfies the fingerprint contract "insensitive to
/// map-insertion order [and] key ordering" (spec §4.1): JCS always emits
/// keys sorted, so two maps built in different insertion orders produce
/// identical canonical text.
pub fn canonicalize<T: Serialize>(value: &T) -> Result<String, HashError> {
    let json_value = serde_json::to_value(value)?;
    let bytes =
        serde_json_canonicalizer::to_vec(&json_value).map_err(HashError::Canonicalize)?;
    Ok(String::from_utf8(bytes)?)
}

/// SHA3-256 hex digest of pre-canonicalized text.
pub fn sha3_256_hex(canonical: &str) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonicalize then hash with SHA3-256: the `design_hash` / `flow_hash`
/// primitive used throughout the engine (spec §4.1).
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, HashError> {
    let canonical = canonicalize(value)?;
    Ok(sha3_256_hex(&canonical))
}

/// Truncate a full fingerprint to the directory-suffix width (spec §4.2
/// `DIR_NAME_HASH_LEN`). Panics if `full` is shorter than [`DIR_SUFFIX_LEN`];
/// every fingerprint produced by [`fingerprint`] is 64 hex characters, so
/// this is only reachable with a caller-constructed string.
pub fn dir_suffix(full: &str) -> &str {
    &full[..DIR_SUFFIX_LEN.min(full.len())]
}

/// Content hash of a file, used by `FileResource` (spec §3): editing any
/// source file changes this hash, which in turn changes every `design_hash`
/// that references it.
pub fn file_content_sha256(path: &std::path::Path) -> Result<String, HashError> {
    let bytes = std::fs::read(path).map_err(|source| HashError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalize_is_insensitive_to_key_order() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn canonicalize_preserves_sequence_order() {
        let a = json!({"xs": [1, 2, 3]});
        let b = json!({"xs": [3, 2, 1]});
        assert_ne!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let v = json!({"name": "mydesign", "clock_period": 10.0});
        assert_eq!(fingerprint(&v).unwrap(), fingerprint(&v).unwrap());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = json!({"name": "mydesign"});
        let b = json!({"name": "otherdesign"});
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn dir_suffix_is_truncated() {
        let full = "a".repeat(64);
        assert_eq!(dir_suffix(&full).len(), DIR_SUFFIX_LEN);
    }

    #[test]
    fn file_content_hash_changes_with_edits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("src.vhd");
        std::fs::write(&path, "entity foo is end entity;").unwrap();
        let h1 = file_content_sha256(&path).unwrap();
        std::fs::write(&path, "entity foo is end entity; -- edited").unwrap();
        let h2 = file_content_sha256(&path).unwrap();
        assert_ne!(h1, h2);
    }

    proptest::proptest! {
        #[test]
        fn fingerprint_insensitive_to_whitespace_round_trip(name in "[a-zA-Z0-9]{1,20}") {
            let a = json!({"name": name.clone(), "x": 1});
            let parsed: serde_json::Value = serde_json::from_str(
                &format!("  {{ \"x\" :  1 , \"name\": \"{name}\" }}  ")
            ).unwrap();
            prop_assert_eq!(fingerprint(&a).unwrap(), fingerprint(&parsed).unwrap());
        }
    }
}

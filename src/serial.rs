//! Binary envelope for portable rule-set documents.
//!
//! This module provides a stable binary format for caching portable
//! rule-set documents (see [`codec`](crate::codec)), e.g. by the storage
//! layer that loads rule definitions by identifier. The format consists of
//! a 32-byte fixed header followed by a bincode-encoded payload carrying
//! the canonical JSON text of the document.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"SWBD"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly; otherwise decoding
//! fails immediately with [`DeserializeError::IncompatibleVersion`]. The
//! engine version is informational only.
//!
//! Decoding re-runs the full portable-form decoder, so capabilities are
//! rebound against the host lookup and every structural validation of
//! [`decode_rule_set`](crate::decode_rule_set) still applies.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec;
use crate::types::{CapabilityLookup, RuleSet};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"SWBD";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`RuleSet`] to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error(transparent)]
    Encode(#[from] crate::EncodeError),

    #[error("failed to render document text: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode envelope: {0}")]
    Envelope(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`RuleSet`] from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a switchboard binary: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode envelope: {0}")]
    Envelope(#[from] bincode::error::DecodeError),

    #[error("document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Decode(#[from] crate::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct CachedDocument {
    metadata: DocumentMetadata,
    document: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DocumentMetadata {
    entry_count: usize,
    source_digest: Option<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version (informational, not used for checks)
    // bytes[8..12] is flags (reserved)
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Encode / decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(
    rules: &RuleSet,
    source_text: Option<&str>,
) -> Result<Vec<u8>, SerializeError> {
    let portable = codec::encode_rule_set(rules)?;
    let cached = CachedDocument {
        metadata: DocumentMetadata {
            entry_count: rules.len(),
            source_digest: source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes()),
        },
        document: serde_json::to_string(&portable)?,
    };
    let payload = bincode::serde::encode_to_vec(&cached, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(
    bytes: &[u8],
    host: &CapabilityLookup,
) -> Result<RuleSet, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    // Integrity check
    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (cached, _): (CachedDocument, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    let document: serde_json::Value = serde_json::from_str(&cached.document)?;
    let rules = codec::decode_rule_set(&document, host)?;

    if rules.len() != cached.metadata.entry_count {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} entries but document has {}",
            cached.metadata.entry_count,
            rules.len()
        )));
    }

    Ok(rules)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{cap_ref, lit, Capability, RuleSetBuilder};
    use serde_json::Value;

    fn host() -> CapabilityLookup {
        CapabilityLookup::new()
            .bind("gate", Capability::predicate(|_| true))
            .bind("act", Capability::action(|_| Value::Null))
    }

    fn sample_rules() -> RuleSet {
        RuleSetBuilder::new()
            .circuit(lit(true).and(cap_ref("gate")))
            .rule(|r| r.name("branching").when(cap_ref("gate")).branch("act", "act"))
            .build()
    }

    #[test]
    fn header_round_trip() {
        let payload = b"test payload data";
        let mut buf = Vec::new();
        write_header(&mut buf, payload);
        assert_eq!(buf.len(), HEADER_SIZE);

        let (format_version, payload_len, hash) = read_header(&buf).unwrap();
        assert_eq!(format_version, FORMAT_VERSION);
        assert_eq!(payload_len as usize, payload.len());

        let expected_hash = blake3::hash(payload);
        assert_eq!(&hash, &expected_hash.as_bytes()[..16]);
    }

    #[test]
    fn header_bad_magic() {
        let mut buf = vec![0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(b"BAAD");
        assert!(matches!(read_header(&buf), Err(DeserializeError::BadMagic)));
    }

    #[test]
    fn header_too_short() {
        let buf = vec![0u8; 10];
        assert!(matches!(
            read_header(&buf),
            Err(DeserializeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn envelope_round_trip() {
        let rules = sample_rules();
        let bytes = encode(&rules, Some("source text")).unwrap();
        let restored = decode(&bytes, &host()).unwrap();

        assert_eq!(restored.len(), rules.len());
        assert_eq!(
            codec::encode_rule_set(&restored).unwrap(),
            codec::encode_rule_set(&rules).unwrap()
        );
    }

    #[test]
    fn incompatible_version_rejected() {
        let mut bytes = encode(&sample_rules(), None).unwrap();
        bytes[4..6].copy_from_slice(&99u16.to_le_bytes());
        assert!(matches!(
            decode(&bytes, &host()),
            Err(DeserializeError::IncompatibleVersion { blob: 99, .. })
        ));
    }

    #[test]
    fn tampered_payload_rejected() {
        let mut bytes = encode(&sample_rules(), None).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            decode(&bytes, &host()),
            Err(DeserializeError::ChecksumMismatch)
        ));
    }

    #[test]
    fn truncated_payload_rejected() {
        let bytes = encode(&sample_rules(), None).unwrap();
        let truncated = &bytes[..bytes.len() - 4];
        assert!(matches!(
            decode(truncated, &host()),
            Err(DeserializeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn declared_lookup_requires_host_binding() {
        // A rule that declares a lookup dependency can only be decoded by a
        // host that actually provides it.
        let rules = RuleSetBuilder::new()
            .rule(|r| {
                r.name("needs_gate")
                    .when(cap_ref("gate"))
                    .branch("act", "act")
                    .bind("gate", Capability::predicate(|_| true))
            })
            .build();
        let bytes = encode(&rules, None).unwrap();

        assert!(decode(&bytes, &host()).is_ok());
        let err = decode(&bytes, &CapabilityLookup::new()).unwrap_err();
        match err {
            DeserializeError::Decode(inner) => {
                assert_eq!(inner.to_string(), "capability 'gate' is not bound in the host lookup");
            }
            other => panic!("expected Decode error, got {other:?}"),
        }
    }
}

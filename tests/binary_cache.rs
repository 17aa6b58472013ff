#![cfg(feature = "binary-cache")]

use serde_json::{json, Value};
use switchboard::{
    cap_ref, lit, run_rule_set, Capability, CapabilityLookup, Context, DeserializeError, RuleSet,
    RuleSetBuilder,
};

fn host() -> CapabilityLookup {
    CapabilityLookup::new()
        .bind("healthy", Capability::predicate(|_| true))
        .bind("alert", Capability::action(|_| Value::Null))
}

fn sample_rules() -> RuleSet {
    RuleSetBuilder::new()
        .circuit(lit(true).and(cap_ref("healthy")))
        .rule(|r| {
            r.name("escalate")
                .when(!cap_ref("healthy"))
                .branch("alert", "alert")
        })
        .build()
}

#[tokio::test]
async fn bytes_round_trip_preserves_behavior() {
    let rules = sample_rules();
    let bytes = rules.to_bytes(None).unwrap();
    let restored = RuleSet::from_bytes(&bytes, &host()).unwrap();

    let original = run_rule_set(&rules, Context::new(), &host()).await.unwrap();
    let replayed = run_rule_set(&restored, Context::new(), &host())
        .await
        .unwrap();

    assert_eq!(original.results, replayed.results);
    assert_eq!(original.result, replayed.result);
    assert_eq!(original.result, json!(false));
}

#[test]
fn source_digest_is_embedded() {
    let rules = sample_rules();
    let with_digest = rules.to_bytes(Some("source A")).unwrap();
    let without_digest = rules.to_bytes(None).unwrap();
    // The digest changes the payload, so the blobs differ.
    assert_ne!(with_digest, without_digest);
}

#[test]
fn corrupted_blob_is_rejected() {
    let mut bytes = sample_rules().to_bytes(None).unwrap();
    let mid = bytes.len() / 2;
    bytes[mid] ^= 0x55;
    let err = RuleSet::from_bytes(&bytes, &host()).unwrap_err();
    assert!(matches!(
        err,
        DeserializeError::ChecksumMismatch | DeserializeError::LengthMismatch { .. }
    ));
}

#[test]
fn garbage_is_not_a_switchboard_binary() {
    let err = RuleSet::from_bytes(b"not a cache blob at all", &host()).unwrap_err();
    assert!(matches!(
        err,
        DeserializeError::BadMagic | DeserializeError::LengthMismatch { .. }
    ));
}

#[test]
fn file_round_trip() {
    let rules = sample_rules();
    let path = std::env::temp_dir().join("switchboard-binary-cache-test.swbd");
    rules.to_binary_file(&path, Some("rules v1")).unwrap();
    let restored = RuleSet::from_binary_file(&path, &host()).unwrap();
    assert_eq!(restored.len(), rules.len());
    let _ = std::fs::remove_file(&path);
}

//! State document codec.
//!
//! Encoding relies on `serde_json`'s default `BTreeMap`-backed `Map` (the
//! `preserve_order` feature is not enabled), which gives a stable,
//! alphabetically key-ordered encoding for free.

use crate::error::{CoreError, CoreResult};
use crate::state::document::StateDocument;

/// Serializes a state document to its on-disk representation.
pub fn encode(doc: &StateDocument) -> CoreResult<Vec<u8>> {
    serde_json::to_vec_pretty(doc).map_err(|e| CoreError::StateCorrupt(e.to_string()))
}

/// Parses a blob payload into a state document.
pub fn decode(bytes: &[u8]) -> CoreResult<StateDocument> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::StateCorrupt(e.to_string()))
}

/// Returns an independent copy of `doc`. State documents only ever contain
/// owned, `Clone`-able data, so this is a plain clone -- kept as a named
/// function because the state manager's invariants depend on
/// every handoff between `state` and `read_state` being a true copy, never
/// a shared reference.
pub fn deep_copy(doc: &StateDocument) -> StateDocument {
    doc.clone()
}

/// Compares two documents ignoring `serial`.
pub fn structural_equal(a: &StateDocument, b: &StateDocument) -> bool {
    a.version == b.version
        && a.terraform_version == b.terraform_version
        && a.lineage == b.lineage
        && a.outputs == b.outputs
        && a.resources == b.resources
}

/// True if both documents share the lineage assigned at blob genesis.
pub fn same_lineage(a: &StateDocument, b: &StateDocument) -> bool {
    a.lineage == b.lineage
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_bytes() {
        let doc = StateDocument::genesis("1.7.0");
        let bytes = encode(&doc).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(doc, decoded);
    }

    #[test]
    fn structural_equal_ignores_serial() {
        let mut a = StateDocument::genesis("1.7.0");
        let mut b = a.clone();
        b.lineage = a.lineage;
        a.serial = 4;
        b.serial = 9;
        assert!(structural_equal(&a, &b));
    }

    #[test]
    fn structural_equal_false_on_resource_change() {
        let a = StateDocument::genesis("1.7.0");
        let mut b = a.clone();
        b.terraform_version = "1.8.0".to_string();
        assert!(!structural_equal(&a, &b));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode(b"not json").is_err());
    }
}

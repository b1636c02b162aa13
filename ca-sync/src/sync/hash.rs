//! Content hash of a snapshot
//!
//! SHA-256 over the JSON of a canonically ordered copy: collections sorted
//! by id, confirmed ids sorted within each date. Snapshots holding the same
//! rows hash equally whatever order a store returned them in.

use ca_common::Snapshot;
use sha2::{Digest, Sha256};

fn canonical_order(snapshot: &Snapshot) -> Snapshot {
    let mut ordered = snapshot.clone();
    ordered.teachers.sort_by(|a, b| a.id.cmp(&b.id));
    ordered.slots.sort_by(|a, b| a.id.cmp(&b.id));
    ordered.expenses.sort_by(|a, b| a.id.cmp(&b.id));
    for ids in ordered.confirmations.values_mut() {
        ids.sort();
    }
    ordered
}

pub fn content_hash(snapshot: &Snapshot) -> String {
    let mut hasher = Sha256::new();
    // Vec/BTreeMap/String/number fields cannot fail to serialize
    match serde_json::to_vec(&canonical_order(snapshot)) {
        Ok(bytes) => hasher.update(&bytes),
        Err(e) => hasher.update(e.to_string().as_bytes()),
    }
    format!("{:x}", hasher.finalize())
}

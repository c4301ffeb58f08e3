//! Conclave replicated record log.
//!
//! An in-process model of the replicated substrate the protocol runs on:
//! a content-addressed, append-only record store plus a secondary link
//! index, replicated between peers with only eventual-consistency
//! guarantees.
//!
//! # Design
//!
//! Record identifiers are 32-byte Blake3 hashes over (author, sequence,
//! timestamp, payload bytes), assigned at append time. Records are
//! immutable, so replication is pure set union: merging two replicas in
//! any order, any number of times, converges to the same state.
//!
//! # Links
//!
//! All "-for-X" lookups go through the link index: an explicit map from
//! (base id, link type) to a set of target ids. Link removal is
//! tombstoned (two-phase set) so that merges never resurrect a removed
//! link, regardless of arrival order.
//!
//! # What this is not
//!
//! There is no transport, signing, or persistence here; peers in tests
//! exchange whole replicas via [`Replica::merge`]. No call ever blocks on
//! the network: reads answer from the local replica, and "not replicated
//! yet" is an ordinary answer, not an error.

mod cancellation;
mod links;
mod record;
mod replica;

pub use links::{LinkIndex, LinkType};
pub use record::{content_id, Record};
pub use replica::Replica;

use conclave_record::RecordId;

/// Well-known base id for the open-calls-to-action index.
pub fn open_calls_base() -> RecordId {
    hash_index_base("open_calls_to_action")
}

/// Base id of a peer's my-calls-to-action index.
pub fn my_calls_base(peer: &conclave_record::PeerId) -> RecordId {
    RecordId(*peer.as_bytes())
}

/// Hash a well-known index name to a base id.
fn hash_index_base(name: &str) -> RecordId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"index:");
    hasher.update(name.as_bytes());
    RecordId(*hasher.finalize().as_bytes())
}

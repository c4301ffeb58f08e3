//! The record envelope and content addressing.

use conclave_record::{Payload, PeerId, RecordId, Timestamp};
use serde::{Deserialize, Serialize};

/// One record in the replicated log: an immutable payload wrapped with
/// the identity, author, and timestamp the substrate assigned at write
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Content-derived identifier, unique across all peers.
    pub id: RecordId,
    /// The peer that authored this record.
    pub author: PeerId,
    /// Position in the author's local append order. Disambiguates
    /// otherwise-identical records written in the same millisecond.
    pub seq: u64,
    /// Assigned at write time by the authoring replica.
    pub timestamp: Timestamp,
    pub payload: Payload,
}

impl Record {
    /// Shortcut accessors for common payload downcasts.
    pub fn as_call_to_action(&self) -> Option<&conclave_record::CallToAction> {
        match &self.payload {
            Payload::CallToAction(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_commitment(&self) -> Option<&conclave_record::Commitment> {
        match &self.payload {
            Payload::Commitment(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_satisfaction(&self) -> Option<&conclave_record::Satisfaction> {
        match &self.payload {
            Payload::Satisfaction(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_assembly(&self) -> Option<&conclave_record::Assembly> {
        match &self.payload {
            Payload::Assembly(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_cancellation(&self) -> Option<&conclave_record::Cancellation> {
        match &self.payload {
            Payload::Cancellation(c) => Some(c),
            _ => None,
        }
    }
}

/// Compute the content-derived id for a record.
///
/// Hashes author, sequence, timestamp, and the bincode bytes of the
/// payload. Identical inputs always produce identical ids, so replaying
/// an append on another replica is idempotent.
pub fn content_id(author: &PeerId, seq: u64, timestamp: Timestamp, payload: &Payload) -> RecordId {
    let bytes = bincode::serialize(payload).expect("record payloads are always serializable");
    let mut hasher = blake3::Hasher::new();
    hasher.update(author.as_bytes());
    hasher.update(&seq.to_le_bytes());
    hasher.update(&timestamp.as_millis().to_le_bytes());
    hasher.update(&bytes);
    RecordId(*hasher.finalize().as_bytes())
}

//! A peer's local replica of the record log.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use conclave_record::{Payload, PeerId, RecordId, Timestamp};

use crate::links::{LinkIndex, LinkType};
use crate::record::{content_id, Record};

/// The locally-replicated record set of one peer.
///
/// Append-only: records are never mutated or deleted, and no peer ever
/// touches another peer's records. Replication between peers is modeled
/// as [`Replica::merge`] — pure set union, so out-of-order, duplicate,
/// and concurrent deliveries all converge to the same state.
#[derive(Debug, Clone, Default)]
pub struct Replica {
    records: BTreeMap<RecordId, Record>,
    links: LinkIndex,
}

impl Replica {
    /// Create an empty replica.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record authored by `author`, with a write-time timestamp.
    pub fn append(&mut self, author: PeerId, payload: Payload) -> RecordId {
        self.append_at(author, now_millis(), payload)
    }

    /// Append with an explicit timestamp (tests, deterministic replays).
    pub fn append_at(
        &mut self,
        author: PeerId,
        timestamp: Timestamp,
        payload: Payload,
    ) -> RecordId {
        let seq = self
            .records
            .values()
            .filter(|r| r.author == author)
            .count() as u64;
        let id = content_id(&author, seq, timestamp, &payload);
        self.records.entry(id).or_insert(Record {
            id,
            author,
            seq,
            timestamp,
            payload,
        });
        id
    }

    /// Get a locally-replicated record. `None` means "not replicated
    /// here yet", which is not the same as "does not exist".
    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    /// Whether a record is locally replicated.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    /// Add a link from `base` to `target`.
    pub fn add_link(&mut self, base: RecordId, link_type: LinkType, target: RecordId) {
        self.links.add(base, link_type, target);
    }

    /// Remove a link (tombstoned, permanent).
    pub fn remove_link(&mut self, base: RecordId, link_type: LinkType, target: RecordId) {
        self.links.remove(base, link_type, target);
    }

    /// Live link targets from `base`, in id order.
    pub fn links_from(&self, base: &RecordId, link_type: LinkType) -> Vec<RecordId> {
        self.links.links_from(base, link_type)
    }

    /// Whether a live link exists.
    pub fn has_link(&self, base: &RecordId, link_type: LinkType, target: &RecordId) -> bool {
        self.links.has_link(base, link_type, target)
    }

    /// Merge another replica into this one.
    ///
    /// Records are unioned by id; links union their added and removed
    /// sets. Returns the number of records that were new here. Once
    /// merged, a record participates in every subsequent local
    /// computation (local monotonicity).
    pub fn merge(&mut self, other: &Replica) -> usize {
        let mut new_records = 0;
        for (id, record) in &other.records {
            if !self.records.contains_key(id) {
                self.records.insert(*id, record.clone());
                new_records += 1;
            }
        }
        self.links.merge(&other.links);
        new_records
    }

    /// All locally-replicated records.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Number of locally-replicated records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has replicated here yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Current unix time in milliseconds.
pub(crate) fn now_millis() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    Timestamp(millis)
}

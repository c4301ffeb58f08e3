//! Secondary link index over the record log.

use std::collections::{BTreeMap, BTreeSet};

use conclave_record::RecordId;
use serde::{Deserialize, Serialize};

/// The link vocabulary of the protocol.
///
/// Every "-for-X" query resolves through one of these: links are written
/// by the client alongside the records they index, and replicated with
/// the same eventual-consistency guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LinkType {
    /// Parent call to action → child calls to action.
    CallToActionToCallToActions,
    /// Superseded call to action → the records updating it.
    CallToActionToUpdates,
    CallToActionToCommitments,
    CallToActionToSatisfactions,
    CommitmentToSatisfactions,
    CallToActionToAssemblies,
    SatisfactionToAssemblies,
    CommitmentToCancellations,
    /// Well-known base → calls currently accepting commitments.
    OpenCallsToAction,
    /// Peer base → calls the peer authored or contributed to.
    MyCallsToAction,
}

/// Added/removed target sets for one (base, link type) slot.
///
/// Removal is tombstoned: a target in `removed` stays removed no matter
/// how many times an `added` entry for it arrives later. This keeps
/// merges order-independent (two-phase set semantics).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct LinkSlot {
    added: BTreeSet<RecordId>,
    removed: BTreeSet<RecordId>,
}

impl LinkSlot {
    fn live(&self) -> impl Iterator<Item = &RecordId> {
        self.added.iter().filter(|t| !self.removed.contains(t))
    }
}

/// Map from (base id, link type) to target sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkIndex {
    slots: BTreeMap<(RecordId, LinkType), LinkSlot>,
}

impl LinkIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a link from `base` to `target`.
    pub fn add(&mut self, base: RecordId, link_type: LinkType, target: RecordId) {
        self.slots
            .entry((base, link_type))
            .or_default()
            .added
            .insert(target);
    }

    /// Remove a link. Permanent: a removed link never resurfaces, even if
    /// the add is observed again later on another replica.
    pub fn remove(&mut self, base: RecordId, link_type: LinkType, target: RecordId) {
        self.slots
            .entry((base, link_type))
            .or_default()
            .removed
            .insert(target);
    }

    /// Live targets linked from `base` under `link_type`, in id order.
    pub fn links_from(&self, base: &RecordId, link_type: LinkType) -> Vec<RecordId> {
        match self.slots.get(&(*base, link_type)) {
            Some(slot) => slot.live().copied().collect(),
            None => Vec::new(),
        }
    }

    /// Whether a live link from `base` to `target` exists.
    pub fn has_link(&self, base: &RecordId, link_type: LinkType, target: &RecordId) -> bool {
        self.slots
            .get(&(*base, link_type))
            .map(|slot| slot.added.contains(target) && !slot.removed.contains(target))
            .unwrap_or(false)
    }

    /// Merge another index into this one. Unions both the added and the
    /// removed sets, so the operation commutes.
    pub fn merge(&mut self, other: &LinkIndex) {
        for (key, slot) in &other.slots {
            let entry = self.slots.entry(*key).or_default();
            entry.added.extend(slot.added.iter().copied());
            entry.removed.extend(slot.removed.iter().copied());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(seed: u8) -> RecordId {
        RecordId::from_bytes([seed; 32])
    }

    #[test]
    fn add_and_query() {
        let mut index = LinkIndex::new();
        index.add(id(1), LinkType::CallToActionToCommitments, id(2));
        index.add(id(1), LinkType::CallToActionToCommitments, id(3));

        let targets = index.links_from(&id(1), LinkType::CallToActionToCommitments);
        assert_eq!(targets.len(), 2);
        assert!(index.has_link(&id(1), LinkType::CallToActionToCommitments, &id(2)));

        // Different link type from same base is a different slot
        assert!(index
            .links_from(&id(1), LinkType::CallToActionToSatisfactions)
            .is_empty());
    }

    #[test]
    fn removal_is_permanent() {
        let mut index = LinkIndex::new();
        index.add(id(1), LinkType::OpenCallsToAction, id(2));
        index.remove(id(1), LinkType::OpenCallsToAction, id(2));
        // Re-adding after removal does not resurrect the link
        index.add(id(1), LinkType::OpenCallsToAction, id(2));

        assert!(index.links_from(&id(1), LinkType::OpenCallsToAction).is_empty());
    }

    #[test]
    fn merge_is_order_independent() {
        let mut left = LinkIndex::new();
        left.add(id(1), LinkType::CallToActionToCommitments, id(2));

        let mut right = LinkIndex::new();
        right.add(id(1), LinkType::CallToActionToCommitments, id(3));
        right.remove(id(1), LinkType::CallToActionToCommitments, id(2));

        let mut ab = left.clone();
        ab.merge(&right);
        let mut ba = right.clone();
        ba.merge(&left);

        assert_eq!(ab, ba);
        assert_eq!(
            ab.links_from(&id(1), LinkType::CallToActionToCommitments),
            vec![id(3)]
        );
    }
}

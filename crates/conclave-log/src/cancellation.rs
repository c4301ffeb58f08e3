//! The cancellation contract consumed by the coordination core.
//!
//! Cancellations are owned by a collaborating subsystem but travel on the
//! same log, with the same eventual-consistency delay as everything else.
//! The core consumes exactly two queries from them, defined here.
//!
//! Monotonicity: once a cancellation for a commitment is locally
//! replicated, every subsequent local computation treats that commitment
//! as cancelled. A cancellation that exists elsewhere but has not
//! replicated here yet is simply not observed — tolerating that window is
//! the consensus layer's job, not an error.

use std::collections::BTreeSet;

use conclave_record::RecordId;

use crate::links::LinkType;
use crate::record::Record;
use crate::replica::Replica;

impl Replica {
    /// Whether a cancellation for `commitment` has been observed locally.
    pub fn is_cancelled(&self, commitment: &RecordId) -> bool {
        !self
            .links_from(commitment, LinkType::CommitmentToCancellations)
            .is_empty()
    }

    /// All locally-observed cancellations for `commitment`.
    pub fn cancellations_for(&self, commitment: &RecordId) -> Vec<&Record> {
        self.links_from(commitment, LinkType::CommitmentToCancellations)
            .into_iter()
            .filter_map(|id| self.get(&id))
            .filter(|r| r.as_cancellation().is_some())
            .collect()
    }

    /// The observed-cancelled subset of `commitments`.
    pub fn cancelled_subset<'a>(
        &self,
        commitments: impl IntoIterator<Item = &'a RecordId>,
    ) -> BTreeSet<RecordId> {
        commitments
            .into_iter()
            .filter(|c| self.is_cancelled(c))
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_record::{Cancellation, Commitment, Payload, PeerId, Timestamp};

    #[test]
    fn cancellation_is_observed_through_links() {
        let mut replica = Replica::new();
        let author = PeerId::from_public_key(b"a");
        let call = RecordId::from_bytes([1u8; 32]);

        let commitment = replica.append_at(
            author,
            Timestamp(1),
            Payload::Commitment(Commitment::new(call, 0, 1).unwrap()),
        );
        assert!(!replica.is_cancelled(&commitment));
        assert!(replica.cancellations_for(&commitment).is_empty());

        let cancellation = replica.append_at(
            author,
            Timestamp(2),
            Payload::Cancellation(Cancellation::new(commitment, "can't make it").unwrap()),
        );
        replica.add_link(
            commitment,
            LinkType::CommitmentToCancellations,
            cancellation,
        );

        assert!(replica.is_cancelled(&commitment));
        assert_eq!(replica.cancellations_for(&commitment).len(), 1);
    }

    #[test]
    fn cancelled_subset_filters() {
        let mut replica = Replica::new();
        let author = PeerId::from_public_key(b"a");
        let call = RecordId::from_bytes([1u8; 32]);

        let kept = replica.append_at(
            author,
            Timestamp(1),
            Payload::Commitment(Commitment::new(call, 0, 1).unwrap()),
        );
        let dropped = replica.append_at(
            author,
            Timestamp(2),
            Payload::Commitment(Commitment::new(call, 0, 1).unwrap()),
        );
        let cancellation = replica.append_at(
            author,
            Timestamp(3),
            Payload::Cancellation(Cancellation::new(dropped, "mistake").unwrap()),
        );
        replica.add_link(dropped, LinkType::CommitmentToCancellations, cancellation);

        let cancelled = replica.cancelled_subset([&kept, &dropped]);
        assert!(cancelled.contains(&dropped));
        assert!(!cancelled.contains(&kept));
    }
}

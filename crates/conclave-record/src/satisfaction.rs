//! Satisfactions: attestations that a need's threshold is met.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::RecordId;

/// A peer's attestation that the listed uncancelled commitments
/// collectively meet one need's threshold.
///
/// Permanent testimony: a satisfaction is never deleted or edited, even
/// when a listed commitment is later cancelled. Whether a need *currently*
/// displays as satisfied is always recomputed at read time against the
/// live cancellation set; a satisfaction whose reference set includes a
/// cancelled commitment is *stale*, not invalid.
///
/// Domain rules — the need index existing, the commitments targeting the
/// same need, the threshold actually being met — are checked by the
/// consensus layer before submission, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satisfaction {
    pub call_to_action: RecordId,
    pub need_index: u32,
    pub commitments: BTreeSet<RecordId>,
}

impl Satisfaction {
    /// Create a satisfaction attestation.
    pub fn new(
        call_to_action: RecordId,
        need_index: u32,
        commitments: impl IntoIterator<Item = RecordId>,
    ) -> Self {
        Self {
            call_to_action,
            need_index,
            commitments: commitments.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_set_deduplicates() {
        let call = RecordId::from_bytes([1u8; 32]);
        let c = RecordId::from_bytes([2u8; 32]);
        let s = Satisfaction::new(call, 0, [c, c]);
        assert_eq!(s.commitments.len(), 1);
    }
}

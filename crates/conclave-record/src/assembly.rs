//! Assemblies: the terminal proof that a call to action succeeded.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::RecordId;

/// A peer's attestation that all required needs of a call to action are
/// simultaneously satisfied by the referenced satisfactions, one per
/// required need.
///
/// Terminal entity: once any assembly exists for a call to action, the
/// call has succeeded. Peers observe completeness independently and
/// without coordination, so multiple assemblies for the same call are an
/// expected, tolerated outcome — never deduplicated, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assembly {
    pub call_to_action: RecordId,
    pub satisfactions: BTreeSet<RecordId>,
}

impl Assembly {
    /// Create an assembly attestation.
    pub fn new(
        call_to_action: RecordId,
        satisfactions: impl IntoIterator<Item = RecordId>,
    ) -> Self {
        Self {
            call_to_action,
            satisfactions: satisfactions.into_iter().collect(),
        }
    }
}

//! Convergent Collective-Commitment Consensus
//!
//! Conclave doesn't serialize submissions or elect a coordinator. Every
//! peer **re-derives** the state of a call to action from whatever subset
//! of the record log has replicated locally, and all peers converge to
//! the same answer once replication catches up.
//!
//! # Core Insight
//!
//! A need's satisfaction is not a flag someone sets - it's a **property**
//! of the live record set. A need doesn't "get marked" satisfied, it
//! **is** satisfied whenever at least one recorded satisfaction still
//! references only uncancelled commitments.
//!
//! # Derivation, not mutation
//!
//! 1. Pledges, cancellations, and attestations append records
//! 2. Each peer re-evaluates needs against its local replica
//! 3. Cancellations retract contributions and stale-out satisfactions
//! 4. All peers converge without locks or global ordering
//!
//! Out-of-order, duplicate, and concurrent writes are all individually
//! valid; disagreement between peers is a bounded window, not an error.
//!
//! # States per need
//!
//! `Unmet → Eligible → Satisfied → (stale) → Satisfied again`
//!
//! Only satisfactions and assemblies are recorded; `Unmet`, `Eligible`,
//! and staleness are derived at read time and never written back.

mod assembly;
mod error;
mod evaluation;
mod satisfaction;

pub use assembly::{is_complete, validate_assembly};
pub use error::{AuthorizationError, IncompleteAssemblyError, InvalidSatisfactionError};
pub use evaluation::{evaluate, evaluate_all, NeedStatus};
pub use satisfaction::{
    authorize_satisfaction, is_stale, need_state, need_states, validate_satisfaction, NeedState,
};

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_record::Need;
    use std::collections::BTreeSet;

    #[test]
    fn optional_needs_never_block() {
        let need = Need::new("optional garnish", 0, None, false).unwrap();
        let status = evaluate(0, &need, &[], &BTreeSet::new());
        assert!(status.eligible);
        assert_eq!(status.contributed, 0);
    }
}

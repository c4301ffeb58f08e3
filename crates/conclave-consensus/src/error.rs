//! Domain-rule violations, rejected locally before anything reaches the log.

use conclave_record::{PeerId, RecordId};
use thiserror::Error;

/// A satisfaction attestation that must not be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSatisfactionError {
    /// The need index does not exist in the call to action.
    #[error("need index {need_index} is out of range for a call with {needs_len} needs")]
    NeedIndexOutOfRange { need_index: u32, needs_len: usize },

    /// A referenced commitment could not be resolved locally. The
    /// attesting peer picks commitments from its own replica, so this
    /// means the reference is bogus, not merely unreplicated.
    #[error("referenced commitment {commitment} is not locally replicated")]
    UnresolvedCommitment { commitment: RecordId },

    /// A referenced commitment belongs to a different call to action.
    #[error("commitment {commitment} targets call {actual}, not {expected}")]
    WrongCallToAction {
        commitment: RecordId,
        expected: RecordId,
        actual: RecordId,
    },

    /// A referenced commitment pledges toward a different need.
    #[error("commitment {commitment} targets need {actual}, not need {expected}")]
    WrongNeed {
        commitment: RecordId,
        expected: u32,
        actual: u32,
    },

    /// A referenced commitment is already cancelled.
    #[error("commitment {commitment} is cancelled")]
    CancelledCommitment { commitment: RecordId },

    /// The referenced commitments do not reach the need's threshold.
    #[error("referenced commitments contribute {contributed}, below the required {min_necessary}")]
    BelowThreshold {
        contributed: u32,
        min_necessary: u32,
    },
}

/// An assembly attestation that must not be submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IncompleteAssemblyError {
    /// A referenced satisfaction could not be resolved locally.
    #[error("referenced satisfaction {satisfaction} is not locally replicated")]
    UnresolvedSatisfaction { satisfaction: RecordId },

    /// A referenced satisfaction belongs to a different call to action.
    #[error("satisfaction {satisfaction} targets a different call to action")]
    WrongCallToAction { satisfaction: RecordId },

    /// A referenced satisfaction claims a need index the call does not have.
    #[error("satisfaction {satisfaction} claims out-of-range need index {need_index}")]
    NeedIndexOutOfRange {
        satisfaction: RecordId,
        need_index: u32,
    },

    /// Two referenced satisfactions claim the same need.
    #[error("need index {need_index} is referenced more than once")]
    DuplicateNeed { need_index: u32 },

    /// A required need has no referenced satisfaction.
    #[error("required need {need_index} has no referenced satisfaction")]
    MissingNeed { need_index: u32 },

    /// A referenced satisfaction is stale: one of its commitments is
    /// cancelled.
    #[error("satisfaction {satisfaction} for need {need_index} is stale")]
    StaleSatisfaction {
        satisfaction: RecordId,
        need_index: u32,
    },
}

/// An admin-gated attestation by a peer without standing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// The need requires admin approval and the peer is neither the
    /// call's author nor a listed admin.
    #[error("peer {peer} may not attest need {need_index}: admin approval required")]
    AdminRequired { peer: PeerId, need_index: u32 },
}

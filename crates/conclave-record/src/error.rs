//! Construction-time validation errors.

use thiserror::Error;

/// A locally-checkable invariant was violated while constructing a record.
///
/// These are resolved locally and never reach the replicated log: an
/// invalid record is simply never written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A call to action needs a non-empty title.
    #[error("call to action title must not be empty")]
    EmptyTitle,

    /// A need's description must not be empty.
    #[error("need {index}: description must not be empty")]
    EmptyNeedDescription { index: usize },

    /// `max_possible`, when set, must be at least `min_necessary`.
    #[error("need {index}: max_possible {max_possible} is below min_necessary {min_necessary}")]
    MaxBelowMin {
        index: usize,
        min_necessary: u32,
        max_possible: u32,
    },

    /// A commitment must pledge at least 1.
    #[error("commitment amount must be at least 1")]
    ZeroAmount,

    /// A cancellation needs a non-empty reason.
    #[error("cancellation reason must not be empty")]
    EmptyReason,
}

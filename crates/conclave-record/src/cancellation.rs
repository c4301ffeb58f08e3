//! Cancellations: retractions of commitments.

use serde::{Deserialize, Serialize};

use crate::{RecordId, ValidationError};

/// A retraction of a specific commitment.
///
/// This record type is owned by the cancellation subsystem; the
/// coordination core consumes exactly one contract from it: a commitment
/// with an observed cancellation is excluded from all contribution sums
/// and from all new satisfaction eligibility checks. Cancellation is
/// monotonic per commitment — once observed cancelled, always cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub commitment: RecordId,
    pub reason: String,
}

impl Cancellation {
    /// Create a cancellation, validating its local invariants.
    pub fn new(
        commitment: RecordId,
        reason: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ValidationError::EmptyReason);
        }
        Ok(Self { commitment, reason })
    }

    /// Check local invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.reason.trim().is_empty() {
            return Err(ValidationError::EmptyReason);
        }
        Ok(())
    }
}

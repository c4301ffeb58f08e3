//! Commitments: pledges of an amount toward one need.

use serde::{Deserialize, Serialize};

use crate::{RecordId, ValidationError};

/// A peer's pledge of `amount` toward one need of a call to action.
///
/// Created once, never mutated or deleted. The only way to retract a
/// commitment is a [`Cancellation`](crate::Cancellation) referencing it.
///
/// Whether `need_index` actually exists in the referenced call to action
/// is not checked here: the call may not be locally replicated yet when
/// this commitment arrives. The consensus layer checks it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub call_to_action: RecordId,
    pub need_index: u32,
    /// Pledged amount, at least 1.
    pub amount: u32,
    pub comment: Option<String>,
}

impl Commitment {
    /// Create a commitment, validating its local invariants.
    pub fn new(
        call_to_action: RecordId,
        need_index: u32,
        amount: u32,
    ) -> Result<Self, ValidationError> {
        if amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(Self {
            call_to_action,
            need_index,
            amount,
            comment: None,
        })
    }

    /// Attach a comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Check local invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.amount == 0 {
            return Err(ValidationError::ZeroAmount);
        }
        Ok(())
    }
}

//! Calls to action and their embedded needs.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{PeerId, RecordId, Timestamp, ValidationError};

/// One quota within a call to action.
///
/// Needs are embedded, not standalone records: a need's identity is its
/// index in the owning call to action's `needs` list. Indices are never
/// reused or reordered after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Need {
    pub description: String,
    /// Minimum contribution for the need to count as met. Zero means the
    /// need is advisory and never blocks assembly formation.
    pub min_necessary: u32,
    /// Optional cap on useful contributions. Display-only above
    /// `min_necessary`; over-commitment is tolerated.
    pub max_possible: Option<u32>,
    /// When set, only the call's author or a listed admin may attest
    /// satisfaction of this need.
    pub requires_admin_approval: bool,
}

impl Need {
    /// Create a need, validating its local invariants.
    pub fn new(
        description: impl Into<String>,
        min_necessary: u32,
        max_possible: Option<u32>,
        requires_admin_approval: bool,
    ) -> Result<Self, ValidationError> {
        let need = Self {
            description: description.into(),
            min_necessary,
            max_possible,
            requires_admin_approval,
        };
        need.validate(0)?;
        Ok(need)
    }

    /// Check local invariants, reporting `index` as the need's position.
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::EmptyNeedDescription { index });
        }
        if let Some(max) = self.max_possible {
            if max < self.min_necessary {
                return Err(ValidationError::MaxBelowMin {
                    index,
                    min_necessary: self.min_necessary,
                    max_possible: max,
                });
            }
        }
        Ok(())
    }

    /// Whether this need must be satisfied before an assembly can form.
    pub fn is_required(&self) -> bool {
        self.min_necessary > 0
    }
}

/// A declaration of needs awaiting collective commitment.
///
/// Immutable once created; an "update" is a new record superseding this
/// one by reference, and must keep every existing need at its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallToAction {
    /// Peers allowed to attest admin-gated needs, in addition to the author.
    pub admins: BTreeSet<PeerId>,
    /// Optional parent call, for nested calls to action.
    pub parent_call_to_action: Option<RecordId>,
    /// Advisory expiry; expired calls stop surfacing as open but nothing
    /// already recorded is invalidated.
    pub expiration_time: Option<Timestamp>,
    pub title: String,
    /// Positionally addressed; a need's index is its identity.
    pub needs: Vec<Need>,
}

impl CallToAction {
    /// Create a call to action, validating its local invariants.
    pub fn new(
        title: impl Into<String>,
        needs: Vec<Need>,
    ) -> Result<Self, ValidationError> {
        let call = Self {
            admins: BTreeSet::new(),
            parent_call_to_action: None,
            expiration_time: None,
            title: title.into(),
            needs,
        };
        call.validate()?;
        Ok(call)
    }

    /// Add admins to a call under construction.
    pub fn with_admins(mut self, admins: impl IntoIterator<Item = PeerId>) -> Self {
        self.admins.extend(admins);
        self
    }

    /// Set the parent call to action.
    pub fn with_parent(mut self, parent: RecordId) -> Self {
        self.parent_call_to_action = Some(parent);
        self
    }

    /// Set the advisory expiration time.
    pub fn with_expiration(mut self, expiration: Timestamp) -> Self {
        self.expiration_time = Some(expiration);
        self
    }

    /// Check local invariants.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        for (index, need) in self.needs.iter().enumerate() {
            need.validate(index)?;
        }
        Ok(())
    }

    /// Whether this call is past its advisory expiry at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        match self.expiration_time {
            Some(expiry) => now > expiry,
            None => false,
        }
    }

    /// Whether `peer` may attest satisfaction of an admin-gated need,
    /// given the call's author.
    pub fn is_admin(&self, peer: &PeerId, author: &PeerId) -> bool {
        peer == author || self.admins.contains(peer)
    }
}

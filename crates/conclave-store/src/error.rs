//! Error types for conclave-store.

use conclave_record::RecordId;
use thiserror::Error;

/// Result type for conclave-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A record failed construction validation.
    #[error("validation failed: {0}")]
    Validation(#[from] conclave_record::ValidationError),

    /// A satisfaction broke a domain rule and was not submitted.
    #[error("invalid satisfaction: {0}")]
    InvalidSatisfaction(#[from] conclave_consensus::InvalidSatisfactionError),

    /// An assembly broke a domain rule and was not submitted.
    #[error("incomplete assembly: {0}")]
    IncompleteAssembly(#[from] conclave_consensus::IncompleteAssemblyError),

    /// The acting peer lacks standing for an admin-gated attestation.
    #[error("not authorized: {0}")]
    Authorization(#[from] conclave_consensus::AuthorizationError),

    /// A record the operation depends on has no local replica yet.
    /// Not the same as "does not exist" - retry after replication.
    #[error("record {0} is not locally replicated yet")]
    NotReplicated(RecordId),

    /// An update would break positional need identity.
    #[error("update removes needs: {updated} needs, original has {original}")]
    NeedsRemoved { original: usize, updated: usize },
}

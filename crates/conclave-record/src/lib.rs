//! Conclave record model.
//!
//! Every unit of protocol state is an immutable, content-identified record:
//! a call to action declaring positional needs, a commitment pledging an
//! amount toward one need, a cancellation retracting a commitment, a
//! satisfaction attesting that a need's threshold is met, and an assembly
//! attesting that every required need is satisfied at once.
//!
//! # Identity
//!
//! Records are identified by a 32-byte Blake3 hash derived from their
//! content at append time. "Updating" a record means appending a new record
//! that supersedes the old one by reference; nothing is ever mutated in
//! place.
//!
//! # Validation
//!
//! Construction functions validate locally-checkable invariants only
//! (non-empty titles, index-free bounds, `min_necessary <= max_possible`).
//! Cross-record consistency — "does this commitment's need index exist" —
//! is deliberately deferred to the consensus layer, because the referenced
//! call to action may not yet be locally replicated when a commitment
//! arrives.

mod assembly;
mod call_to_action;
mod cancellation;
mod commitment;
mod error;
mod id;
mod satisfaction;

pub use assembly::Assembly;
pub use call_to_action::{CallToAction, Need};
pub use cancellation::Cancellation;
pub use commitment::Commitment;
pub use error::ValidationError;
pub use id::{PeerId, RecordId, Timestamp};
pub use satisfaction::Satisfaction;

use serde::{Deserialize, Serialize};

/// The payload of one record in the replicated log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    CallToAction(CallToAction),
    Commitment(Commitment),
    Cancellation(Cancellation),
    Satisfaction(Satisfaction),
    Assembly(Assembly),
}

impl Payload {
    /// Short type name, used for log lines and link tags.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::CallToAction(_) => "call_to_action",
            Payload::Commitment(_) => "commitment",
            Payload::Cancellation(_) => "cancellation",
            Payload::Satisfaction(_) => "satisfaction",
            Payload::Assembly(_) => "assembly",
        }
    }
}

//! The operations surface one peer uses against its local replica.
//!
//! Every create operation validates and authorizes locally, then appends
//! the record and its index links in one step; an operation that fails
//! never touches the log. Every read answers from the local replica
//! immediately - an absent record means "not replicated here yet", which
//! callers must treat as pending, not as proof of absence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use conclave_consensus::{authorize_satisfaction, validate_assembly, validate_satisfaction};
use conclave_log::{my_calls_base, open_calls_base, LinkType, Record, Replica};
use conclave_record::{
    Assembly, CallToAction, Cancellation, Commitment, Payload, PeerId, RecordId, Satisfaction,
    Timestamp,
};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Error, Result};

/// Handle to a peer's local replica, shared between the client, the
/// store, and the refresh loop.
pub type SharedReplica = Arc<RwLock<Replica>>;

/// One peer's client onto the replicated log.
///
/// Peer identity is explicit state here, passed into every authorization
/// check - there is no ambient "current peer" context anywhere.
#[derive(Debug, Clone)]
pub struct Client {
    peer: PeerId,
    replica: SharedReplica,
}

impl Client {
    /// Create a client for `peer` over its local replica.
    pub fn new(peer: PeerId, replica: SharedReplica) -> Self {
        Self { peer, replica }
    }

    /// The acting peer's identity.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    /// The underlying replica handle.
    pub fn replica(&self) -> SharedReplica {
        Arc::clone(&self.replica)
    }

    /// Pull everything another peer's replica holds into ours.
    ///
    /// Models one replication round; returns the number of new records.
    pub async fn sync_from(&self, other: &Client) -> usize {
        let snapshot = other.replica.read().await.clone();
        let mut mine = self.replica.write().await;
        let new_records = mine.merge(&snapshot);
        if new_records > 0 {
            debug!(peer = %self.peer, new_records, "merged remote records");
        }
        new_records
    }

    /* Calls to action */

    /// Publish a call to action. Links it into the open-calls index, the
    /// author's my-calls index, and its parent's children.
    pub async fn create_call_to_action(&self, call: CallToAction) -> Result<RecordId> {
        call.validate()?;
        let parent = call.parent_call_to_action;

        let mut replica = self.replica.write().await;
        let id = replica.append(self.peer, Payload::CallToAction(call));
        replica.add_link(open_calls_base(), LinkType::OpenCallsToAction, id);
        replica.add_link(my_calls_base(&self.peer), LinkType::MyCallsToAction, id);
        if let Some(parent) = parent {
            replica.add_link(parent, LinkType::CallToActionToCallToActions, id);
        }
        debug!(call = %id, "created call to action");
        Ok(id)
    }

    /// Supersede a call to action with a new version.
    ///
    /// Needs are addressed positionally, so an update may edit needs in
    /// place or append new ones, but never remove or reorder them.
    pub async fn update_call_to_action(
        &self,
        call: RecordId,
        updated: CallToAction,
    ) -> Result<RecordId> {
        updated.validate()?;

        let mut replica = self.replica.write().await;
        let (version_id, current) =
            latest_version(&replica, call).ok_or(Error::NotReplicated(call))?;
        if updated.needs.len() < current.needs.len() {
            return Err(Error::NeedsRemoved {
                original: current.needs.len(),
                updated: updated.needs.len(),
            });
        }

        let id = replica.append(self.peer, Payload::CallToAction(updated));
        replica.add_link(version_id, LinkType::CallToActionToUpdates, id);
        debug!(call = %call, version = %id, "updated call to action");
        Ok(id)
    }

    /// The latest version of a call to action, or `None` when the call
    /// has not replicated here yet.
    pub async fn get_call_to_action(&self, call: RecordId) -> Option<(RecordId, CallToAction)> {
        let replica = self.replica.read().await;
        latest_version(&replica, call)
    }

    /// The record envelope of a call to action's original version.
    pub async fn get_call_to_action_record(&self, call: RecordId) -> Option<Record> {
        let replica = self.replica.read().await;
        replica.get(&call).cloned()
    }

    /// Stop surfacing a call as open. The record itself stays.
    pub async fn close_call_to_action(&self, call: RecordId) -> Result<()> {
        let mut replica = self.replica.write().await;
        if !replica.contains(&call) {
            return Err(Error::NotReplicated(call));
        }
        replica.remove_link(open_calls_base(), LinkType::OpenCallsToAction, call);
        debug!(call = %call, "closed call to action");
        Ok(())
    }

    /// Retract a call from the open index and from this peer's own
    /// my-calls index. Append-only log: dependent records are untouched
    /// and other peers' indexes are theirs to maintain.
    pub async fn delete_call_to_action(&self, call: RecordId) -> Result<()> {
        let mut replica = self.replica.write().await;
        if !replica.contains(&call) {
            return Err(Error::NotReplicated(call));
        }
        replica.remove_link(open_calls_base(), LinkType::OpenCallsToAction, call);
        replica.remove_link(my_calls_base(&self.peer), LinkType::MyCallsToAction, call);
        debug!(call = %call, "deleted call to action");
        Ok(())
    }

    /// Calls currently accepting commitments, excluding calls past their
    /// advisory expiry at `now`.
    pub async fn get_open_calls_to_action(&self, now: Timestamp) -> Vec<RecordId> {
        let replica = self.replica.read().await;
        replica
            .links_from(&open_calls_base(), LinkType::OpenCallsToAction)
            .into_iter()
            .filter(|id| match latest_version(&replica, *id) {
                Some((_, call)) => !call.is_expired_at(now),
                None => false,
            })
            .collect()
    }

    /// Calls this peer authored or contributed to.
    pub async fn get_my_calls_to_action(&self) -> Vec<RecordId> {
        let replica = self.replica.read().await;
        replica.links_from(&my_calls_base(&self.peer), LinkType::MyCallsToAction)
    }

    /// Child calls of a parent call to action.
    pub async fn get_calls_to_action_for_call_to_action(
        &self,
        parent: RecordId,
    ) -> Vec<RecordId> {
        let replica = self.replica.read().await;
        replica.links_from(&parent, LinkType::CallToActionToCallToActions)
    }

    /* Commitments */

    /// Pledge toward one need. The referenced call may not be locally
    /// replicated yet - that is fine, evaluation picks the pledge up
    /// once both sides have replicated.
    pub async fn create_commitment(&self, commitment: Commitment) -> Result<RecordId> {
        commitment.validate()?;
        let call = commitment.call_to_action;

        let mut replica = self.replica.write().await;
        let id = replica.append(self.peer, Payload::Commitment(commitment));
        replica.add_link(call, LinkType::CallToActionToCommitments, id);
        replica.add_link(my_calls_base(&self.peer), LinkType::MyCallsToAction, call);
        debug!(call = %call, commitment = %id, "created commitment");
        Ok(id)
    }

    /// A single commitment, or `None` when not replicated here yet.
    pub async fn get_commitment(&self, id: RecordId) -> Option<(RecordId, Commitment)> {
        let replica = self.replica.read().await;
        let record = replica.get(&id)?;
        record.as_commitment().cloned().map(|c| (id, c))
    }

    /// All locally-known commitments toward a call, resolved.
    pub async fn get_commitments_for_call_to_action(
        &self,
        call: RecordId,
    ) -> Vec<(RecordId, Commitment)> {
        let replica = self.replica.read().await;
        resolve_commitments(&replica, call)
    }

    /* Cancellations */

    /// Retract a commitment. The commitment record stays; all derived
    /// computation excludes it from the moment this lands locally.
    pub async fn cancel_commitment(
        &self,
        commitment: RecordId,
        reason: impl Into<String>,
    ) -> Result<RecordId> {
        let cancellation = Cancellation::new(commitment, reason)?;

        let mut replica = self.replica.write().await;
        if !replica.contains(&commitment) {
            return Err(Error::NotReplicated(commitment));
        }
        let id = replica.append(self.peer, Payload::Cancellation(cancellation));
        replica.add_link(commitment, LinkType::CommitmentToCancellations, id);
        debug!(commitment = %commitment, cancellation = %id, "cancelled commitment");
        Ok(id)
    }

    /// Whether a cancellation for this commitment has replicated here.
    pub async fn is_cancelled(&self, commitment: RecordId) -> bool {
        self.replica.read().await.is_cancelled(&commitment)
    }

    /// All locally-observed cancellations for a commitment.
    pub async fn cancellations_for(
        &self,
        commitment: RecordId,
    ) -> Vec<(RecordId, Cancellation)> {
        let replica = self.replica.read().await;
        replica
            .cancellations_for(&commitment)
            .into_iter()
            .filter_map(|r| r.as_cancellation().cloned().map(|c| (r.id, c)))
            .collect()
    }

    /* Satisfactions */

    /// Attest that a need's threshold is met by the referenced
    /// commitments. Validated and authorized locally; a rejected
    /// attestation never reaches the log.
    pub async fn create_satisfaction(&self, satisfaction: Satisfaction) -> Result<RecordId> {
        let mut replica = self.replica.write().await;

        let author = replica
            .get(&satisfaction.call_to_action)
            .map(|r| r.author)
            .ok_or(Error::NotReplicated(satisfaction.call_to_action))?;
        let (_, call) = latest_version(&replica, satisfaction.call_to_action)
            .ok_or(Error::NotReplicated(satisfaction.call_to_action))?;

        let resolved: BTreeMap<RecordId, Commitment> = satisfaction
            .commitments
            .iter()
            .filter_map(|id| {
                replica
                    .get(id)
                    .and_then(|r| r.as_commitment().cloned())
                    .map(|c| (*id, c))
            })
            .collect();
        let cancelled = replica.cancelled_subset(satisfaction.commitments.iter());

        validate_satisfaction(&satisfaction, &call, &resolved, &cancelled)?;
        authorize_satisfaction(&self.peer, &author, &call, satisfaction.need_index)?;

        let call_id = satisfaction.call_to_action;
        let commitment_ids: Vec<RecordId> = satisfaction.commitments.iter().copied().collect();
        let id = replica.append(self.peer, Payload::Satisfaction(satisfaction));
        replica.add_link(call_id, LinkType::CallToActionToSatisfactions, id);
        for commitment in commitment_ids {
            replica.add_link(commitment, LinkType::CommitmentToSatisfactions, id);
        }
        debug!(call = %call_id, satisfaction = %id, "created satisfaction");
        Ok(id)
    }

    /// All locally-known satisfactions for a call, resolved.
    pub async fn get_satisfactions_for_call_to_action(
        &self,
        call: RecordId,
    ) -> Vec<(RecordId, Satisfaction)> {
        let replica = self.replica.read().await;
        resolve_satisfactions(&replica, call)
    }

    /// Satisfactions that reference a given commitment.
    pub async fn get_satisfactions_for_commitment(
        &self,
        commitment: RecordId,
    ) -> Vec<(RecordId, Satisfaction)> {
        let replica = self.replica.read().await;
        replica
            .links_from(&commitment, LinkType::CommitmentToSatisfactions)
            .into_iter()
            .filter_map(|id| {
                replica
                    .get(&id)
                    .and_then(|r| r.as_satisfaction().cloned())
                    .map(|s| (id, s))
            })
            .collect()
    }

    /* Assemblies */

    /// Attest that the whole call succeeded: one non-stale satisfaction
    /// per required need. Duplicate assemblies from racing peers are
    /// expected and fine; an incomplete one is rejected locally.
    pub async fn create_assembly(&self, assembly: Assembly) -> Result<RecordId> {
        let mut replica = self.replica.write().await;

        let (_, call) = latest_version(&replica, assembly.call_to_action)
            .ok_or(Error::NotReplicated(assembly.call_to_action))?;

        let resolved: BTreeMap<RecordId, Satisfaction> = assembly
            .satisfactions
            .iter()
            .filter_map(|id| {
                replica
                    .get(id)
                    .and_then(|r| r.as_satisfaction().cloned())
                    .map(|s| (*id, s))
            })
            .collect();
        let referenced_commitments: BTreeSet<RecordId> = resolved
            .values()
            .flat_map(|s| s.commitments.iter().copied())
            .collect();
        let cancelled = replica.cancelled_subset(referenced_commitments.iter());

        validate_assembly(&assembly, &call, &resolved, &cancelled)?;

        let call_id = assembly.call_to_action;
        let satisfaction_ids: Vec<RecordId> = assembly.satisfactions.iter().copied().collect();
        let id = replica.append(self.peer, Payload::Assembly(assembly));
        replica.add_link(call_id, LinkType::CallToActionToAssemblies, id);
        for satisfaction in satisfaction_ids {
            replica.add_link(satisfaction, LinkType::SatisfactionToAssemblies, id);
        }
        debug!(call = %call_id, assembly = %id, "created assembly");
        Ok(id)
    }

    /// All locally-known assemblies for a call.
    pub async fn get_assemblies_for_call_to_action(
        &self,
        call: RecordId,
    ) -> Vec<(RecordId, Assembly)> {
        let replica = self.replica.read().await;
        replica
            .links_from(&call, LinkType::CallToActionToAssemblies)
            .into_iter()
            .filter_map(|id| {
                replica
                    .get(&id)
                    .and_then(|r| r.as_assembly().cloned())
                    .map(|a| (id, a))
            })
            .collect()
    }

    /// Assemblies that reference a given satisfaction.
    pub async fn get_assemblies_for_satisfaction(
        &self,
        satisfaction: RecordId,
    ) -> Vec<(RecordId, Assembly)> {
        let replica = self.replica.read().await;
        replica
            .links_from(&satisfaction, LinkType::SatisfactionToAssemblies)
            .into_iter()
            .filter_map(|id| {
                replica
                    .get(&id)
                    .and_then(|r| r.as_assembly().cloned())
                    .map(|a| (id, a))
            })
            .collect()
    }
}

/// Walk update links to the newest version of a call to action.
///
/// Updates chain forward from each version; among concurrent updates the
/// newest (timestamp, id) wins deterministically on every replica.
pub(crate) fn latest_version(
    replica: &Replica,
    call: RecordId,
) -> Option<(RecordId, CallToAction)> {
    let mut current = call;
    let mut visited = BTreeSet::new();

    while visited.insert(current) {
        let next = replica
            .links_from(&current, LinkType::CallToActionToUpdates)
            .into_iter()
            .filter_map(|id| replica.get(&id))
            .filter(|r| r.as_call_to_action().is_some())
            .max_by_key(|r| (r.timestamp, r.id));
        match next {
            Some(record) => current = record.id,
            None => break,
        }
    }

    let record = replica.get(&current)?;
    record.as_call_to_action().cloned().map(|c| (current, c))
}

/// Resolve the live commitment set of a call from the link index.
pub(crate) fn resolve_commitments(
    replica: &Replica,
    call: RecordId,
) -> Vec<(RecordId, Commitment)> {
    replica
        .links_from(&call, LinkType::CallToActionToCommitments)
        .into_iter()
        .filter_map(|id| {
            replica
                .get(&id)
                .and_then(|r| r.as_commitment().cloned())
                .map(|c| (id, c))
        })
        .collect()
}

/// Resolve the satisfaction set of a call from the link index.
pub(crate) fn resolve_satisfactions(
    replica: &Replica,
    call: RecordId,
) -> Vec<(RecordId, Satisfaction)> {
    replica
        .links_from(&call, LinkType::CallToActionToSatisfactions)
        .into_iter()
        .filter_map(|id| {
            replica
                .get(&id)
                .and_then(|r| r.as_satisfaction().cloned())
                .map(|s| (id, s))
        })
        .collect()
}

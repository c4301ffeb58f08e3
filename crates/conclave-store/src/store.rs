//! Derived, convergent read models over the local replica.
//!
//! Every view here is a pure function of the locally-replicated record
//! set at the time of computation. The store caches computed snapshots
//! for one poll interval, recomputes them on the background refresh tick
//! or on explicit invalidation, and never blocks on the network: the
//! best-known answer returns immediately and improves as replication
//! catches up.
//!
//! Convergence: two peers that have merged the same record set compute
//! identical snapshots here, regardless of the order records arrived.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use conclave_consensus::{is_complete, need_states, NeedState, NeedStatus};
use conclave_log::{LinkType, Replica};
use conclave_record::RecordId;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::client::{latest_version, resolve_commitments, resolve_satisfactions, Client};
use crate::config::StoreConfig;

/// How much a derived value can currently be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    /// The record set behind this view has not replicated here yet;
    /// the value is a best-known placeholder, not a confirmed answer.
    Pending,
    /// Computed from a locally-replicated record set. Still subject to
    /// eventual consistency, but confirmed as of this replica.
    Complete,
    /// The view cannot be computed; terminal for this query.
    Error(String),
}

/// A derived value plus the status callers need to distinguish "still
/// replicating" from "confirmed empty".
#[derive(Debug, Clone, PartialEq)]
pub struct Derived<T> {
    pub value: T,
    pub status: ViewStatus,
}

impl<T> Derived<T> {
    fn pending(value: T) -> Self {
        Self {
            value,
            status: ViewStatus::Pending,
        }
    }

    fn complete(value: T) -> Self {
        Self {
            value,
            status: ViewStatus::Complete,
        }
    }

    fn error(value: T, message: impl Into<String>) -> Self {
        Self {
            value,
            status: ViewStatus::Error(message.into()),
        }
    }

    /// Whether the value is confirmed as of the local replica.
    pub fn is_complete(&self) -> bool {
        self.status == ViewStatus::Complete
    }

    /// Map the value, keeping the status.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Derived<U> {
        Derived {
            value: f(self.value),
            status: self.status,
        }
    }
}

/// Everything derived about one call to action, in one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSnapshot {
    /// The call's stable identity (its original record id).
    pub call: RecordId,
    /// The latest version record the needs were read from.
    pub version: RecordId,
    /// Derived state per need, in index order.
    pub states: Vec<NeedState>,
    /// Assemblies recorded for this call.
    pub assemblies: Vec<RecordId>,
    /// Whether the call has succeeded: an assembly exists, or every
    /// required need currently has a non-stale satisfaction.
    pub complete: bool,
}

struct CacheEntry {
    computed_at: Instant,
    snapshot: CallSnapshot,
}

/// The reconciliation layer: a pull-based cache of derived views.
///
/// Owns no authoritative state - everything here is recomputable from
/// the raw record set at any time.
pub struct Store {
    client: Client,
    config: StoreConfig,
    cache: RwLock<BTreeMap<RecordId, CacheEntry>>,
}

impl Store {
    /// Create a store over one peer's client.
    pub fn new(client: Client, config: StoreConfig) -> Self {
        Self {
            client,
            config,
            cache: RwLock::new(BTreeMap::new()),
        }
    }

    /// The underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The store's tuning.
    pub fn config(&self) -> StoreConfig {
        self.config
    }

    /// Needs of the call that currently lack a non-stale satisfaction,
    /// in index order.
    pub async fn unsatisfied_needs(&self, call: RecordId) -> Derived<Vec<NeedState>> {
        self.snapshot(call)
            .await
            .map(|snapshot| match snapshot {
                Some(s) => s
                    .states
                    .into_iter()
                    .filter(|state| !state.is_satisfied())
                    .collect(),
                None => Vec::new(),
            })
    }

    /// Needs of the call witnessed by at least one non-stale
    /// satisfaction, in index order.
    pub async fn satisfied_needs(&self, call: RecordId) -> Derived<Vec<NeedState>> {
        self.snapshot(call)
            .await
            .map(|snapshot| match snapshot {
                Some(s) => s
                    .states
                    .into_iter()
                    .filter(|state| state.is_satisfied())
                    .collect(),
                None => Vec::new(),
            })
    }

    /// Contribution progress of one need.
    pub async fn progress(&self, call: RecordId, need_index: u32) -> Derived<Option<NeedStatus>> {
        let derived = self.snapshot(call).await;
        match derived.value {
            Some(snapshot) => match snapshot.states.into_iter().nth(need_index as usize) {
                Some(state) => Derived {
                    value: Some(state.status().clone()),
                    status: derived.status,
                },
                None => Derived::error(None, format!("need index {} out of range", need_index)),
            },
            None => Derived::pending(None),
        }
    }

    /// Assemblies recorded for the call. Any entry at all means the call
    /// has succeeded; duplicates are expected from racing observers.
    pub async fn assemblies(&self, call: RecordId) -> Derived<Vec<RecordId>> {
        self.snapshot(call)
            .await
            .map(|snapshot| snapshot.map(|s| s.assemblies).unwrap_or_default())
    }

    /// Whether the call has succeeded.
    pub async fn call_complete(&self, call: RecordId) -> Derived<bool> {
        self.snapshot(call)
            .await
            .map(|snapshot| snapshot.map(|s| s.complete).unwrap_or(false))
    }

    /// The full derived snapshot for a call: `None` value while the call
    /// itself has not replicated here (pending, not absent).
    pub async fn snapshot(&self, call: RecordId) -> Derived<Option<CallSnapshot>> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&call) {
                if entry.computed_at.elapsed() < self.config.poll_interval {
                    return Derived::complete(Some(entry.snapshot.clone()));
                }
            }
        }

        let computed = {
            let replica = self.client.replica();
            let replica = replica.read().await;
            derive_snapshot(&replica, call)
        };

        match computed {
            Some(snapshot) => {
                let mut cache = self.cache.write().await;
                cache.insert(
                    call,
                    CacheEntry {
                        computed_at: Instant::now(),
                        snapshot: snapshot.clone(),
                    },
                );
                Derived::complete(Some(snapshot))
            }
            None => Derived::pending(None),
        }
    }

    /// Drop the cached snapshot for a call, forcing the next read to
    /// recompute. Call after a local write.
    pub async fn invalidate(&self, call: RecordId) {
        self.cache.write().await.remove(&call);
    }

    /// Recompute every cached snapshot against the current replica.
    /// Returns how many snapshots changed.
    pub async fn refresh(&self) -> usize {
        let calls: Vec<RecordId> = {
            let cache = self.cache.read().await;
            cache.keys().copied().collect()
        };

        let mut changed = 0;
        for call in calls {
            let computed = {
                let replica = self.client.replica();
                let replica = replica.read().await;
                derive_snapshot(&replica, call)
            };
            let Some(snapshot) = computed else { continue };

            let mut cache = self.cache.write().await;
            let entry = cache.entry(call).or_insert_with(|| CacheEntry {
                computed_at: Instant::now(),
                snapshot: snapshot.clone(),
            });
            if entry.snapshot != snapshot {
                trace!(call = %call, "derived view changed");
                changed += 1;
            }
            entry.snapshot = snapshot;
            entry.computed_at = Instant::now();
        }

        if changed > 0 {
            debug!(changed, "refresh updated derived views");
        }
        changed
    }

    /// Run the refresh loop forever at the configured poll interval.
    /// Spawn this on the runtime; recomputation itself never suspends.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        loop {
            ticker.tick().await;
            self.refresh().await;
        }
    }
}

/// Compute the full derived state of one call from a replica snapshot.
///
/// Pure with respect to the replica: same record set, same snapshot.
fn derive_snapshot(replica: &Replica, call: RecordId) -> Option<CallSnapshot> {
    let (version, payload) = latest_version(replica, call)?;

    let commitments = resolve_commitments(replica, call);
    let satisfactions = resolve_satisfactions(replica, call);
    let cancelled: BTreeSet<RecordId> =
        replica.cancelled_subset(commitments.iter().map(|(id, _)| id));

    let states = need_states(&payload, &commitments, &satisfactions, &cancelled);
    let assemblies: Vec<RecordId> = replica
        .links_from(&call, LinkType::CallToActionToAssemblies)
        .into_iter()
        .filter(|id| replica.get(id).and_then(|r| r.as_assembly()).is_some())
        .collect();

    let complete = !assemblies.is_empty() || is_complete(&payload, &satisfactions, &cancelled);

    Some(CallSnapshot {
        call,
        version,
        states,
        assemblies,
        complete,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use conclave_record::{CallToAction, Commitment, Need, PeerId, Satisfaction};

    fn store(seed: &[u8]) -> Store {
        let replica = Arc::new(RwLock::new(Replica::new()));
        let client = Client::new(PeerId::from_public_key(seed), replica);
        Store::new(client, StoreConfig::fast())
    }

    fn needs(mins: &[u32]) -> Vec<Need> {
        mins.iter()
            .map(|min| Need::new("a need", *min, None, false).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn unknown_call_reads_as_pending_not_empty() {
        let store = store(b"alice");
        let missing = RecordId::from_bytes([9u8; 32]);

        let unsatisfied = store.unsatisfied_needs(missing).await;
        assert_eq!(unsatisfied.status, ViewStatus::Pending);
        assert!(unsatisfied.value.is_empty());

        let progress = store.progress(missing, 0).await;
        assert_eq!(progress.status, ViewStatus::Pending);
        assert_eq!(progress.value, None);
    }

    #[tokio::test]
    async fn snapshot_tracks_pledges_and_satisfactions() {
        let store = store(b"alice");
        let client = store.client().clone();

        let call = client
            .create_call_to_action(CallToAction::new("picnic", needs(&[0, 1, 2])).unwrap())
            .await
            .unwrap();

        let unsatisfied = store.unsatisfied_needs(call).await;
        assert!(unsatisfied.is_complete());
        assert_eq!(unsatisfied.value.len(), 3);

        let pledge = client
            .create_commitment(Commitment::new(call, 1, 1).unwrap())
            .await
            .unwrap();
        client
            .create_satisfaction(Satisfaction::new(call, 1, [pledge]))
            .await
            .unwrap();
        store.invalidate(call).await;

        let satisfied = store.satisfied_needs(call).await;
        assert_eq!(satisfied.value.len(), 1);
        assert_eq!(satisfied.value[0].status().need_index, 1);

        let progress = store.progress(call, 1).await;
        assert_eq!(progress.value.unwrap().contributed, 1);

        let out_of_range = store.progress(call, 9).await;
        assert!(matches!(out_of_range.status, ViewStatus::Error(_)));
    }

    #[tokio::test]
    async fn refresh_picks_up_new_records_without_invalidation() {
        let store = store(b"alice");
        let client = store.client().clone();

        let call = client
            .create_call_to_action(CallToAction::new("picnic", needs(&[1])).unwrap())
            .await
            .unwrap();

        // Prime the cache
        assert!(!store.call_complete(call).await.value);

        let pledge = client
            .create_commitment(Commitment::new(call, 0, 1).unwrap())
            .await
            .unwrap();
        client
            .create_satisfaction(Satisfaction::new(call, 0, [pledge]))
            .await
            .unwrap();

        let changed = store.refresh().await;
        assert_eq!(changed, 1);
        assert!(store.call_complete(call).await.value);
    }

    #[tokio::test]
    async fn cancellation_reverts_derived_state_but_keeps_the_record() {
        let store = store(b"alice");
        let client = store.client().clone();

        let call = client
            .create_call_to_action(CallToAction::new("picnic", needs(&[1])).unwrap())
            .await
            .unwrap();
        let pledge = client
            .create_commitment(Commitment::new(call, 0, 1).unwrap())
            .await
            .unwrap();
        let satisfaction = client
            .create_satisfaction(Satisfaction::new(call, 0, [pledge]))
            .await
            .unwrap();

        store.invalidate(call).await;
        assert_eq!(store.satisfied_needs(call).await.value.len(), 1);

        client.cancel_commitment(pledge, "rain").await.unwrap();
        store.invalidate(call).await;

        // Derived satisfaction is gone; the satisfaction record is not.
        assert!(store.satisfied_needs(call).await.value.is_empty());
        assert_eq!(
            client.get_satisfactions_for_call_to_action(call).await[0].0,
            satisfaction
        );
    }
}

//! Conclave Store - Reconciliation and Derived Views
//!
//! The client-side layer of the protocol: it appends new records to the
//! local replica on behalf of one peer, and continuously re-derives
//! convergent read models from whatever subset of the log has replicated
//! so far.
//!
//! # Architecture
//!
//! - **Client**: the operations surface - create/update/read calls to
//!   action, commitments, cancellations, satisfactions, assemblies.
//!   Domain rules and authorization are checked here, before anything
//!   reaches the log; invalid records are never written.
//! - **Store**: a pull-based cache of derived views (need states,
//!   progress, assemblies), recomputed from the local replica on a
//!   bounded poll interval and on explicit invalidation. Every answer
//!   carries a pending/complete/error status so "still replicating" is
//!   never confused with "confirmed empty".
//! - **Config**: poll cadence and propagation-delay tuning. The settle
//!   window after a replication race is operational tuning, not
//!   structure, so nothing here hard-codes it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use conclave_log::Replica;
//! use conclave_record::{CallToAction, Need, PeerId};
//! use conclave_store::{Client, Store, StoreConfig};
//! use tokio::sync::RwLock;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let replica = Arc::new(RwLock::new(Replica::new()));
//!     let me = PeerId::from_public_key(b"me");
//!     let client = Client::new(me, replica);
//!
//!     let needs = vec![Need::new("chairs", 4, None, false)?];
//!     let call = client
//!         .create_call_to_action(CallToAction::new("picnic", needs)?)
//!         .await?;
//!
//!     let store = Store::new(client, StoreConfig::default());
//!     let progress = store.progress(call, 0).await;
//!     println!("{:?}", progress.value);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod error;
mod store;

pub use client::{Client, SharedReplica};
pub use config::StoreConfig;
pub use error::{Error, Result};
pub use store::{CallSnapshot, Derived, Store, ViewStatus};

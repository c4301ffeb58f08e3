//! Need evaluation: the pure core of the protocol.
//!
//! Everything downstream - satisfaction display, staleness, assembly
//! completeness - reduces to this computation. It is a pure function of
//! its inputs: re-running it on the same (need, commitments, cancelled)
//! always yields the same status, and the input order of commitments
//! never matters. That is what makes peer views convergent: once two
//! replicas hold the same records, they evaluate identically.

use std::collections::BTreeSet;

use conclave_record::{CallToAction, Commitment, Need, RecordId};

/// The evaluated contribution state of one need.
#[derive(Debug, Clone, PartialEq)]
pub struct NeedStatus {
    /// Index of the need within its call to action.
    pub need_index: u32,
    /// Sum of uncancelled contributions toward this need.
    pub contributed: u32,
    pub min_necessary: u32,
    pub max_possible: Option<u32>,
    /// Whether the need currently meets its threshold.
    pub eligible: bool,
}

impl NeedStatus {
    /// Progress toward the display denominator (`max_possible` when set,
    /// `min_necessary` otherwise). A zero denominator means the need is
    /// advisory and reads as fully progressed.
    pub fn progress_ratio(&self) -> f64 {
        let denominator = self.max_possible.unwrap_or(self.min_necessary);
        if denominator == 0 {
            return 1.0;
        }
        f64::from(self.contributed) / f64::from(denominator)
    }

    /// How much contribution is still missing before the threshold.
    pub fn remaining(&self) -> u32 {
        self.min_necessary.saturating_sub(self.contributed)
    }
}

/// Evaluate one need against the live commitment set.
///
/// 1. Keep commitments addressed to `need_index` whose id is not in
///    `cancelled`.
/// 2. Sum their amounts.
/// 3. The need is eligible for satisfaction iff `min_necessary == 0` or
///    the sum reaches `min_necessary`. Over-commitment qualifies; an
///    exact quota (`min == max`) does not require an exact sum.
pub fn evaluate(
    need_index: u32,
    need: &Need,
    commitments: &[(RecordId, Commitment)],
    cancelled: &BTreeSet<RecordId>,
) -> NeedStatus {
    let contributed = commitments
        .iter()
        .filter(|(id, c)| c.need_index == need_index && !cancelled.contains(id))
        .fold(0u32, |sum, (_, c)| sum.saturating_add(c.amount));

    NeedStatus {
        need_index,
        contributed,
        min_necessary: need.min_necessary,
        max_possible: need.max_possible,
        eligible: need.min_necessary == 0 || contributed >= need.min_necessary,
    }
}

/// Evaluate every need of a call to action, in index order.
pub fn evaluate_all(
    call: &CallToAction,
    commitments: &[(RecordId, Commitment)],
    cancelled: &BTreeSet<RecordId>,
) -> Vec<NeedStatus> {
    call.needs
        .iter()
        .enumerate()
        .map(|(index, need)| evaluate(index as u32, need, commitments, cancelled))
        .collect()
}

//! Property tests for the coordination core.
//!
//! Random need sets and commitment/cancellation sequences, checking the
//! protocol's structural guarantees: evaluation is a pure function of its
//! inputs, cancellation only ever removes contribution, and an assembly
//! is creatable exactly when every required need has a non-stale witness.

use std::collections::{BTreeMap, BTreeSet};

use conclave_consensus::{
    evaluate, is_complete, is_stale, validate_assembly, validate_satisfaction,
    IncompleteAssemblyError,
};
use conclave_record::{Assembly, CallToAction, Commitment, Need, RecordId, Satisfaction};
use proptest::prelude::*;

/// What eventually happens to a generated commitment.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Fate {
    /// Never cancelled.
    Live,
    /// Cancelled before any satisfaction was attested.
    CancelledEarly,
    /// Cancelled after satisfactions were attested (stales them).
    CancelledLate,
}

fn arb_need() -> impl Strategy<Value = Need> {
    (0u32..4, prop::option::of(0u32..4), any::<bool>()).prop_map(|(min, headroom, gated)| Need {
        description: "generated need".into(),
        min_necessary: min,
        max_possible: headroom.map(|h| min + h),
        requires_admin_approval: gated,
    })
}

fn arb_fate() -> impl Strategy<Value = Fate> {
    prop_oneof![
        3 => Just(Fate::Live),
        1 => Just(Fate::CancelledEarly),
        1 => Just(Fate::CancelledLate),
    ]
}

prop_compose! {
    fn arb_scenario()(
        needs in prop::collection::vec(arb_need(), 1..5),
        raw in prop::collection::vec((0u32..5, 1u32..5, arb_fate()), 0..16),
    ) -> (Vec<Need>, Vec<(u32, u32, Fate)>) {
        let len = needs.len() as u32;
        let pledges = raw
            .into_iter()
            .map(|(index, amount, fate)| (index % len, amount, fate))
            .collect();
        (needs, pledges)
    }
}

fn record_id(index: usize) -> RecordId {
    let mut bytes = [0u8; 32];
    bytes[0] = (index + 1) as u8;
    RecordId::from_bytes(bytes)
}

proptest! {
    #[test]
    fn evaluation_is_idempotent_and_order_independent(
        (needs, pledges) in arb_scenario(),
        shuffle in any::<prop::sample::Index>(),
    ) {
        let call_id = RecordId::from_bytes([0xff; 32]);
        let commitments: Vec<(RecordId, Commitment)> = pledges
            .iter()
            .enumerate()
            .map(|(i, (index, amount, _))| {
                (record_id(i), Commitment::new(call_id, *index, *amount).unwrap())
            })
            .collect();
        let cancelled: BTreeSet<RecordId> = pledges
            .iter()
            .enumerate()
            .filter(|(_, (_, _, fate))| *fate != Fate::Live)
            .map(|(i, _)| record_id(i))
            .collect();

        let mut rotated = commitments.clone();
        if !rotated.is_empty() {
            let amount = shuffle.index(rotated.len());
            rotated.rotate_left(amount);
        }

        for (index, need) in needs.iter().enumerate() {
            let once = evaluate(index as u32, need, &commitments, &cancelled);
            let twice = evaluate(index as u32, need, &commitments, &cancelled);
            let reordered = evaluate(index as u32, need, &rotated, &cancelled);
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(&once, &reordered);
            prop_assert!(once.eligible == (need.min_necessary == 0
                || once.contributed >= need.min_necessary));
        }
    }

    #[test]
    fn cancellation_only_removes_contribution(
        (needs, pledges) in arb_scenario(),
        extra_cancel in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!pledges.is_empty());

        let call_id = RecordId::from_bytes([0xff; 32]);
        let commitments: Vec<(RecordId, Commitment)> = pledges
            .iter()
            .enumerate()
            .map(|(i, (index, amount, _))| {
                (record_id(i), Commitment::new(call_id, *index, *amount).unwrap())
            })
            .collect();

        let mut cancelled = BTreeSet::new();
        let before: Vec<_> = needs
            .iter()
            .enumerate()
            .map(|(i, need)| evaluate(i as u32, need, &commitments, &cancelled))
            .collect();

        // Observe one more cancellation; no need's contribution may grow.
        cancelled.insert(record_id(extra_cancel.index(pledges.len())));
        for (i, need) in needs.iter().enumerate() {
            let after = evaluate(i as u32, need, &commitments, &cancelled);
            prop_assert!(after.contributed <= before[i].contributed);
        }
    }

    #[test]
    fn assembly_is_creatable_iff_every_required_need_has_a_fresh_witness(
        (needs, pledges) in arb_scenario(),
    ) {
        let call_id = RecordId::from_bytes([0xff; 32]);
        let call = CallToAction::new("generated call", needs).unwrap();

        let commitments: Vec<(RecordId, Commitment)> = pledges
            .iter()
            .enumerate()
            .map(|(i, (index, amount, _))| {
                (record_id(i), Commitment::new(call_id, *index, *amount).unwrap())
            })
            .collect();
        let resolved: BTreeMap<RecordId, Commitment> =
            commitments.iter().cloned().collect();

        let cancelled_early: BTreeSet<RecordId> = pledges
            .iter()
            .enumerate()
            .filter(|(_, (_, _, fate))| *fate == Fate::CancelledEarly)
            .map(|(i, _)| record_id(i))
            .collect();

        // Attest every need that is eligible once the early cancellations
        // are observed, referencing all surviving matching commitments.
        let mut satisfactions: Vec<(RecordId, Satisfaction)> = Vec::new();
        for (index, need) in call.needs.iter().enumerate() {
            let status = evaluate(index as u32, need, &commitments, &cancelled_early);
            if !status.eligible {
                continue;
            }
            let refs: Vec<RecordId> = commitments
                .iter()
                .filter(|(id, c)| {
                    c.need_index == index as u32 && !cancelled_early.contains(id)
                })
                .map(|(id, _)| *id)
                .collect();
            let satisfaction = Satisfaction::new(call_id, index as u32, refs);
            validate_satisfaction(&satisfaction, &call, &resolved, &cancelled_early)
                .expect("eligible needs must accept attestation");
            satisfactions.push((record_id(1000 + index), satisfaction));
        }

        // The late cancellations land afterward and stale some witnesses.
        let cancelled: BTreeSet<RecordId> = pledges
            .iter()
            .enumerate()
            .filter(|(_, (_, _, fate))| *fate != Fate::Live)
            .map(|(i, _)| record_id(i))
            .collect();

        let complete = is_complete(&call, &satisfactions, &cancelled);

        // Build the best assembly the observer can: one fresh witness per
        // witnessed need.
        let resolved_satisfactions: BTreeMap<RecordId, Satisfaction> =
            satisfactions.iter().cloned().collect();
        let mut picked: BTreeMap<u32, RecordId> = BTreeMap::new();
        for (id, s) in &satisfactions {
            if !is_stale(s, &cancelled) {
                picked.entry(s.need_index).or_insert(*id);
            }
        }
        let assembly = Assembly::new(call_id, picked.values().copied());
        let verdict =
            validate_assembly(&assembly, &call, &resolved_satisfactions, &cancelled);

        if complete {
            prop_assert_eq!(verdict, Ok(()));
        } else {
            let is_missing_need = matches!(
                verdict,
                Err(IncompleteAssemblyError::MissingNeed { .. })
            );
            prop_assert!(is_missing_need);
        }
    }
}

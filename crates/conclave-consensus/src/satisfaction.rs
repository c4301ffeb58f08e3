//! The derived satisfaction state machine.
//!
//! States per need: `Unmet → Eligible → Satisfied → (stale) → Satisfied`.
//!
//! Only the satisfaction records themselves are ever written. Whether a
//! need *currently* displays as satisfied is recomputed on every read:
//! does at least one existing satisfaction for this need reference only
//! still-uncancelled commitments? A satisfaction whose reference set has
//! been hit by a cancellation goes stale - the record stays, permanent
//! testimony, but it stops counting as a witness. A fresh satisfaction
//! over re-accumulated commitments makes the need satisfied again.

use std::collections::{BTreeMap, BTreeSet};

use conclave_record::{CallToAction, Commitment, Need, PeerId, RecordId, Satisfaction};

use crate::error::{AuthorizationError, InvalidSatisfactionError};
use crate::evaluation::{evaluate, NeedStatus};

/// The derived state of one need at read time.
#[derive(Debug, Clone, PartialEq)]
pub enum NeedState {
    /// Below threshold and not witnessed.
    Unmet(NeedStatus),
    /// Threshold met, awaiting an attestation.
    Eligible(NeedStatus),
    /// At least one non-stale satisfaction witnesses the need.
    Satisfied {
        status: NeedStatus,
        /// The non-stale satisfactions, in id order.
        witnesses: Vec<RecordId>,
    },
}

impl NeedState {
    /// The underlying evaluation, regardless of state.
    pub fn status(&self) -> &NeedStatus {
        match self {
            NeedState::Unmet(status) => status,
            NeedState::Eligible(status) => status,
            NeedState::Satisfied { status, .. } => status,
        }
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(self, NeedState::Satisfied { .. })
    }

    /// Whether this need currently blocks assembly formation.
    pub fn blocks_assembly(&self) -> bool {
        self.status().min_necessary > 0 && !self.is_satisfied()
    }
}

/// Whether a satisfaction has gone stale against the live cancellation
/// set: stale iff any referenced commitment is cancelled.
///
/// Purely a read-time property - the record itself is never deleted or
/// edited.
pub fn is_stale(satisfaction: &Satisfaction, cancelled: &BTreeSet<RecordId>) -> bool {
    satisfaction
        .commitments
        .iter()
        .any(|c| cancelled.contains(c))
}

/// Derive the current state of one need.
pub fn need_state(
    need_index: u32,
    need: &Need,
    commitments: &[(RecordId, Commitment)],
    satisfactions: &[(RecordId, Satisfaction)],
    cancelled: &BTreeSet<RecordId>,
) -> NeedState {
    let status = evaluate(need_index, need, commitments, cancelled);

    let witnesses: Vec<RecordId> = satisfactions
        .iter()
        .filter(|(_, s)| s.need_index == need_index && !is_stale(s, cancelled))
        .map(|(id, _)| *id)
        .collect();

    if !witnesses.is_empty() {
        NeedState::Satisfied { status, witnesses }
    } else if status.eligible {
        NeedState::Eligible(status)
    } else {
        NeedState::Unmet(status)
    }
}

/// Derive the state of every need of a call, in index order.
pub fn need_states(
    call: &CallToAction,
    commitments: &[(RecordId, Commitment)],
    satisfactions: &[(RecordId, Satisfaction)],
    cancelled: &BTreeSet<RecordId>,
) -> Vec<NeedState> {
    call.needs
        .iter()
        .enumerate()
        .map(|(index, need)| {
            need_state(index as u32, need, commitments, satisfactions, cancelled)
        })
        .collect()
}

/// Check a satisfaction against the call and the locally-resolved
/// commitments it references, before it is submitted to the log.
///
/// `resolved` maps each referenced commitment id to its commitment; the
/// attesting peer builds it from its own replica.
pub fn validate_satisfaction(
    satisfaction: &Satisfaction,
    call: &CallToAction,
    resolved: &BTreeMap<RecordId, Commitment>,
    cancelled: &BTreeSet<RecordId>,
) -> Result<(), InvalidSatisfactionError> {
    let need = call
        .needs
        .get(satisfaction.need_index as usize)
        .ok_or(InvalidSatisfactionError::NeedIndexOutOfRange {
            need_index: satisfaction.need_index,
            needs_len: call.needs.len(),
        })?;

    let mut contributed = 0u32;
    for id in &satisfaction.commitments {
        let commitment = resolved
            .get(id)
            .ok_or(InvalidSatisfactionError::UnresolvedCommitment { commitment: *id })?;

        if commitment.call_to_action != satisfaction.call_to_action {
            return Err(InvalidSatisfactionError::WrongCallToAction {
                commitment: *id,
                expected: satisfaction.call_to_action,
                actual: commitment.call_to_action,
            });
        }
        if commitment.need_index != satisfaction.need_index {
            return Err(InvalidSatisfactionError::WrongNeed {
                commitment: *id,
                expected: satisfaction.need_index,
                actual: commitment.need_index,
            });
        }
        if cancelled.contains(id) {
            return Err(InvalidSatisfactionError::CancelledCommitment { commitment: *id });
        }
        contributed = contributed.saturating_add(commitment.amount);
    }

    if contributed < need.min_necessary {
        return Err(InvalidSatisfactionError::BelowThreshold {
            contributed,
            min_necessary: need.min_necessary,
        });
    }

    Ok(())
}

/// Check that `peer` may attest satisfaction of a need.
///
/// Admin-gated needs accept only the call's author or a listed admin;
/// any peer may attest otherwise. Peer identity is passed explicitly -
/// there is no ambient "current peer" context.
pub fn authorize_satisfaction(
    peer: &PeerId,
    call_author: &PeerId,
    call: &CallToAction,
    need_index: u32,
) -> Result<(), AuthorizationError> {
    let gated = call
        .needs
        .get(need_index as usize)
        .map(|need| need.requires_admin_approval)
        .unwrap_or(false);

    if gated && !call.is_admin(peer, call_author) {
        return Err(AuthorizationError::AdminRequired {
            peer: *peer,
            need_index,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_record::Need;

    fn id(seed: u8) -> RecordId {
        RecordId::from_bytes([seed; 32])
    }

    fn call(needs: Vec<Need>) -> CallToAction {
        CallToAction::new("picnic", needs).unwrap()
    }

    fn need(min: u32) -> Need {
        Need::new("chairs", min, None, false).unwrap()
    }

    fn commitment(call_id: RecordId, need_index: u32, amount: u32) -> Commitment {
        Commitment::new(call_id, need_index, amount).unwrap()
    }

    #[test]
    fn staleness_tracks_cancellations() {
        let s = Satisfaction::new(id(9), 0, [id(1), id(2)]);
        assert!(!is_stale(&s, &BTreeSet::new()));
        assert!(is_stale(&s, &BTreeSet::from([id(2)])));
    }

    #[test]
    fn state_progresses_unmet_eligible_satisfied() {
        let call_id = id(9);
        let c = call(vec![need(2)]);

        let unmet = need_state(0, &c.needs[0], &[], &[], &BTreeSet::new());
        assert!(matches!(unmet, NeedState::Unmet(_)));
        assert!(unmet.blocks_assembly());

        let commitments = vec![(id(1), commitment(call_id, 0, 2))];
        let eligible = need_state(0, &c.needs[0], &commitments, &[], &BTreeSet::new());
        assert!(matches!(eligible, NeedState::Eligible(_)));

        let satisfactions = vec![(id(5), Satisfaction::new(call_id, 0, [id(1)]))];
        let satisfied = need_state(
            0,
            &c.needs[0],
            &commitments,
            &satisfactions,
            &BTreeSet::new(),
        );
        assert!(satisfied.is_satisfied());
        assert!(!satisfied.blocks_assembly());
    }

    #[test]
    fn stale_witness_reverts_the_derived_state() {
        let call_id = id(9);
        let c = call(vec![need(2)]);
        let commitments = vec![(id(1), commitment(call_id, 0, 2))];
        let satisfactions = vec![(id(5), Satisfaction::new(call_id, 0, [id(1)]))];

        // Cancelling the only referenced commitment stales the witness
        // and drops the remaining contribution below threshold.
        let cancelled = BTreeSet::from([id(1)]);
        let state = need_state(0, &c.needs[0], &commitments, &satisfactions, &cancelled);
        assert!(matches!(state, NeedState::Unmet(_)));

        // A second, untouched satisfaction keeps the need satisfied even
        // while the first is stale.
        let satisfactions = vec![
            (id(5), Satisfaction::new(call_id, 0, [id(1)])),
            (id(6), Satisfaction::new(call_id, 0, [id(2)])),
        ];
        let commitments = vec![
            (id(1), commitment(call_id, 0, 2)),
            (id(2), commitment(call_id, 0, 2)),
        ];
        let state = need_state(0, &c.needs[0], &commitments, &satisfactions, &cancelled);
        match state {
            NeedState::Satisfied { witnesses, .. } => assert_eq!(witnesses, vec![id(6)]),
            other => panic!("expected satisfied, got {:?}", other),
        }
    }

    #[test]
    fn optional_need_is_eligible_with_nothing() {
        let c = call(vec![need(0)]);
        let state = need_state(0, &c.needs[0], &[], &[], &BTreeSet::new());
        assert!(matches!(state, NeedState::Eligible(_)));
        assert!(!state.blocks_assembly());
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let c = call(vec![need(1)]);
        let s = Satisfaction::new(id(9), 3, [id(1)]);
        assert_eq!(
            validate_satisfaction(&s, &c, &BTreeMap::new(), &BTreeSet::new()),
            Err(InvalidSatisfactionError::NeedIndexOutOfRange {
                need_index: 3,
                needs_len: 1,
            })
        );
    }

    #[test]
    fn validate_rejects_foreign_and_mismatched_commitments() {
        let call_id = id(9);
        let c = call(vec![need(1), need(1)]);

        // Commitment for another call entirely
        let foreign = BTreeMap::from([(id(1), commitment(id(8), 0, 1))]);
        let s = Satisfaction::new(call_id, 0, [id(1)]);
        assert!(matches!(
            validate_satisfaction(&s, &c, &foreign, &BTreeSet::new()),
            Err(InvalidSatisfactionError::WrongCallToAction { .. })
        ));

        // Commitment for the right call but the wrong need
        let mismatched = BTreeMap::from([(id(1), commitment(call_id, 1, 1))]);
        assert_eq!(
            validate_satisfaction(&s, &c, &mismatched, &BTreeSet::new()),
            Err(InvalidSatisfactionError::WrongNeed {
                commitment: id(1),
                expected: 0,
                actual: 1,
            })
        );
    }

    #[test]
    fn validate_rejects_cancelled_and_insufficient() {
        let call_id = id(9);
        let c = call(vec![need(3)]);
        let resolved = BTreeMap::from([(id(1), commitment(call_id, 0, 3))]);
        let s = Satisfaction::new(call_id, 0, [id(1)]);

        assert_eq!(
            validate_satisfaction(&s, &c, &resolved, &BTreeSet::from([id(1)])),
            Err(InvalidSatisfactionError::CancelledCommitment { commitment: id(1) })
        );

        let small = BTreeMap::from([(id(1), commitment(call_id, 0, 2))]);
        assert_eq!(
            validate_satisfaction(&s, &c, &small, &BTreeSet::new()),
            Err(InvalidSatisfactionError::BelowThreshold {
                contributed: 2,
                min_necessary: 3,
            })
        );
    }

    #[test]
    fn validate_accepts_empty_set_for_optional_need() {
        let c = call(vec![need(0)]);
        let s = Satisfaction::new(id(9), 0, []);
        assert_eq!(
            validate_satisfaction(&s, &c, &BTreeMap::new(), &BTreeSet::new()),
            Ok(())
        );
    }

    #[test]
    fn admin_gate_checks_author_and_admins() {
        let author = PeerId::from_public_key(b"author");
        let admin = PeerId::from_public_key(b"admin");
        let stranger = PeerId::from_public_key(b"stranger");

        let gated = Need::new("approve the venue", 1, None, true).unwrap();
        let c = CallToAction::new("picnic", vec![gated])
            .unwrap()
            .with_admins([admin]);

        assert_eq!(authorize_satisfaction(&author, &author, &c, 0), Ok(()));
        assert_eq!(authorize_satisfaction(&admin, &author, &c, 0), Ok(()));
        assert_eq!(
            authorize_satisfaction(&stranger, &author, &c, 0),
            Err(AuthorizationError::AdminRequired {
                peer: stranger,
                need_index: 0,
            })
        );
    }

    #[test]
    fn ungated_need_accepts_any_peer() {
        let author = PeerId::from_public_key(b"author");
        let stranger = PeerId::from_public_key(b"stranger");
        let c = call(vec![need(1)]);
        assert_eq!(authorize_satisfaction(&stranger, &author, &c, 0), Ok(()));
    }
}

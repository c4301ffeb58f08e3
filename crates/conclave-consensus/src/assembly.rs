//! Assembly formation rules.
//!
//! A call to action is *complete* iff every need with `min_necessary > 0`
//! has at least one non-stale satisfaction. Completeness is observed
//! independently by peers with no coordination, so two peers may both
//! record an assembly for the same call - that is an expected outcome,
//! proof twice over, never an error and never deduplicated.

use std::collections::{BTreeMap, BTreeSet};

use conclave_record::{Assembly, CallToAction, RecordId, Satisfaction};

use crate::error::IncompleteAssemblyError;
use crate::satisfaction::is_stale;

/// Whether the call is complete: every required need has a non-stale
/// satisfaction among `satisfactions`.
pub fn is_complete(
    call: &CallToAction,
    satisfactions: &[(RecordId, Satisfaction)],
    cancelled: &BTreeSet<RecordId>,
) -> bool {
    call.needs.iter().enumerate().all(|(index, need)| {
        !need.is_required()
            || satisfactions
                .iter()
                .any(|(_, s)| s.need_index == index as u32 && !is_stale(s, cancelled))
    })
}

/// Check an assembly against the call and the locally-resolved
/// satisfactions it references, before it is submitted to the log.
///
/// Rejects a duplicate need index, a missing required need, and any
/// referenced satisfaction that is unresolved, foreign, out of range, or
/// stale at creation time.
pub fn validate_assembly(
    assembly: &Assembly,
    call: &CallToAction,
    resolved: &BTreeMap<RecordId, Satisfaction>,
    cancelled: &BTreeSet<RecordId>,
) -> Result<(), IncompleteAssemblyError> {
    let mut claimed: BTreeSet<u32> = BTreeSet::new();

    for id in &assembly.satisfactions {
        let satisfaction = resolved.get(id).ok_or(
            IncompleteAssemblyError::UnresolvedSatisfaction { satisfaction: *id },
        )?;

        if satisfaction.call_to_action != assembly.call_to_action {
            return Err(IncompleteAssemblyError::WrongCallToAction { satisfaction: *id });
        }
        if satisfaction.need_index as usize >= call.needs.len() {
            return Err(IncompleteAssemblyError::NeedIndexOutOfRange {
                satisfaction: *id,
                need_index: satisfaction.need_index,
            });
        }
        if is_stale(satisfaction, cancelled) {
            return Err(IncompleteAssemblyError::StaleSatisfaction {
                satisfaction: *id,
                need_index: satisfaction.need_index,
            });
        }
        if !claimed.insert(satisfaction.need_index) {
            return Err(IncompleteAssemblyError::DuplicateNeed {
                need_index: satisfaction.need_index,
            });
        }
    }

    for (index, need) in call.needs.iter().enumerate() {
        if need.is_required() && !claimed.contains(&(index as u32)) {
            return Err(IncompleteAssemblyError::MissingNeed {
                need_index: index as u32,
            });
        }
    }

    Ok(())
}

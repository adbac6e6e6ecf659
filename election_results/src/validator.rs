use log::debug;
use std::collections::BTreeMap;

use crate::config::{AcceptedEntry, Center, ValidationError, VoteMap};

/// Votes as typed by an operator, before normalization.
pub type ProposedVotes = BTreeMap<String, i64>;

/// Checks a proposed entry for a center against its registered voters.
///
/// Negative values are replaced by zero before anything else. The entry is
/// then rejected if the votes and the invalid votes together exceed the
/// number of registered voters of the center. Nothing is clamped to fit:
/// the caller has to correct the entry.
pub fn validate_center_update(
    center: &Center,
    votes: &ProposedVotes,
    invalid_votes: i64,
) -> Result<AcceptedEntry, ValidationError> {
    let normalized: VoteMap = votes
        .iter()
        .map(|(cid, count)| (cid.clone(), non_negative(*count)))
        .collect();
    let invalid_votes = non_negative(invalid_votes);

    // A total that does not fit in a u64 is over any capacity.
    let total_entered = normalized
        .values()
        .chain(std::iter::once(&invalid_votes))
        .try_fold(0u64, |acc, x| acc.checked_add(*x));
    debug!(
        "validate_center_update: center {:?}: entered {:?} / {:?}",
        center.center_id, total_entered, center.total_voters
    );
    let total_entered = match total_entered {
        Some(t) if t <= center.total_voters => t,
        t => {
            return Err(ValidationError::OverCapacity {
                total_entered: t.unwrap_or(u64::MAX),
                total_voters: center.total_voters,
            })
        }
    };

    Ok(AcceptedEntry {
        votes: normalized,
        invalid_votes,
        total_entered,
    })
}

fn non_negative(count: i64) -> u64 {
    count.max(0) as u64
}

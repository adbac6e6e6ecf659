use log::debug;

use crate::config::{AcceptedEntry, Snapshot, VoteMap};

/// Returns a new snapshot in which one center carries the given votes and is
/// marked as reported.
///
/// The input snapshot is left untouched, and so is every other seat and center
/// in the result. If the seat or the center cannot be found, the result is
/// equal to the input.
pub fn apply_center_update(
    snapshot: &Snapshot,
    seat_id: &str,
    center_id: u32,
    votes: &VoteMap,
    invalid_votes: u64,
) -> Snapshot {
    let mut res = snapshot.clone();
    let center = res
        .seats
        .iter_mut()
        .find(|s| s.id == seat_id)
        .and_then(|s| s.centers.iter_mut().find(|c| c.center_id == center_id));
    match center {
        Some(c) => {
            c.votes = votes.clone();
            c.invalid_votes = invalid_votes;
            c.is_reported = true;
        }
        None => {
            debug!(
                "apply_center_update: no center {:?} in seat {:?}, nothing to apply",
                center_id, seat_id
            );
        }
    }
    res
}

/// Same as [`apply_center_update`], for an entry that went through the validator.
pub fn apply_accepted_entry(
    snapshot: &Snapshot,
    seat_id: &str,
    center_id: u32,
    entry: &AcceptedEntry,
) -> Snapshot {
    apply_center_update(
        snapshot,
        seat_id,
        center_id,
        &entry.votes,
        entry.invalid_votes,
    )
}

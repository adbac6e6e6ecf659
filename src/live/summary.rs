use std::fs;

use election_results::*;
use log::debug;
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use crate::live::*;

fn pct(x: f64) -> String {
    format!("{:.2}", x)
}

fn seat_summary_js(seat: &Seat) -> JSValue {
    let standings: Vec<JSValue> = seat_standings(seat)
        .iter()
        .map(|st| {
            json!({
                "id": st.candidate.id,
                "name": st.candidate.name,
                "party": st.candidate.party,
                "votes": st.votes,
                "percentage": pct(st.percentage),
            })
        })
        .collect();
    json!({
        "id": seat.id,
        "name": seat.name,
        "leader": leading_candidate(seat).map(|c| c.name.clone()),
        "standings": standings,
        "invalidVotes": seat_invalid_total(seat),
        "castVotes": seat_cast_total(seat),
        "totalVoters": seat_voter_total(seat),
        "turnout": pct(turnout_ratio(seat) * 100.0),
        "reportedCenters": reported_center_count(seat),
        "totalCenters": seat.centers.len(),
    })
}

/// The printable report of a snapshot: one entry per seat, then the totals
/// across all the seats. Percentages are strings with two decimals.
pub fn build_summary_js(snapshot: &Snapshot) -> JSValue {
    let seats: Vec<JSValue> = snapshot.seats.iter().map(seat_summary_js).collect();
    let cast = snapshot_cast_total(snapshot);
    let candidates: Vec<JSValue> = global_candidate_totals(snapshot)
        .into_iter()
        .map(|(name, votes)| {
            json!({
                "name": name,
                "votes": votes,
                "percentage": pct(percentage_of_total(votes, cast)),
            })
        })
        .collect();
    json!({
        "seats": seats,
        "overall": {
            "candidates": candidates,
            "invalidVotes": snapshot_invalid_total(snapshot),
            "castVotes": cast,
            "totalVoters": snapshot_voter_total(snapshot),
        }
    })
}

pub fn read_summary(path: &str) -> LiveResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_summary: {} bytes from {}", contents.len(), path);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

mod config;
use log::debug;

pub mod builder;
pub mod defaults;
pub mod manual;
pub mod reducer;
pub mod validator;

pub use crate::config::*;
pub use crate::defaults::default_snapshot;
pub use crate::reducer::{apply_accepted_entry, apply_center_update};
pub use crate::validator::{validate_center_update, ProposedVotes};

// All the aggregation functions are total: missing data counts as zero and
// nothing here can fail, even on a snapshot that breaks the capacity rule.
// Sums saturate at u64::MAX: stored data is not trusted to be small.

fn saturating_total(counts: impl Iterator<Item = u64>) -> u64 {
    counts.fold(0u64, |acc, x| acc.saturating_add(x))
}

/// The votes of one candidate in a seat, summed over all the centers.
///
/// Centers that have no entry for this candidate contribute nothing.
pub fn candidate_total(seat: &Seat, candidate_id: &str) -> u64 {
    saturating_total(
        seat.centers
            .iter()
            .map(|c| c.votes.get(candidate_id).cloned().unwrap_or(0)),
    )
}

pub fn seat_invalid_total(seat: &Seat) -> u64 {
    saturating_total(seat.centers.iter().map(|c| c.invalid_votes))
}

/// All the votes cast in a seat: the votes of the declared candidates plus
/// the invalid votes.
///
/// Votes recorded under an id that is not a candidate of this seat are not
/// counted.
pub fn seat_cast_total(seat: &Seat) -> u64 {
    let valid = saturating_total(seat.candidates.iter().map(|c| candidate_total(seat, &c.id)));
    valid.saturating_add(seat_invalid_total(seat))
}

pub fn seat_voter_total(seat: &Seat) -> u64 {
    saturating_total(seat.centers.iter().map(|c| c.total_voters))
}

/// Votes cast over registered voters. Zero when there are no registered voters.
///
/// The ratio is not clamped: it goes above 1 for data that breaks the
/// capacity rule.
pub fn turnout_ratio(seat: &Seat) -> f64 {
    let voters = seat_voter_total(seat);
    if voters == 0 {
        0.0
    } else {
        seat_cast_total(seat) as f64 / voters as f64
    }
}

pub fn reported_center_count(seat: &Seat) -> usize {
    seat.centers.iter().filter(|c| c.is_reported).count()
}

/// The fraction of the centers of a seat that have reported. Zero for a seat
/// without centers.
pub fn reporting_ratio(seat: &Seat) -> f64 {
    if seat.centers.is_empty() {
        0.0
    } else {
        reported_center_count(seat) as f64 / seat.centers.len() as f64
    }
}

/// `part` as a percentage of `whole`, or zero if `whole` is zero.
pub fn percentage_of_total(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

/// All the candidates of a seat, from the most votes to the least.
///
/// Candidates with the same number of votes keep the order in which they are
/// declared in the seat.
pub fn seat_standings(seat: &Seat) -> Vec<Standing> {
    let cast = seat_cast_total(seat);
    let mut res: Vec<Standing> = seat
        .candidates
        .iter()
        .map(|c| {
            let votes = candidate_total(seat, &c.id);
            Standing {
                candidate: c.clone(),
                votes,
                percentage: percentage_of_total(votes, cast),
            }
        })
        .collect();
    // sort_by is stable: ties stay in declaration order.
    res.sort_by(|a, b| b.votes.cmp(&a.votes));
    debug!(
        "seat_standings: seat {:?}: {:?}",
        seat.id,
        res.iter()
            .map(|st| (st.candidate.id.as_str(), st.votes))
            .collect::<Vec<_>>()
    );
    res
}

/// The candidate with the most votes in a seat.
///
/// On a tie, the candidate declared first in the seat leads. Returns `None`
/// only for a seat without candidates.
pub fn leading_candidate(seat: &Seat) -> Option<&Candidate> {
    let mut leader: Option<(&Candidate, u64)> = None;
    for c in seat.candidates.iter() {
        let votes = candidate_total(seat, &c.id);
        match leader {
            Some((_, best)) if votes <= best => {}
            _ => leader = Some((c, votes)),
        }
    }
    leader.map(|(c, _)| c)
}

/// The cast votes of one center: every recorded vote plus the invalid votes.
pub fn center_cast_total(center: &Center) -> u64 {
    saturating_total(center.votes.values().cloned()).saturating_add(center.invalid_votes)
}

/// Totals for each candidate name across all the seats, in the order in which
/// the names first appear.
///
/// Candidates are matched by name and not by id: the same person or list
/// may run under a different id in each seat.
pub fn global_candidate_totals(snapshot: &Snapshot) -> Vec<(String, u64)> {
    let mut res: Vec<(String, u64)> = Vec::new();
    for seat in snapshot.seats.iter() {
        for c in seat.candidates.iter() {
            let votes = candidate_total(seat, &c.id);
            match res.iter_mut().find(|(name, _)| *name == c.name) {
                Some((_, total)) => *total = total.saturating_add(votes),
                None => res.push((c.name.clone(), votes)),
            }
        }
    }
    res
}

pub fn snapshot_invalid_total(snapshot: &Snapshot) -> u64 {
    saturating_total(snapshot.seats.iter().map(seat_invalid_total))
}

pub fn snapshot_cast_total(snapshot: &Snapshot) -> u64 {
    saturating_total(snapshot.seats.iter().map(seat_cast_total))
}

pub fn snapshot_voter_total(snapshot: &Snapshot) -> u64 {
    saturating_total(snapshot.seats.iter().map(seat_voter_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    fn center(id: u32, voters: u64, votes: &[(&str, u64)], invalid: u64, reported: bool) -> Center {
        Center {
            center_id: id,
            center_name: format!("Center {}", id),
            total_voters: voters,
            votes: votes.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            invalid_votes: invalid,
            is_reported: reported,
        }
    }

    fn seat_with(centers: Vec<Center>) -> Seat {
        let mut b = Builder::new()
            .seat("s", "Seat")
            .and_then(|b| b.candidate("a", "Anna", "Blue", "Boat", "#00f"))
            .and_then(|b| b.candidate("b", "Bob", "Green", "Tree", "#0f0"))
            .and_then(|b| b.candidate("c", "Carla", "Red", "Rose", "#f00"))
            .unwrap();
        for c in centers {
            b.add_center(c).unwrap();
        }
        b.build().seats.remove(0)
    }

    fn conforming_seat() -> Seat {
        seat_with(vec![
            center(1, 100, &[("a", 40), ("b", 30)], 5, true),
            center(2, 200, &[("a", 10), ("b", 90), ("c", 20)], 10, true),
            center(3, 150, &[], 0, false),
        ])
    }

    #[test]
    fn candidate_totals() {
        let seat = conforming_seat();
        assert_eq!(candidate_total(&seat, "a"), 50);
        assert_eq!(candidate_total(&seat, "b"), 120);
        assert_eq!(candidate_total(&seat, "c"), 20);
        assert_eq!(candidate_total(&seat, "unknown"), 0);
        assert_eq!(seat_invalid_total(&seat), 15);
        assert_eq!(seat_voter_total(&seat), 450);
    }

    #[test]
    fn cast_is_candidates_plus_invalid() {
        let seats = vec![
            conforming_seat(),
            seat_with(vec![]),
            seat_with(vec![center(1, 10, &[("z", 4)], 2, true)]),
        ];
        for seat in seats.iter() {
            let valid: u64 = seat
                .candidates
                .iter()
                .map(|c| candidate_total(seat, &c.id))
                .sum();
            assert_eq!(valid + seat_invalid_total(seat), seat_cast_total(seat));
        }
    }

    #[test]
    fn unknown_vote_keys_are_ignored() {
        let seat = seat_with(vec![center(1, 100, &[("a", 10), ("ghost", 50)], 0, true)]);
        assert_eq!(seat_cast_total(&seat), 10);
        // The center view still shows what was entered.
        assert_eq!(center_cast_total(&seat.centers[0]), 60);
    }

    #[test]
    fn turnout_conforming() {
        let seat = conforming_seat();
        let turnout = turnout_ratio(&seat);
        assert!(turnout <= 1.0);
        assert!((turnout - 205.0 / 450.0).abs() < 1e-12);
    }

    #[test]
    fn turnout_over_capacity_is_not_clamped() {
        let seat = seat_with(vec![center(1, 100, &[("a", 90), ("b", 40)], 5, true)]);
        assert!((turnout_ratio(&seat) - 1.35).abs() < 1e-12);
    }

    #[test]
    fn turnout_without_voters() {
        let seat = seat_with(vec![center(1, 0, &[], 0, false)]);
        assert_eq!(turnout_ratio(&seat), 0.0);
        assert_eq!(turnout_ratio(&seat_with(vec![])), 0.0);
    }

    #[test]
    fn reporting() {
        let seat = conforming_seat();
        assert_eq!(reported_center_count(&seat), 2);
        assert!((reporting_ratio(&seat) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(reporting_ratio(&seat_with(vec![])), 0.0);
    }

    #[test]
    fn percentages() {
        assert_eq!(percentage_of_total(1, 4), 25.0);
        assert_eq!(percentage_of_total(5, 0), 0.0);
        assert_eq!(percentage_of_total(0, 0), 0.0);
    }

    #[test]
    fn standings_are_sorted() {
        let seat = conforming_seat();
        let standings = seat_standings(&seat);
        let ids: Vec<&str> = standings.iter().map(|s| s.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!((standings[0].percentage - 120.0 / 205.0 * 100.0).abs() < 1e-9);
        assert_eq!(leading_candidate(&seat).map(|c| c.id.as_str()), Some("b"));
    }

    #[test]
    fn tie_goes_to_first_declared() {
        let seat = seat_with(vec![center(1, 100, &[("c", 30), ("b", 30)], 0, true)]);
        for _ in 0..10 {
            assert_eq!(leading_candidate(&seat).map(|c| c.id.as_str()), Some("b"));
            let ids: Vec<String> = seat_standings(&seat)
                .into_iter()
                .map(|s| s.candidate.id)
                .collect();
            assert_eq!(ids, vec!["b", "c", "a"]);
        }
    }

    #[test]
    fn leader_without_votes() {
        let seat = seat_with(vec![center(1, 100, &[], 0, false)]);
        assert_eq!(leading_candidate(&seat).map(|c| c.id.as_str()), Some("a"));

        let empty = Seat {
            id: "e".to_string(),
            name: "Empty".to_string(),
            candidates: vec![],
            centers: vec![],
        };
        assert_eq!(leading_candidate(&empty), None);
    }

    #[test]
    fn idempotent() {
        let snapshot = Snapshot::new(vec![conforming_seat()]);
        let seat = &snapshot.seats[0];
        assert_eq!(seat_standings(seat), seat_standings(seat));
        assert_eq!(turnout_ratio(seat), turnout_ratio(seat));
        assert_eq!(
            global_candidate_totals(&snapshot),
            global_candidate_totals(&snapshot)
        );
    }

    #[test]
    fn global_totals_by_name() {
        let north = conforming_seat();
        let mut south = seat_with(vec![center(1, 100, &[("a", 7), ("c", 3)], 1, true)]);
        south.id = "south".to_string();
        // A candidate that only runs in the south.
        south.candidates[1].name = "Dora".to_string();
        let snapshot = Snapshot::new(vec![north, south]);

        assert_eq!(
            global_candidate_totals(&snapshot),
            vec![
                ("Anna".to_string(), 57),
                ("Bob".to_string(), 120),
                ("Carla".to_string(), 23),
                ("Dora".to_string(), 0),
            ]
        );
        assert_eq!(snapshot_invalid_total(&snapshot), 16);
        assert_eq!(snapshot_cast_total(&snapshot), 205 + 11);
        assert_eq!(snapshot_voter_total(&snapshot), 550);
    }

    #[test]
    fn serialized_round_trip() {
        let mut seat = conforming_seat();
        seat.candidates[0].photo_url = Some("https://example.org/a.png".to_string());
        let snapshot = Snapshot::new(vec![seat, seat_with(vec![center(9, 0, &[], 0, false)])]);

        let js = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&js).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn serialized_format() {
        let seat = seat_with(vec![center(1, 10, &[("a", 2)], 1, true)]);
        let js = serde_json::to_value(&Snapshot::new(vec![seat])).unwrap();
        assert!(js.is_array());
        let c = &js[0]["centers"][0];
        assert_eq!(c["centerId"], 1);
        assert_eq!(c["totalVoters"], 10);
        assert_eq!(c["votes"]["a"], 2);
        assert_eq!(c["invalidVotes"], 1);
        assert_eq!(c["isReported"], true);
        assert!(js[0]["candidates"][0].get("photoUrl").is_none());
    }

    #[test]
    fn corrupted_counts_saturate() {
        let js = r##"[{"id":"s","name":"S",
            "candidates":[{"id":"a","name":"Anna","party":"Blue","symbol":"Boat","color":"#00f"}],
            "centers":[
              {"centerId":1,"centerName":"C1","totalVoters":18446744073709551615,
               "votes":{"a":18446744073709551615,"ghost":5},"invalidVotes":18446744073709551615,"isReported":true},
              {"centerId":2,"centerName":"C2","totalVoters":3,"votes":{"a":1},"invalidVotes":1,"isReported":true}]}]"##;
        let snapshot: Snapshot = serde_json::from_str(js).unwrap();
        let seat = &snapshot.seats[0];

        assert_eq!(candidate_total(seat, "a"), u64::MAX);
        assert_eq!(seat_invalid_total(seat), u64::MAX);
        assert_eq!(seat_cast_total(seat), u64::MAX);
        assert_eq!(seat_voter_total(seat), u64::MAX);
        assert_eq!(center_cast_total(&seat.centers[0]), u64::MAX);
        assert_eq!(turnout_ratio(seat), 1.0);
        assert_eq!(seat_standings(seat)[0].votes, u64::MAX);
        assert_eq!(leading_candidate(seat).map(|c| c.id.as_str()), Some("a"));

        let twice = Snapshot::new(vec![seat.clone(), seat.clone()]);
        assert_eq!(
            global_candidate_totals(&twice),
            vec![("Anna".to_string(), u64::MAX)]
        );
        assert_eq!(snapshot_cast_total(&twice), u64::MAX);
        assert_eq!(snapshot_invalid_total(&twice), u64::MAX);
        assert_eq!(snapshot_voter_total(&twice), u64::MAX);
    }

    #[test]
    fn older_documents_without_invalid_votes() {
        let js = r#"[{"id":"s","name":"S","candidates":[],
            "centers":[{"centerId":1,"centerName":"C","totalVoters":5,"votes":{},"isReported":false}]}]"#;
        let snapshot: Snapshot = serde_json::from_str(js).unwrap();
        assert_eq!(snapshot.seats[0].centers[0].invalid_votes, 0);
    }
}

// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Votes recorded at a center, keyed by candidate id.
///
/// Keys do not need to cover all the candidates of a seat: a missing key
/// counts as zero votes. Keys that do not match any candidate are kept
/// as entered but ignored by the aggregation functions.
pub type VoteMap = BTreeMap<String, u64>;

/// A candidate running for a seat.
///
/// The identity of a candidate is its `id`, which is unique within a seat.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    pub party: String,
    pub symbol: String,
    pub color: String,
    #[serde(rename = "photoUrl", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
}

/// A polling center, reporting votes for one seat.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Center {
    #[serde(rename = "centerId")]
    pub center_id: u32,
    #[serde(rename = "centerName")]
    pub center_name: String,
    #[serde(rename = "totalVoters")]
    pub total_voters: u64,
    #[serde(default)]
    pub votes: VoteMap,
    // Older documents were written before invalid votes were tracked.
    #[serde(rename = "invalidVotes", default)]
    pub invalid_votes: u64,
    #[serde(rename = "isReported", default)]
    pub is_reported: bool,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: String,
    pub name: String,
    pub candidates: Vec<Candidate>,
    pub centers: Vec<Center>,
}

impl Seat {
    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }

    pub fn center(&self, center_id: u32) -> Option<&Center> {
        self.centers.iter().find(|c| c.center_id == center_id)
    }
}

/// All the seats of the election, with everything recorded so far.
///
/// This is the unit of persistence and synchronization. It is never
/// modified in place: every change produces a new value (see
/// [`crate::reducer::apply_center_update`]). Two snapshots are the same
/// when their contents are equal.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub seats: Vec<Seat>,
}

impl Snapshot {
    pub fn new(seats: Vec<Seat>) -> Snapshot {
        Snapshot { seats }
    }

    pub fn seat(&self, seat_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == seat_id)
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

// ******** Output data structures *********

/// The position of one candidate in a seat.
#[derive(PartialEq, Debug, Clone)]
pub struct Standing {
    pub candidate: Candidate,
    pub votes: u64,
    /// Share of all the votes cast in the seat, invalid votes included.
    pub percentage: f64,
}

/// A center update that passed validation.
///
/// The votes and invalid votes are normalized: negative entries have been
/// replaced by zero.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AcceptedEntry {
    pub votes: VoteMap,
    pub invalid_votes: u64,
    pub total_entered: u64,
}

impl AcceptedEntry {
    /// How full the center is with this entry, in percent of the registered voters.
    pub fn fill_percentage(&self, total_voters: u64) -> f64 {
        crate::percentage_of_total(self.total_entered, total_voters)
    }
}

/// Errors that prevent a center update from being accepted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ValidationError {
    /// More votes were entered than there are registered voters.
    OverCapacity {
        total_entered: u64,
        total_voters: u64,
    },
}

impl Error for ValidationError {}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::OverCapacity {
                total_entered,
                total_voters,
            } => write!(
                f,
                "{} votes entered for a center with {} registered voters",
                total_entered, total_voters
            ),
        }
    }
}

/// Errors found while assembling a snapshot with the builder.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BuildError {
    DuplicateSeat(String),
    DuplicateCandidate { seat_id: String, candidate_id: String },
    DuplicateCenter { seat_id: String, center_id: u32 },
    NoSeat,
}

impl Error for BuildError {}

impl Display for BuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildError::DuplicateSeat(id) => write!(f, "seat {} is declared twice", id),
            BuildError::DuplicateCandidate {
                seat_id,
                candidate_id,
            } => write!(
                f,
                "candidate {} is declared twice in seat {}",
                candidate_id, seat_id
            ),
            BuildError::DuplicateCenter { seat_id, center_id } => write!(
                f,
                "center {} is declared twice in seat {}",
                center_id, seat_id
            ),
            BuildError::NoSeat => write!(f, "a seat must be started before adding to it"),
        }
    }
}

pub use crate::config::*;

/// A builder for assembling a snapshot, seat by seat.
///
/// Candidates and centers are always added to the seat that was started last.
///
/// ```
/// pub use election_results::builder::Builder;
/// # use election_results::BuildError;
///
/// let snapshot = Builder::new()
///     .seat("north", "North")?
///     .candidate("anna", "Anna", "Blue Party", "Boat", "#1d4ed8")?
///     .candidate("bob", "Bob", "Green Party", "Tree", "#15803d")?
///     .center(1, "North Primary School", 1200)?
///     .build();
///
/// assert_eq!(snapshot.seats[0].candidates.len(), 2);
/// # Ok::<(), BuildError>(())
/// ```
#[derive(Default)]
pub struct Builder {
    pub(crate) _seats: Vec<Seat>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder { _seats: Vec::new() }
    }

    /// Starts a new seat. Seat ids must be unique across the snapshot.
    pub fn seat(mut self, id: &str, name: &str) -> Result<Builder, BuildError> {
        if self._seats.iter().any(|s| s.id == id) {
            return Err(BuildError::DuplicateSeat(id.to_string()));
        }
        self._seats.push(Seat {
            id: id.to_string(),
            name: name.to_string(),
            candidates: Vec::new(),
            centers: Vec::new(),
        });
        Ok(self)
    }

    pub fn candidate(
        mut self,
        id: &str,
        name: &str,
        party: &str,
        symbol: &str,
        color: &str,
    ) -> Result<Builder, BuildError> {
        self.add_candidate(Candidate {
            id: id.to_string(),
            name: name.to_string(),
            party: party.to_string(),
            symbol: symbol.to_string(),
            color: color.to_string(),
            photo_url: None,
        })?;
        Ok(self)
    }

    /// Adds a center that has not reported anything yet.
    pub fn center(
        mut self,
        center_id: u32,
        name: &str,
        total_voters: u64,
    ) -> Result<Builder, BuildError> {
        self.add_center(Center {
            center_id,
            center_name: name.to_string(),
            total_voters,
            votes: VoteMap::new(),
            invalid_votes: 0,
            is_reported: false,
        })?;
        Ok(self)
    }

    pub fn add_candidate(&mut self, candidate: Candidate) -> Result<(), BuildError> {
        let seat = self._seats.last_mut().ok_or(BuildError::NoSeat)?;
        if seat.candidates.iter().any(|c| c.id == candidate.id) {
            return Err(BuildError::DuplicateCandidate {
                seat_id: seat.id.clone(),
                candidate_id: candidate.id,
            });
        }
        seat.candidates.push(candidate);
        Ok(())
    }

    /// Adds a center as is, including any votes it already carries.
    ///
    /// The capacity rule is not checked here: use the validator for entries
    /// coming from an operator.
    pub fn add_center(&mut self, center: Center) -> Result<(), BuildError> {
        let seat = self._seats.last_mut().ok_or(BuildError::NoSeat)?;
        if seat.centers.iter().any(|c| c.center_id == center.center_id) {
            return Err(BuildError::DuplicateCenter {
                seat_id: seat.id.clone(),
                center_id: center.center_id,
            });
        }
        seat.centers.push(center);
        Ok(())
    }

    pub fn build(self) -> Snapshot {
        Snapshot::new(self._seats)
    }
}

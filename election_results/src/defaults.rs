// The dataset used when nothing has been stored yet, and after a reset.

use crate::config::*;

struct SeatDef {
    id: &'static str,
    name: &'static str,
    // id, name, party, symbol, color
    candidates: &'static [(&'static str, &'static str, &'static str, &'static str, &'static str)],
    // center id, name, registered voters
    centers: &'static [(u32, &'static str, u64)],
}

const PARTIES: [(&str, &str, &str); 3] = [
    ("People's Alliance", "Boat", "#16a34a"),
    ("National Front", "Sheaf", "#2563eb"),
    ("Independent", "Kettle", "#9333ea"),
];

const DEFAULT_SEATS: &[SeatDef] = &[
    SeatDef {
        id: "tangail-1",
        name: "Tangail-1",
        candidates: &[
            ("t1-pa", "Abdul Karim", PARTIES[0].0, PARTIES[0].1, PARTIES[0].2),
            ("t1-nf", "Rahima Khatun", PARTIES[1].0, PARTIES[1].1, PARTIES[1].2),
            ("t1-in", "Shafiqul Islam", PARTIES[2].0, PARTIES[2].1, PARTIES[2].2),
        ],
        centers: &[
            (1, "Madhupur Government High School", 2450),
            (2, "Dhanbari Pilot Girls School", 1980),
            (3, "Aronkhola Union Parishad", 2210),
        ],
    },
    SeatDef {
        id: "tangail-2",
        name: "Tangail-2",
        candidates: &[
            ("t2-pa", "Nasrin Akter", PARTIES[0].0, PARTIES[0].1, PARTIES[0].2),
            ("t2-nf", "Mizanur Rahman", PARTIES[1].0, PARTIES[1].1, PARTIES[1].2),
        ],
        centers: &[
            (1, "Gopalpur Degree College", 3020),
            (2, "Bhuapur Primary School", 2675),
        ],
    },
    SeatDef {
        id: "tangail-3",
        name: "Tangail-3",
        candidates: &[
            ("t3-pa", "Harun Or Rashid", PARTIES[0].0, PARTIES[0].1, PARTIES[0].2),
            ("t3-nf", "Sultana Parvin", PARTIES[1].0, PARTIES[1].1, PARTIES[1].2),
            ("t3-in", "Kamrul Hasan", PARTIES[2].0, PARTIES[2].1, PARTIES[2].2),
        ],
        centers: &[
            (1, "Ghatail Madrasa", 1890),
            (2, "Sagardighi High School", 2140),
            (3, "Deopara Community Center", 1560),
        ],
    },
    SeatDef {
        id: "tangail-5",
        name: "Tangail-5 (Sadar)",
        candidates: &[
            ("t5-pa", "Delwar Hossain", PARTIES[0].0, PARTIES[0].1, PARTIES[0].2),
            ("t5-nf", "Farzana Yasmin", PARTIES[1].0, PARTIES[1].1, PARTIES[1].2),
        ],
        centers: &[
            (1, "Bindubasini Boys School", 3310),
            (2, "Vivekananda High School", 2980),
            (3, "Kagmari Union Parishad", 2405),
        ],
    },
];

/// The built-in dataset: every seat with its candidates and centers, nothing reported.
pub fn default_snapshot() -> Snapshot {
    let seats = DEFAULT_SEATS
        .iter()
        .map(|def| Seat {
            id: def.id.to_string(),
            name: def.name.to_string(),
            candidates: def
                .candidates
                .iter()
                .map(|(id, name, party, symbol, color)| Candidate {
                    id: id.to_string(),
                    name: name.to_string(),
                    party: party.to_string(),
                    symbol: symbol.to_string(),
                    color: color.to_string(),
                    photo_url: None,
                })
                .collect(),
            centers: def
                .centers
                .iter()
                .map(|(center_id, name, total_voters)| Center {
                    center_id: *center_id,
                    center_name: name.to_string(),
                    total_voters: *total_voters,
                    votes: VoteMap::new(),
                    invalid_votes: 0,
                    is_reported: false,
                })
                .collect(),
        })
        .collect();
    Snapshot::new(seats)
}

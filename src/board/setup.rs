//! Initial piece layouts.
//!
//! A layout lists the 25 `(station, rank)` placements of one player, in
//! that player's own frame (rows 1..6). Placement rules: no camps, the flag
//! on a headquarters, landmines on the two back rows, bombs off the front
//! row.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use super::piece::{Rank, ALL_RANKS, PIECES_PER_SIDE, RANK_COUNT};
use super::station::{Station, Zone, ALL_STATIONS, FRONT_ROW, STATION_COUNT};

/// Errors raised while validating or generating a layout.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("expected {expected} {rank} pieces, found {found}")]
    WrongCount { rank: Rank, expected: u8, found: u8 },

    #[error("station {0} is used twice")]
    DuplicateStation(Station),

    #[error("{rank} may not start on {station}")]
    BadPlacement { rank: Rank, station: Station },

    #[error("not enough room to place every {0}")]
    NoRoom(Rank),
}

/// Returns true if `rank` may start on `station` (own frame).
pub fn may_start_on(rank: Rank, station: Station) -> bool {
    if !station.is_own_half() || station.zone() == Zone::Camp {
        return false;
    }
    match rank {
        Rank::Flag => station.zone() == Zone::Headquarters,
        Rank::Landmine => station.row() <= 1,
        Rank::Bomb => station.row() != FRONT_ROW,
        _ => true,
    }
}

/// The 25 stations a player's pieces start on, in that player's frame.
pub fn starting_stations() -> impl Iterator<Item = Station> {
    ALL_STATIONS
        .into_iter()
        .filter(|s| s.is_own_half() && s.zone() != Zone::Camp)
}

/// The stations the opponent starts on, seen from our frame.
pub fn opponent_starting_stations() -> impl Iterator<Item = Station> {
    starting_stations().map(Station::rotated)
}

/// Ranks the opponent piece starting on `station` (our frame) could have.
pub fn opponent_start_ranks(station: Station) -> impl Iterator<Item = Rank> {
    let own_frame = station.rotated();
    ALL_RANKS
        .into_iter()
        .filter(move |&r| may_start_on(r, own_frame))
}

/// A validated initial layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    placements: Vec<(Station, Rank)>,
}

/// Placement order used when generating layouts: the most constrained
/// ranks go first.
const PLACEMENT_STEPS: [&[Rank]; 4] = [
    &[Rank::Flag],
    &[Rank::Landmine],
    &[Rank::Bomb],
    &[
        Rank::FieldMarshal,
        Rank::General,
        Rank::LieutenantGeneral,
        Rank::BrigadierGeneral,
        Rank::Colonel,
        Rank::Major,
        Rank::Captain,
        Rank::Commander,
        Rank::Engineer,
    ],
];

impl Layout {
    /// Validates a list of placements.
    pub fn new(placements: Vec<(Station, Rank)>) -> Result<Layout, LayoutError> {
        let mut used = [false; STATION_COUNT];
        let mut counts = [0u8; RANK_COUNT];

        for &(station, rank) in &placements {
            if used[station.index()] {
                return Err(LayoutError::DuplicateStation(station));
            }
            used[station.index()] = true;
            if !may_start_on(rank, station) {
                return Err(LayoutError::BadPlacement { rank, station });
            }
            counts[rank.index()] = counts[rank.index()].saturating_add(1);
        }

        for rank in ALL_RANKS {
            let found = counts[rank.index()];
            if found != rank.initial_count() {
                return Err(LayoutError::WrongCount {
                    rank,
                    expected: rank.initial_count(),
                    found,
                });
            }
        }
        debug_assert_eq!(placements.len(), PIECES_PER_SIDE);

        Ok(Layout { placements })
    }

    /// A fixed, reasonable layout.
    pub fn standard() -> Layout {
        #[rustfmt::skip]
        const STANDARD: [(&str, char); PIECES_PER_SIDE] = [
            ("A1", '1'), ("B1", 'F'), ("C1", '2'), ("D1", 'L'), ("E1", '5'),
            ("A2", 'L'), ("B2", '4'), ("C2", '7'), ("D2", '6'), ("E2", 'L'),
            ("A3", '1'), ("C3", '6'), ("E3", '1'),
            ("A4", '7'), ("B4", 'B'), ("D4", 'B'), ("E4", '3'),
            ("A5", '2'), ("C5", '3'), ("E5", '5'),
            ("A6", '8'), ("B6", '4'), ("C6", '9'), ("D6", '2'), ("E6", '3'),
        ];
        let placements = STANDARD
            .iter()
            .filter_map(|&(s, c)| Some((Station::parse(s)?, Rank::from_symbol(c)?)))
            .collect();
        Layout { placements }
    }

    /// Generates a random legal layout.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Result<Layout, LayoutError> {
        let mut free: Vec<Station> = starting_stations().collect();
        let mut placements = Vec::with_capacity(PIECES_PER_SIDE);

        for step in PLACEMENT_STEPS {
            for &rank in step {
                let mut choices: Vec<Station> = free
                    .iter()
                    .copied()
                    .filter(|&s| may_start_on(rank, s))
                    .collect();
                let count = rank.initial_count() as usize;
                if choices.len() < count {
                    return Err(LayoutError::NoRoom(rank));
                }
                choices.shuffle(rng);
                for &station in &choices[..count] {
                    placements.push((station, rank));
                    free.retain(|&s| s != station);
                }
            }
        }

        placements.sort();
        Layout::new(placements)
    }

    pub fn placements(&self) -> &[(Station, Rank)] {
        &self.placements
    }

    /// Rank placed on `station`, if any.
    pub fn rank_at(&self, station: Station) -> Option<Rank> {
        self.placements
            .iter()
            .find(|&&(s, _)| s == station)
            .map(|&(_, r)| r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn st(name: &str) -> Station {
        Station::parse(name).unwrap()
    }

    #[test]
    fn standard_layout_is_valid() {
        let layout = Layout::standard();
        assert_eq!(layout.placements().len(), PIECES_PER_SIDE);
        assert!(Layout::new(layout.placements().to_vec()).is_ok());
        assert_eq!(layout.rank_at(st("B1")), Some(Rank::Flag));
        assert_eq!(layout.rank_at(st("C4")), None);
    }

    #[test]
    fn twenty_five_starting_stations() {
        assert_eq!(starting_stations().count(), PIECES_PER_SIDE);
        assert!(opponent_starting_stations().all(|s| !s.is_own_half()));
    }

    #[test]
    fn random_layouts_are_valid() {
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..50 {
            let layout = Layout::random(&mut rng).unwrap();
            assert_eq!(layout.placements().len(), PIECES_PER_SIDE);
        }
    }

    #[test]
    fn random_layout_is_reproducible_with_seed() {
        let a = Layout::random(&mut SmallRng::seed_from_u64(7)).unwrap();
        let b = Layout::random(&mut SmallRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_bad_placements() {
        let mut placements = Layout::standard().placements().to_vec();
        // Move the flag off the headquarters.
        let flag = placements.iter().position(|&(_, r)| r == Rank::Flag).unwrap();
        let c1 = placements.iter().position(|&(s, _)| s == st("C1")).unwrap();
        placements[flag].1 = Rank::Commander;
        placements[c1].1 = Rank::Flag;
        assert_eq!(
            Layout::new(placements),
            Err(LayoutError::BadPlacement {
                rank: Rank::Flag,
                station: st("C1")
            })
        );
    }

    #[test]
    fn rejects_camps_and_duplicates() {
        let mut placements = Layout::standard().placements().to_vec();
        placements[0].0 = st("C4");
        assert!(matches!(
            Layout::new(placements),
            Err(LayoutError::BadPlacement { .. })
        ));

        let mut placements = Layout::standard().placements().to_vec();
        placements[1].0 = placements[0].0;
        assert_eq!(
            Layout::new(placements.clone()),
            Err(LayoutError::DuplicateStation(placements[0].0))
        );
    }

    #[test]
    fn rejects_wrong_counts() {
        let mut placements = Layout::standard().placements().to_vec();
        placements.pop();
        assert!(matches!(
            Layout::new(placements),
            Err(LayoutError::WrongCount { .. })
        ));
    }

    #[test]
    fn opponent_ranks_follow_mirrored_rules() {
        // The opponent's headquarters may hold the flag or a landmine.
        let hq: Vec<Rank> = opponent_start_ranks(st("B12")).collect();
        assert!(hq.contains(&Rank::Flag));
        assert!(hq.contains(&Rank::Landmine));

        let front: Vec<Rank> = opponent_start_ranks(st("A7")).collect();
        assert!(!front.contains(&Rank::Bomb));
        assert!(!front.contains(&Rank::Landmine));
        assert!(!front.contains(&Rank::Flag));
    }
}

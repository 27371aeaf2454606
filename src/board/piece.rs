//! Piece ranks, sides and players.
//!
//! Ranks are indexed `0..RANK_COUNT` so per-rank tables (counts, values,
//! probabilities) can be plain arrays. `RankSet` is a bitmask over ranks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of distinct ranks.
pub const RANK_COUNT: usize = 12;

/// Number of pieces each player starts with.
pub const PIECES_PER_SIDE: usize = 25;

/// A piece rank. Officers carry an order (1..9); the rest resolve combat
/// by special rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Rank {
    Engineer = 0,
    Commander = 1,
    Captain = 2,
    Major = 3,
    Colonel = 4,
    BrigadierGeneral = 5,
    LieutenantGeneral = 6,
    General = 7,
    FieldMarshal = 8,
    Bomb = 9,
    Landmine = 10,
    Flag = 11,
}

/// All ranks in index order.
pub const ALL_RANKS: [Rank; RANK_COUNT] = [
    Rank::Engineer,
    Rank::Commander,
    Rank::Captain,
    Rank::Major,
    Rank::Colonel,
    Rank::BrigadierGeneral,
    Rank::LieutenantGeneral,
    Rank::General,
    Rank::FieldMarshal,
    Rank::Bomb,
    Rank::Landmine,
    Rank::Flag,
];

impl Rank {
    /// Array index of this rank.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the rank with the given index.
    pub fn from_index(idx: usize) -> Option<Rank> {
        ALL_RANKS.get(idx).copied()
    }

    /// Combat order for officers (Engineer = 1 .. Field Marshal = 9).
    pub const fn order(self) -> Option<u8> {
        match self {
            Rank::Bomb | Rank::Landmine | Rank::Flag => None,
            officer => Some(officer as u8 + 1),
        }
    }

    /// How many pieces of this rank each player starts with.
    pub const fn initial_count(self) -> u8 {
        match self {
            Rank::Engineer | Rank::Commander | Rank::Captain => 3,
            Rank::Major | Rank::Colonel | Rank::BrigadierGeneral | Rank::LieutenantGeneral => 2,
            Rank::General | Rank::FieldMarshal => 1,
            Rank::Bomb => 2,
            Rank::Landmine => 3,
            Rank::Flag => 1,
        }
    }

    /// Returns false for pieces that never leave their station.
    pub const fn is_mobile(self) -> bool {
        !matches!(self, Rank::Landmine | Rank::Flag)
    }

    /// Single-character protocol symbol.
    pub const fn symbol(self) -> char {
        match self {
            Rank::Bomb => 'B',
            Rank::Landmine => 'L',
            Rank::Flag => 'F',
            officer => (b'1' + officer as u8) as char,
        }
    }

    /// Parses a rank from its protocol symbol.
    pub fn from_symbol(c: char) -> Option<Rank> {
        match c.to_ascii_uppercase() {
            'B' => Some(Rank::Bomb),
            'L' => Some(Rank::Landmine),
            'F' => Some(Rank::Flag),
            '1'..='9' => Rank::from_index((c as u8 - b'1') as usize),
            _ => None,
        }
    }

    /// Display name.
    pub const fn name(self) -> &'static str {
        match self {
            Rank::Engineer => "Engineer",
            Rank::Commander => "Commander",
            Rank::Captain => "Captain",
            Rank::Major => "Major",
            Rank::Colonel => "Colonel",
            Rank::BrigadierGeneral => "Brigadier General",
            Rank::LieutenantGeneral => "Lieutenant General",
            Rank::General => "General",
            Rank::FieldMarshal => "Field Marshal",
            Rank::Bomb => "Bomb",
            Rank::Landmine => "Landmine",
            Rank::Flag => "Flag",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of ranks stored as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RankSet(u16);

impl RankSet {
    pub const EMPTY: RankSet = RankSet(0);
    pub const ALL: RankSet = RankSet((1 << RANK_COUNT) - 1);
    /// Every rank except the landmine and the flag.
    pub const MOBILE: RankSet =
        RankSet(Self::ALL.0 & !(1 << Rank::Landmine as u16) & !(1 << Rank::Flag as u16));

    /// The set holding only `rank`.
    pub const fn single(rank: Rank) -> RankSet {
        RankSet(1 << rank as u16)
    }

    /// Membership test.
    pub const fn contains(self, rank: Rank) -> bool {
        self.0 & (1 << rank as u16) != 0
    }

    /// Adds `rank` to the set.
    pub fn insert(&mut self, rank: Rank) {
        self.0 |= 1 << rank as u16;
    }

    /// Removes `rank` from the set.
    pub fn remove(&mut self, rank: Rank) {
        self.0 &= !(1 << rank as u16);
    }

    /// Ranks present in both sets.
    pub const fn intersect(self, other: RankSet) -> RankSet {
        RankSet(self.0 & other.0)
    }

    /// Returns true if no rank is left.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of ranks in the set.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Returns the only member if the set has exactly one rank.
    pub fn only(self) -> Option<Rank> {
        if self.len() == 1 {
            Rank::from_index(self.0.trailing_zeros() as usize)
        } else {
            None
        }
    }

    /// Members in rank order.
    pub fn iter(self) -> impl Iterator<Item = Rank> {
        ALL_RANKS.into_iter().filter(move |&r| self.contains(r))
    }
}

impl FromIterator<Rank> for RankSet {
    fn from_iter<I: IntoIterator<Item = Rank>>(iter: I) -> Self {
        let mut set = RankSet::EMPTY;
        for r in iter {
            set.insert(r);
        }
        set
    }
}

/// Board-relative ownership: our pieces or the opponent's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Own,
    Opponent,
}

impl Side {
    pub const fn opposite(self) -> Side {
        match self {
            Side::Own => Side::Opponent,
            Side::Opponent => Side::Own,
        }
    }
}

/// Referee seat number. Player one moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    One,
    Two,
}

impl Player {
    pub const fn number(self) -> u8 {
        match self {
            Player::One => 1,
            Player::Two => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Player> {
        match n {
            1 => Some(Player::One),
            2 => Some(Player::Two),
            _ => None,
        }
    }

    pub const fn opposite(self) -> Player {
        match self {
            Player::One => Player::Two,
            Player::Two => Player::One,
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Per-side piece identifier, stable for the whole game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceId(pub u8);

impl PieceId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A piece on the board.
///
/// `rank` is always known for our pieces. For opponent pieces it stays
/// `None` until the referee declares it; `revealed` marks a piece the
/// other side has observed (through combat or a declaration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Piece {
    pub id: PieceId,
    pub side: Side,
    pub rank: Option<Rank>,
    pub revealed: bool,
}

impl Piece {
    /// A piece of ours with a known rank.
    pub const fn own(id: PieceId, rank: Rank) -> Piece {
        Piece {
            id,
            side: Side::Own,
            rank: Some(rank),
            revealed: false,
        }
    }

    /// An opponent piece whose rank is hidden.
    pub const fn hidden(id: PieceId) -> Piece {
        Piece {
            id,
            side: Side::Opponent,
            rank: None,
            revealed: false,
        }
    }

    /// The same piece with a known rank.
    pub fn with_rank(mut self, rank: Rank) -> Piece {
        self.rank = Some(rank);
        self
    }

    /// Returns false if the piece is known to be immobile.
    pub fn may_move(&self) -> bool {
        self.rank.map_or(true, Rank::is_mobile)
    }
}

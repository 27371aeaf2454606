//! Probabilistic tracking of opponent piece ranks.
//!
//! Each opponent piece carries a set of ranks it may still have (hard
//! constraints from the placement rules and from observed play) and a
//! shared pool holds the expected number of each rank not yet pinned to a
//! piece. Distributions are the piece-by-rank matrix fitted to both: rows
//! sum to one, columns approach the pool.

mod distribution;

pub use distribution::RankDistribution;

use tracing::{debug, warn};

use crate::board::{
    opponent_start_ranks, opponent_starting_stations, Board, PieceId, Rank, RankSet, Side,
    ALL_RANKS, PIECES_PER_SIDE, RANK_COUNT,
};
use crate::resolve::{attackers_consistent_with, defenders_consistent_with, CombatOutcome};

/// Upper bound on fitting sweeps per update.
const FIT_ITERATIONS: usize = 200;

/// Largest row-sum drift accepted as converged.
const FIT_TOLERANCE: f64 = 1e-9;

/// An observation about one opponent piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeliefEvent {
    /// The piece's rank became known.
    Revealed { piece: PieceId, rank: Rank },
    /// The piece left the board.
    Removed { piece: PieceId },
    /// The piece moved, so it is not a landmine or the flag.
    Moved { piece: PieceId },
    /// The piece's rank is known to lie in `allowed`.
    Constrained { piece: PieceId, allowed: RankSet },
}

#[derive(Debug, Clone, Copy)]
struct PieceBelief {
    allowed: RankSet,
    resolved: Option<Rank>,
    alive: bool,
    dist: RankDistribution,
}

impl PieceBelief {
    fn absent() -> PieceBelief {
        PieceBelief {
            allowed: RankSet::ALL,
            resolved: None,
            alive: false,
            dist: RankDistribution::uniform(RankSet::ALL),
        }
    }
}

/// Belief over the ranks of every opponent piece.
#[derive(Debug, Clone)]
pub struct Belief {
    pool: [f64; RANK_COUNT],
    pieces: Vec<PieceBelief>,
}

impl Belief {
    /// Builds the belief for the opponent pieces on `board`.
    ///
    /// Pieces still on an opponent starting station get the placement
    /// constraints of that station; any other piece must have moved.
    pub fn new(board: &Board) -> Belief {
        let mut pool = ALL_RANKS.map(|r| r.initial_count() as f64);
        let mut pieces = vec![PieceBelief::absent(); PIECES_PER_SIDE];

        for (station, piece) in board.pieces(Side::Opponent) {
            if piece.id.index() >= pieces.len() {
                pieces.resize(piece.id.index() + 1, PieceBelief::absent());
            }
            let allowed = if opponent_starting_stations().any(|s| s == station) {
                opponent_start_ranks(station).collect()
            } else {
                RankSet::MOBILE
            };
            let entry = &mut pieces[piece.id.index()];
            entry.alive = true;
            entry.allowed = allowed;
            if let Some(rank) = piece.rank {
                entry.resolved = Some(rank);
                entry.allowed = RankSet::single(rank);
                entry.dist = RankDistribution::point(rank);
                pool[rank.index()] = (pool[rank.index()] - 1.0).max(0.0);
            }
        }

        let mut belief = Belief { pool, pieces };
        belief.refit();
        belief
    }

    /// Applies an observation and refits the distributions.
    pub fn update(&mut self, event: BeliefEvent) {
        debug!(?event, "belief update");
        match event {
            BeliefEvent::Revealed { piece, rank } => self.reveal(piece, rank),
            BeliefEvent::Removed { piece } => self.remove(piece),
            BeliefEvent::Moved { piece } => self.constrain(piece, RankSet::MOBILE),
            BeliefEvent::Constrained { piece, allowed } => self.constrain(piece, allowed),
        }
    }

    fn entry_mut(&mut self, piece: PieceId) -> Option<&mut PieceBelief> {
        let entry = self.pieces.get_mut(piece.index())?;
        entry.alive.then_some(entry)
    }

    fn reveal(&mut self, piece: PieceId, rank: Rank) {
        let Some(entry) = self.entry_mut(piece) else {
            warn!(piece = piece.0, %rank, "reveal for unknown piece");
            return;
        };
        match entry.resolved {
            Some(known) if known == rank => return,
            Some(known) => {
                warn!(piece = piece.0, %known, %rank, "conflicting reveal ignored");
                return;
            }
            None => {}
        }
        if !entry.allowed.contains(rank) {
            warn!(piece = piece.0, %rank, "revealed rank was ruled out");
        }
        entry.resolved = Some(rank);
        entry.allowed = RankSet::single(rank);
        entry.dist = RankDistribution::point(rank);
        let slot = &mut self.pool[rank.index()];
        *slot = (*slot - 1.0).max(0.0);
        self.refit();
    }

    fn remove(&mut self, piece: PieceId) {
        let Some(entry) = self.entry_mut(piece) else {
            return;
        };
        entry.alive = false;
        if entry.resolved.is_none() {
            let dist = entry.dist;
            for (rank, p) in dist.iter() {
                let slot = &mut self.pool[rank.index()];
                *slot = (*slot - p).max(0.0);
            }
        }
        self.refit();
    }

    fn constrain(&mut self, piece: PieceId, allowed: RankSet) {
        let Some(entry) = self.entry_mut(piece) else {
            return;
        };
        if let Some(rank) = entry.resolved {
            if !allowed.contains(rank) {
                warn!(piece = piece.0, %rank, "constraint contradicts known rank");
            }
            return;
        }
        let narrowed = entry.allowed.intersect(allowed);
        if narrowed.is_empty() {
            warn!(piece = piece.0, "constraint leaves no rank; ignored");
            return;
        }
        if let Some(rank) = narrowed.only() {
            self.reveal(piece, rank);
            return;
        }
        entry.allowed = narrowed;
        self.refit();
    }

    /// Fits the open pieces' distributions to their allowed sets and the
    /// pool by alternating column and row scaling.
    fn refit(&mut self) {
        let open: Vec<usize> = self
            .pieces
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alive && p.resolved.is_none())
            .map(|(i, _)| i)
            .collect();
        if open.is_empty() {
            return;
        }

        let mut matrix: Vec<[f64; RANK_COUNT]> = open
            .iter()
            .map(|&i| {
                let allowed = self.pieces[i].allowed;
                ALL_RANKS.map(|r| {
                    if allowed.contains(r) && self.pool[r.index()] > 0.0 {
                        1.0
                    } else {
                        0.0
                    }
                })
            })
            .collect();

        for _ in 0..FIT_ITERATIONS {
            for r in 0..RANK_COUNT {
                let column: f64 = matrix.iter().map(|row| row[r]).sum();
                if column > 0.0 {
                    let scale = self.pool[r] / column;
                    for row in matrix.iter_mut() {
                        row[r] *= scale;
                    }
                }
            }
            let mut drift: f64 = 0.0;
            for row in matrix.iter_mut() {
                let total: f64 = row.iter().sum();
                if total > 0.0 {
                    for x in row.iter_mut() {
                        *x /= total;
                    }
                    drift = drift.max((total - 1.0).abs());
                }
            }
            if drift < FIT_TOLERANCE {
                break;
            }
        }

        for (row, &i) in matrix.into_iter().zip(&open) {
            let entry = &mut self.pieces[i];
            entry.dist = RankDistribution::from_weights(row)
                .unwrap_or_else(|| RankDistribution::uniform(entry.allowed));
        }
    }

    /// Current distribution for a live opponent piece.
    pub fn distribution_for(&self, piece: PieceId) -> Option<&RankDistribution> {
        self.pieces
            .get(piece.index())
            .filter(|p| p.alive)
            .map(|p| &p.dist)
    }

    /// Known rank of a live piece, if resolved.
    pub fn resolved_rank(&self, piece: PieceId) -> Option<Rank> {
        self.pieces
            .get(piece.index())
            .filter(|p| p.alive)
            .and_then(|p| p.resolved)
    }

    /// Ranks a live piece may still have.
    pub fn allowed(&self, piece: PieceId) -> Option<RankSet> {
        self.pieces
            .get(piece.index())
            .filter(|p| p.alive)
            .map(|p| p.allowed)
    }

    /// Expected count of each rank not yet pinned to a piece.
    pub fn pool(&self) -> &[f64; RANK_COUNT] {
        &self.pool
    }

    pub fn pool_total(&self) -> f64 {
        self.pool.iter().sum()
    }

    /// Number of live pieces whose rank is not known.
    pub fn unresolved_count(&self) -> usize {
        self.pieces
            .iter()
            .filter(|p| p.alive && p.resolved.is_none())
            .count()
    }

    /// Number of live pieces.
    pub fn alive_count(&self) -> usize {
        self.pieces.iter().filter(|p| p.alive).count()
    }
}

/// Ranks the opponent piece may have, given the outcome of a fight with a
/// piece of known rank. `opponent_attacked` is true when the opponent piece
/// was the attacker.
pub fn ranks_consistent_with_combat(
    known: Rank,
    opponent_attacked: bool,
    outcome: CombatOutcome,
) -> RankSet {
    if opponent_attacked {
        attackers_consistent_with(known, outcome).collect()
    } else {
        defenders_consistent_with(known, outcome).collect()
    }
}

//! Heuristic position evaluation.
//!
//! Scores a position from our side's perspective using handcrafted
//! features: material (rank values, opponent pieces by expected value),
//! board control (distance to the enemy headquarters) and piece safety
//! (belief-weighted chance of losing a piece to an adjacent enemy).
//!
//! Distances come from the precomputed headquarters tables in
//! `board::station`; evaluation itself allocates nothing.

use serde::{Deserialize, Serialize};

use crate::belief::{Belief, RankDistribution};
use crate::board::station::{distance_to_headquarters, step_neighbors};
use crate::board::{Piece, Position, Rank, RankSet, Side, Terminal, Zone, RANK_COUNT};
use crate::resolve::{outcome_odds, CombatOutcome};

/// Score of a won position. Anything at or beyond this magnitude is a
/// forced result.
pub const WIN_SCORE: f64 = 10_000.0;

/// Tunable evaluation weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalWeights {
    /// Material value per rank, in rank index order.
    pub rank_values: [f64; RANK_COUNT],
    pub material: f64,
    pub control: f64,
    pub safety: f64,
}

impl Default for EvalWeights {
    fn default() -> Self {
        EvalWeights {
            rank_values: [
                3.0,  // engineer
                1.0,  // commander
                2.0,  // captain
                3.0,  // major
                4.5,  // colonel
                6.0,  // brigadier general
                8.0,  // lieutenant general
                10.0, // general
                14.0, // field marshal
                7.0,  // bomb
                3.0,  // landmine
                0.0,  // flag
            ],
            material: 1.0,
            control: 2.0,
            safety: 0.5,
        }
    }
}

impl EvalWeights {
    pub fn value(&self, rank: Rank) -> f64 {
        self.rank_values[rank.index()]
    }
}

/// Rank distribution of any piece: a point mass when the rank is on the
/// board, otherwise the belief's distribution.
pub fn rank_belief(piece: &Piece, belief: &Belief) -> RankDistribution {
    if let Some(rank) = piece.rank {
        return RankDistribution::point(rank);
    }
    belief
        .distribution_for(piece.id)
        .copied()
        .unwrap_or_else(|| RankDistribution::uniform(RankSet::ALL))
}

/// Distribution of a piece that is known to be attacking, so mobile.
pub fn mover_belief(piece: &Piece, belief: &Belief) -> RankDistribution {
    let dist = rank_belief(piece, belief);
    dist.conditioned(RankSet::MOBILE)
        .unwrap_or_else(|| RankDistribution::uniform(RankSet::MOBILE))
}

fn control_term(station_distance: u8) -> f64 {
    if station_distance == u8::MAX {
        return 0.0;
    }
    1.0 / (1.0 + station_distance as f64)
}

/// Probability that `defender` does not survive an attack by `attacker`.
fn loss_probability(attacker: &RankDistribution, defender: &RankDistribution) -> f64 {
    let odds = outcome_odds(attacker, defender);
    1.0 - odds.probability(CombatOutcome::DefenderWins)
}

/// Evaluates the position from our side's perspective.
///
/// Components:
/// - Terminal positions score `±WIN_SCORE` (draws score 0)
/// - Material balance
/// - Control: mobile pieces near the enemy headquarters
/// - Safety: expected value at risk from adjacent enemies, both ways
pub fn evaluate(pos: &Position, belief: &Belief, weights: &EvalWeights) -> f64 {
    match pos.terminal {
        Some(Terminal::Winner(Side::Own)) => return WIN_SCORE,
        Some(Terminal::Winner(Side::Opponent)) => return -WIN_SCORE,
        Some(Terminal::Draw) => return 0.0,
        None => {}
    }

    let to_theirs = distance_to_headquarters(false);
    let to_ours = distance_to_headquarters(true);

    let mut material = 0.0;
    let mut control = 0.0;
    let mut safety = 0.0;

    for (station, piece) in pos.board.pieces(Side::Own) {
        let Some(rank) = piece.rank else { continue };
        material += weights.value(rank);
        if rank.is_mobile() && station.zone() != Zone::Headquarters {
            control += control_term(to_theirs[station.index()]);
        }
        if station.zone() == Zone::Camp {
            continue;
        }
        let own_dist = RankDistribution::point(rank);
        for &n in step_neighbors(station) {
            let Some(enemy) = pos.board.get(n) else { continue };
            if enemy.side != Side::Opponent || n.zone() == Zone::Headquarters {
                continue;
            }
            let threat = loss_probability(&mover_belief(&enemy, belief), &own_dist);
            safety -= threat * weights.value(rank);
        }
    }

    for (station, piece) in pos.board.pieces(Side::Opponent) {
        let dist = rank_belief(&piece, belief);
        material -= dist.expect(|r| weights.value(r));
        if station.zone() != Zone::Headquarters {
            control -= dist.mass(RankSet::MOBILE) * control_term(to_ours[station.index()]);
        }
        if station.zone() == Zone::Camp {
            continue;
        }
        for &n in step_neighbors(station) {
            let Some(own) = pos.board.get(n) else { continue };
            let Some(rank) = own.rank else { continue };
            if own.side != Side::Own || !rank.is_mobile() || n.zone() == Zone::Headquarters {
                continue;
            }
            let hit = loss_probability(&RankDistribution::point(rank), &dist);
            safety += hit * dist.expect(|r| weights.value(r));
        }
    }

    weights.material * material + weights.control * control + weights.safety * safety
}

/// Evaluates the position from the side to move's perspective.
pub fn evaluate_for_mover(pos: &Position, belief: &Belief, weights: &EvalWeights) -> f64 {
    let score = evaluate(pos, belief, weights);
    match pos.to_move {
        Side::Own => score,
        Side::Opponent => -score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, GameState, Layout, PieceId, Player, Station};

    fn st(name: &str) -> Station {
        Station::parse(name).unwrap()
    }

    fn eval(pos: &Position) -> f64 {
        let belief = Belief::new(&pos.board);
        evaluate(pos, &belief, &EvalWeights::default())
    }

    #[test]
    fn initial_position_is_roughly_balanced() {
        let state = GameState::new(&Layout::standard(), Player::One);
        let score = eval(&state.position);
        assert!(score.abs() < 20.0, "score {}", score);
    }

    #[test]
    fn terminal_scores() {
        let mut pos = Position::new(Board::empty(), Side::Own);
        pos.terminal = Some(Terminal::Winner(Side::Own));
        assert_eq!(eval(&pos), WIN_SCORE);
        pos.terminal = Some(Terminal::Winner(Side::Opponent));
        assert_eq!(eval(&pos), -WIN_SCORE);
        pos.terminal = Some(Terminal::Draw);
        assert_eq!(eval(&pos), 0.0);
    }

    #[test]
    fn material_advantage_scores_higher() {
        let mut board = Board::empty();
        board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
        board.place(st("A3"), Piece::own(PieceId(1), Rank::General));
        board.place(st("B12"), Piece::hidden(PieceId(0)).with_rank(Rank::Flag));
        board.place(st("A10"), Piece::hidden(PieceId(1)).with_rank(Rank::Captain));
        let ahead = Position::new(board, Side::Own);

        let mut board = Board::empty();
        board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
        board.place(st("A3"), Piece::own(PieceId(1), Rank::Captain));
        board.place(st("B12"), Piece::hidden(PieceId(0)).with_rank(Rank::Flag));
        board.place(st("A10"), Piece::hidden(PieceId(1)).with_rank(Rank::General));
        let behind = Position::new(board, Side::Own);

        assert!(eval(&ahead) > eval(&behind));
    }

    #[test]
    fn advancing_improves_control() {
        let place = |s: &str| {
            let mut board = Board::empty();
            board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
            board.place(st(s), Piece::own(PieceId(1), Rank::Colonel));
            board.place(st("B12"), Piece::hidden(PieceId(0)).with_rank(Rank::Flag));
            Position::new(board, Side::Own)
        };
        assert!(eval(&place("C9")) > eval(&place("C3")));
    }

    #[test]
    fn exposed_piece_is_penalised() {
        let place = |enemy: &str| {
            let mut board = Board::empty();
            board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
            board.place(st("A6"), Piece::own(PieceId(1), Rank::Captain));
            board.place(st("B12"), Piece::hidden(PieceId(0)).with_rank(Rank::Flag));
            board.place(st(enemy), Piece::hidden(PieceId(1)).with_rank(Rank::General));
            Position::new(board, Side::Own)
        };
        // Same material; the general next to our captain threatens it.
        assert!(eval(&place("A7")) < eval(&place("E11")));
    }

    #[test]
    fn mover_belief_excludes_immobile_ranks() {
        let belief = Belief::new(&Board::empty());
        let d = mover_belief(&Piece::hidden(PieceId(0)), &belief);
        assert_eq!(d.probability(Rank::Flag), 0.0);
        assert_eq!(d.probability(Rank::Landmine), 0.0);
    }

    #[test]
    fn weights_roundtrip_through_json() {
        let weights = EvalWeights::default();
        let json = serde_json::to_string(&weights).unwrap();
        let back: EvalWeights = serde_json::from_str(&json).unwrap();
        assert_eq!(weights, back);
        let partial: EvalWeights = serde_json::from_str(r#"{"safety": 2.0}"#).unwrap();
        assert_eq!(partial.safety, 2.0);
        assert_eq!(partial.material, 1.0);
    }
}

//! Iterative-deepening negamax with chance nodes.
//!
//! Combat against a piece of unknown rank expands into one child per
//! possible outcome, weighted by the outcome odds of the two rank
//! distributions. Alpha-beta pruning applies at decision nodes only;
//! chance children are searched with a full window.
//!
//! Each completed depth is sent to the controller as a `Checkpoint`. A
//! depth interrupted by the budget is discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;

use rayon::prelude::*;
use tracing::debug;

use super::budget::TimeBudget;
use super::SearchConfig;
use crate::belief::{Belief, RankDistribution};
use crate::board::{Move, Position, Side};
use crate::eval::{evaluate_for_mover, mover_belief, rank_belief, EvalWeights, WIN_SCORE};
use crate::movegen::legal_moves;
use crate::resolve::{outcome_odds, CombatOutcome};

/// Best move of one completed depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub mv: Move,
    pub score: f64,
    pub depth: u32,
    pub nodes: u64,
}

/// Read-only state shared by every search worker.
struct Context<'a> {
    belief: &'a Belief,
    weights: &'a EvalWeights,
    budget: &'a TimeBudget,
    nodes: &'a AtomicU64,
}

/// Possible outcomes of `mv` with their probabilities.
pub fn move_outcomes(pos: &Position, mv: Move, belief: &Belief) -> Vec<(CombatOutcome, f64)> {
    let (Some(attacker), Some(defender)) = (pos.board.get(mv.origin), pos.board.get(mv.dest)) else {
        return vec![(CombatOutcome::NoContact, 1.0)];
    };
    let attacker_dist = match attacker.side {
        Side::Own => rank_belief(&attacker, belief),
        Side::Opponent => mover_belief(&attacker, belief),
    };
    let defender_dist: RankDistribution = rank_belief(&defender, belief);
    outcome_odds(&attacker_dist, &defender_dist).iter().collect()
}

/// Attacks first, quiet moves after; stable otherwise.
fn ordered(pos: &Position, mut moves: Vec<Move>) -> Vec<Move> {
    moves.sort_by_key(|mv| pos.board.get(mv.dest).is_none());
    moves
}

/// Value of playing `mv` in `pos`, from the mover's perspective.
fn move_value(
    ctx: &Context,
    pos: &Position,
    mv: Move,
    depth: u32,
    alpha: f64,
    beta: f64,
) -> Option<f64> {
    let outcomes = move_outcomes(pos, mv, ctx.belief);
    if let [(outcome, _)] = outcomes.as_slice() {
        let child = pos.play_unchecked(mv, *outcome);
        return Some(-negamax(ctx, &child, depth, -beta, -alpha)?);
    }
    let mut expected = 0.0;
    for (outcome, p) in outcomes {
        let child = pos.play_unchecked(mv, outcome);
        expected += p * -negamax(ctx, &child, depth, -f64::INFINITY, f64::INFINITY)?;
    }
    Some(expected)
}

/// Negamax score of `pos` for its side to move, or `None` when the budget
/// ran out.
fn negamax(ctx: &Context, pos: &Position, depth: u32, mut alpha: f64, beta: f64) -> Option<f64> {
    ctx.nodes.fetch_add(1, Ordering::Relaxed);
    if ctx.budget.expired() {
        return None;
    }
    if depth == 0 || pos.is_terminal() {
        return Some(evaluate_for_mover(pos, ctx.belief, ctx.weights));
    }
    let moves = legal_moves(pos, pos.to_move);
    if moves.is_empty() {
        return Some(evaluate_for_mover(pos, ctx.belief, ctx.weights));
    }

    let mut best = f64::NEG_INFINITY;
    for mv in ordered(pos, moves) {
        let value = move_value(ctx, pos, mv, depth - 1, alpha, beta)?;
        if value > best {
            best = value;
        }
        if best > alpha {
            alpha = best;
        }
        if alpha >= beta {
            break;
        }
    }
    Some(best)
}

/// Runs iterative deepening over `root_moves`, sending a checkpoint after
/// each completed depth. Returns true if every requested depth completed
/// (or a forced result was found) without interruption.
pub(super) fn iterative_deepening(
    pos: &Position,
    belief: &Belief,
    budget: &TimeBudget,
    config: &SearchConfig,
    root_moves: &[Move],
    nodes: &AtomicU64,
    checkpoints: Sender<Checkpoint>,
) -> bool {
    let ctx = Context {
        belief,
        weights: &config.weights,
        budget,
        nodes,
    };

    for depth in 1..=config.max_depth.max(1) {
        let scores: Vec<Option<f64>> = root_moves
            .par_iter()
            .map(|&mv| move_value(&ctx, pos, mv, depth - 1, -f64::INFINITY, f64::INFINITY))
            .collect();

        let mut best: Option<(Move, f64)> = None;
        for (&mv, score) in root_moves.iter().zip(&scores) {
            let Some(score) = *score else {
                debug!(depth, "depth interrupted");
                return false;
            };
            // Strictly greater keeps the smallest move on ties.
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((mv, score));
            }
        }
        let Some((mv, score)) = best else {
            return true;
        };

        let checkpoint = Checkpoint {
            mv,
            score,
            depth,
            nodes: nodes.load(Ordering::Relaxed),
        };
        debug!(
            depth,
            nodes = checkpoint.nodes,
            score,
            best = %mv,
            elapsed_ms = budget.elapsed().as_millis() as u64,
            "depth complete"
        );
        if checkpoints.send(checkpoint).is_err() {
            return false;
        }
        if score.abs() >= WIN_SCORE {
            break;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Piece, PieceId, Rank, Station};

    fn st(name: &str) -> Station {
        Station::parse(name).unwrap()
    }

    #[test]
    fn hidden_defender_expands_to_several_outcomes() {
        let mut board = Board::empty();
        board.place(st("A6"), Piece::own(PieceId(0), Rank::Colonel));
        board.place(st("A7"), Piece::hidden(PieceId(0)));
        let pos = Position::new(board, Side::Own);
        let belief = Belief::new(&pos.board);

        let outcomes = move_outcomes(&pos, Move::new(st("A6"), st("A7")), &belief);
        assert!(outcomes.len() > 1);
        let total: f64 = outcomes.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);

        let quiet = move_outcomes(&pos, Move::new(st("A6"), st("A5")), &belief);
        assert_eq!(quiet, vec![(CombatOutcome::NoContact, 1.0)]);
    }

    #[test]
    fn known_ranks_give_a_single_outcome() {
        let mut board = Board::empty();
        board.place(st("A6"), Piece::own(PieceId(0), Rank::Colonel));
        board.place(st("A7"), Piece::hidden(PieceId(0)).with_rank(Rank::Major));
        let pos = Position::new(board, Side::Own);
        let belief = Belief::new(&pos.board);
        let outcomes = move_outcomes(&pos, Move::new(st("A6"), st("A7")), &belief);
        assert_eq!(outcomes, vec![(CombatOutcome::AttackerWins, 1.0)]);
    }

    #[test]
    fn attacks_are_ordered_first() {
        let mut board = Board::empty();
        board.place(st("A6"), Piece::own(PieceId(0), Rank::Colonel));
        board.place(st("A7"), Piece::hidden(PieceId(0)));
        let pos = Position::new(board, Side::Own);
        let moves = ordered(&pos, legal_moves(&pos, Side::Own));
        assert_eq!(moves[0], Move::new(st("A6"), st("A7")));
    }
}

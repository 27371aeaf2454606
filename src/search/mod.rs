//! Deadline-bounded move selection.
//!
//! `select_move` runs iterative-deepening expectiminimax on a scoped
//! worker thread over a copy of the current position. The calling thread
//! waits for depth checkpoints until the budget's deadline, then cancels
//! the worker and returns the last completed depth's best move.

pub mod budget;
pub mod expectimax;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;

use tracing::{info, warn};

use crate::belief::Belief;
use crate::board::{GameState, Move};
use crate::eval::EvalWeights;
use crate::movegen::legal_moves;

pub use budget::TimeBudget;
pub use expectimax::{move_outcomes, Checkpoint};

/// Search limits and evaluation weights.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub max_depth: u32,
    pub weights: EvalWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_depth: 8,
            weights: EvalWeights::default(),
        }
    }
}

/// How the search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Every requested depth finished, or the move was forced.
    Completed,
    /// The deadline cut the search short; the best move of the last
    /// completed depth was used.
    DeadlineExceeded,
    /// Not even depth 1 finished; the smallest legal move was used.
    Fallback,
}

/// The chosen move with search statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    pub mv: Move,
    /// Score from the mover's perspective.
    pub score: f64,
    pub depth: u32,
    pub nodes: u64,
    pub termination: Termination,
}

/// Chooses a move for the side to move.
///
/// Returns `None` only when that side has no legal move. Otherwise the
/// result is always one of `legal_moves` and is produced within the
/// budget plus the cost of one node evaluation.
pub fn select_move(
    state: &GameState,
    belief: &Belief,
    budget: &TimeBudget,
    config: &SearchConfig,
) -> Option<SearchResult> {
    let pos = state.position;
    let moves = legal_moves(&pos, pos.to_move);
    let fallback = *moves.first()?;

    if moves.len() == 1 {
        return Some(SearchResult {
            mv: fallback,
            score: 0.0,
            depth: 0,
            nodes: 0,
            termination: Termination::Completed,
        });
    }

    let nodes = AtomicU64::new(0);
    let (tx, rx) = mpsc::channel();

    let (mut latest, finished) = thread::scope(|scope| {
        let worker = scope.spawn(|| {
            expectimax::iterative_deepening(&pos, belief, budget, config, &moves, &nodes, tx)
        });

        let mut latest: Option<Checkpoint> = None;
        let mut timed_out = false;
        loop {
            match rx.recv_timeout(budget.remaining()) {
                Ok(checkpoint) => latest = Some(checkpoint),
                Err(RecvTimeoutError::Timeout) => {
                    budget.cancel();
                    timed_out = true;
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let completed = match worker.join() {
            Ok(completed) => completed,
            Err(_) => {
                warn!("search worker panicked");
                false
            }
        };
        (latest, completed && !timed_out)
    });

    // Depths that finished while the worker was being stopped.
    if let Some(checkpoint) = rx.try_iter().last() {
        latest = Some(checkpoint);
    }

    let total_nodes = nodes.load(Ordering::Relaxed);
    let result = match latest {
        Some(cp) => SearchResult {
            mv: cp.mv,
            score: cp.score,
            depth: cp.depth,
            nodes: total_nodes,
            termination: if finished {
                Termination::Completed
            } else {
                Termination::DeadlineExceeded
            },
        },
        None => SearchResult {
            mv: fallback,
            score: 0.0,
            depth: 0,
            nodes: total_nodes,
            termination: Termination::Fallback,
        },
    };

    info!(
        mv = %result.mv,
        depth = result.depth,
        nodes = result.nodes,
        score = result.score,
        termination = ?result.termination,
        elapsed_ms = budget.elapsed().as_millis() as u64,
        "move selected"
    );
    Some(result)
}

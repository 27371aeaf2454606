//! Position evaluation.
//!
//! Scores a position from our side's perspective, considering material,
//! board control and piece safety under the current belief.

pub(crate) mod heuristic;

pub use heuristic::{
    evaluate, evaluate_for_mover, mover_belief, rank_belief, EvalWeights, WIN_SCORE,
};

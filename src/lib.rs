//! Luzhanqi player agent library.
//!
//! Exposes the board model, combat resolution, move generation, belief
//! tracking, evaluation, search and referee protocol modules for use by
//! integration tests and the binary entry point.

pub mod belief;
pub mod board;
pub mod config;
pub mod engine;
pub mod eval;
pub mod movegen;
pub mod protocol;
pub mod resolve;
pub mod search;

//! Referee protocol handling.
//!
//! This module implements the token-list notation used by the referee
//! (moves, layouts, time values) and the message parser the agent loop
//! dispatches on. All of it sits behind the `Grammar` trait.

pub mod notation;
pub mod parser;

pub use notation::{
    format_layout, format_move, parse_duration, parse_layout, parse_move, ProtocolError,
};
pub use parser::{format_outcome, parse_message, parse_outcome, Grammar, Message, RefereeGrammar};

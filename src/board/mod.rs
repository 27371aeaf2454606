//! Board representation and game-state types.
//!
//! Contains the station topology, piece ranks, initial layouts and the
//! position/game state the rest of the agent works on.

pub mod moves;
pub mod piece;
pub mod render;
pub mod setup;
pub mod state;
pub mod station;

pub use moves::Move;
pub use piece::{
    Piece, PieceId, Player, Rank, RankSet, Side, ALL_RANKS, PIECES_PER_SIDE, RANK_COUNT,
};
pub use render::{piece_marker, render_grid};
pub use setup::{
    may_start_on, opponent_start_ranks, opponent_starting_stations, starting_stations, Layout,
    LayoutError,
};
pub use state::{
    Board, GameState, GameStatus, PlayedMove, Position, RuleError, Terminal, QUIET_PLY_LIMIT,
};
pub use station::{Station, Zone, ALL_STATIONS, STATION_COUNT};

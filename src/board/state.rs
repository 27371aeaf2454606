//! Board, position and game-state representation.
//!
//! `Board` is a fixed-size array indexed by `Station::index()`, so at most
//! one piece can ever share a station. `Position` is the copyable snapshot
//! the search works on; `GameState` adds the agent's seat and the move
//! history for the live game.

use thiserror::Error;

use super::moves::Move;
use super::piece::{Piece, PieceId, Player, Rank, Side};
use super::setup::{opponent_starting_stations, Layout};
use super::station::{Station, ALL_STATIONS, STATION_COUNT};
use crate::movegen::{self, IllegalReason};
use crate::resolve::{
    attackers_consistent_with, defenders_consistent_with, resolve_combat, CombatOutcome,
};

/// Consecutive plies without combat after which the game is drawn.
pub const QUIET_PLY_LIMIT: u16 = 200;

/// Errors raised when applying a move.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("illegal move {mv}: {reason}")]
    IllegalMove { mv: Move, reason: IllegalReason },

    #[error("rank of the piece on {0} is not known")]
    HiddenRank(Station),

    #[error("outcome {reported:?} of {mv} contradicts the known pieces")]
    OutcomeMismatch { mv: Move, reported: CombatOutcome },

    #[error("the game is already over")]
    GameOver,
}

/// Piece placement: one optional piece per station.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    squares: [Option<Piece>; STATION_COUNT],
}

impl Board {
    /// Creates a board with no pieces.
    pub const fn empty() -> Self {
        Board {
            squares: [None; STATION_COUNT],
        }
    }

    /// The piece on `s`, if any.
    pub fn get(&self, s: Station) -> Option<Piece> {
        self.squares[s.index()]
    }

    /// Places a piece. Returns false if the station is already occupied.
    pub fn place(&mut self, s: Station, piece: Piece) -> bool {
        let slot = &mut self.squares[s.index()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(piece);
        true
    }

    /// Removes and returns the piece on `s`.
    pub fn remove(&mut self, s: Station) -> Option<Piece> {
        self.squares[s.index()].take()
    }

    pub(crate) fn piece_mut(&mut self, s: Station) -> Option<&mut Piece> {
        self.squares[s.index()].as_mut()
    }

    /// Pieces of `side` with their stations, in station order.
    pub fn pieces(&self, side: Side) -> impl Iterator<Item = (Station, Piece)> + '_ {
        ALL_STATIONS
            .iter()
            .filter_map(move |&s| match self.squares[s.index()] {
                Some(p) if p.side == side => Some((s, p)),
                _ => None,
            })
    }

    /// Number of pieces `side` has left.
    pub fn count(&self, side: Side) -> usize {
        self.squares
            .iter()
            .filter(|sq| matches!(sq, Some(p) if p.side == side))
            .count()
    }

    /// Station of the piece with the given id, if it is still on the board.
    pub fn locate(&self, side: Side, id: PieceId) -> Option<Station> {
        self.pieces(side)
            .find(|(_, p)| p.id == id)
            .map(|(s, _)| s)
    }

    /// Marks the flag of `side` as revealed.
    fn reveal_flag(&mut self, side: Side) {
        for sq in self.squares.iter_mut().flatten() {
            if sq.side == side && sq.rank == Some(Rank::Flag) {
                sq.revealed = true;
            }
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::empty()
    }
}

/// How a finished position ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    Winner(Side),
    Draw,
}

/// A copyable game snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub board: Board,
    pub to_move: Side,
    pub quiet_plies: u16,
    pub terminal: Option<Terminal>,
}

impl Position {
    pub const fn new(board: Board, to_move: Side) -> Self {
        Position {
            board,
            to_move,
            quiet_plies: 0,
            terminal: None,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Applies a move by the side to move, resolving any combat from the
    /// ranks on the board.
    ///
    /// Fails with `HiddenRank` when combat involves a piece whose rank is
    /// not known.
    pub fn apply_move(&self, mv: Move) -> Result<(Position, CombatOutcome), RuleError> {
        self.validate(mv)?;
        let outcome = match self.board.get(mv.dest) {
            None => CombatOutcome::NoContact,
            Some(defender) => {
                let attacker_rank = self
                    .board
                    .get(mv.origin)
                    .and_then(|p| p.rank)
                    .ok_or(RuleError::HiddenRank(mv.origin))?;
                let defender_rank = defender.rank.ok_or(RuleError::HiddenRank(mv.dest))?;
                resolve_combat(attacker_rank, defender_rank)
            }
        };
        Ok((self.play_unchecked(mv, outcome), outcome))
    }

    /// Applies a move whose combat outcome was decided elsewhere (the
    /// referee). The outcome is checked against whatever is known.
    ///
    /// A win or tie against a known flag is reported back as
    /// `FlagCaptured`. A piece of unknown rank may follow an engineer's
    /// path around rail corners.
    pub fn apply_reported(
        &self,
        mv: Move,
        reported: CombatOutcome,
    ) -> Result<(Position, CombatOutcome), RuleError> {
        match self.validate(mv) {
            Err(RuleError::IllegalMove {
                reason: IllegalReason::Unreachable,
                ..
            }) if self.is_hidden_engineer_path(mv) => {}
            other => other?,
        }
        let outcome = self.normalize_outcome(mv, reported)?;
        Ok((self.play_unchecked(mv, outcome), outcome))
    }

    fn validate(&self, mv: Move) -> Result<(), RuleError> {
        if self.is_terminal() {
            return Err(RuleError::GameOver);
        }
        movegen::check_move(self, self.to_move, mv)
            .map_err(|reason| RuleError::IllegalMove { mv, reason })
    }

    /// Returns true if `mv` needs an engineer and the moving piece's rank
    /// is unknown.
    pub fn is_hidden_engineer_path(&self, mv: Move) -> bool {
        match self.board.get(mv.origin) {
            Some(piece) if piece.rank.is_none() => {
                let engineer = piece.with_rank(Rank::Engineer);
                !movegen::is_reachable(&self.board, &piece, mv.origin, mv.dest)
                    && movegen::is_reachable(&self.board, &engineer, mv.origin, mv.dest)
            }
            _ => false,
        }
    }

    fn normalize_outcome(
        &self,
        mv: Move,
        reported: CombatOutcome,
    ) -> Result<CombatOutcome, RuleError> {
        let mismatch = RuleError::OutcomeMismatch { mv, reported };
        let Some(defender) = self.board.get(mv.dest) else {
            return match reported {
                CombatOutcome::NoContact => Ok(reported),
                _ => Err(mismatch),
            };
        };
        if reported == CombatOutcome::NoContact {
            return Err(mismatch);
        }

        let attacker_rank = self.board.get(mv.origin).and_then(|p| p.rank);
        match defender.rank {
            Some(Rank::Flag) => match reported {
                CombatOutcome::DefenderWins => Err(mismatch),
                _ => Ok(CombatOutcome::FlagCaptured),
            },
            Some(d) => {
                if reported == CombatOutcome::FlagCaptured {
                    return Err(mismatch);
                }
                let consistent = match attacker_rank {
                    Some(a) => resolve_combat(a, d) == reported,
                    None => attackers_consistent_with(d, reported).next().is_some(),
                };
                if consistent {
                    Ok(reported)
                } else {
                    Err(mismatch)
                }
            }
            None => match attacker_rank {
                // Any attacker may take a flag; other outcomes must fit the table.
                Some(a) if reported != CombatOutcome::FlagCaptured => {
                    if defenders_consistent_with(a, reported).next().is_some() {
                        Ok(reported)
                    } else {
                        Err(mismatch)
                    }
                }
                _ => Ok(reported),
            },
        }
    }

    /// Applies a move known to be legal with a consistent outcome.
    pub(crate) fn play_unchecked(&self, mv: Move, outcome: CombatOutcome) -> Position {
        let mut next = *self;
        let mover = self.to_move;
        let Some(mut attacker) = next.board.remove(mv.origin) else {
            return next;
        };

        let mut fallen: [Option<Piece>; 2] = [None, None];
        match outcome {
            CombatOutcome::NoContact => {
                next.board.place(mv.dest, attacker);
            }
            CombatOutcome::AttackerWins | CombatOutcome::FlagCaptured => {
                fallen[0] = next.board.remove(mv.dest);
                attacker.revealed = true;
                next.board.place(mv.dest, attacker);
            }
            CombatOutcome::DefenderWins => {
                if let Some(defender) = next.board.piece_mut(mv.dest) {
                    defender.revealed = true;
                }
                fallen[0] = Some(attacker);
            }
            CombatOutcome::Mutual => {
                fallen[0] = Some(attacker);
                fallen[1] = next.board.remove(mv.dest);
            }
        }

        for piece in fallen.into_iter().flatten() {
            if piece.rank == Some(Rank::FieldMarshal) {
                next.board.reveal_flag(piece.side);
            }
        }

        next.quiet_plies = match outcome {
            CombatOutcome::NoContact => self.quiet_plies.saturating_add(1),
            _ => 0,
        };
        next.to_move = mover.opposite();
        next.terminal = if outcome == CombatOutcome::FlagCaptured {
            Some(Terminal::Winner(mover))
        } else if next.quiet_plies >= QUIET_PLY_LIMIT {
            Some(Terminal::Draw)
        } else if !movegen::has_legal_move(&next, next.to_move) {
            Some(Terminal::Winner(mover))
        } else {
            None
        };
        next
    }
}

/// Game result from the referee's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameStatus {
    InProgress,
    Won(Player),
    Draw,
}

/// One entry of the move history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayedMove {
    pub side: Side,
    pub mv: Move,
    pub outcome: CombatOutcome,
}

/// The live game as seen by this agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    pub position: Position,
    pub me: Player,
    pub history: Vec<PlayedMove>,
}

impl GameState {
    /// Starts a game from our layout. Opponent pieces occupy their starting
    /// stations with hidden ranks, numbered in station order.
    pub fn new(layout: &Layout, me: Player) -> GameState {
        let mut board = Board::empty();
        for (i, &(station, rank)) in layout.placements().iter().enumerate() {
            board.place(station, Piece::own(PieceId(i as u8), rank));
        }
        for (i, station) in opponent_starting_stations().enumerate() {
            board.place(station, Piece::hidden(PieceId(i as u8)));
        }
        let to_move = if me == Player::One {
            Side::Own
        } else {
            Side::Opponent
        };
        GameState::from_position(Position::new(board, to_move), me)
    }

    /// Starts a game where the opponent's layout (in the opponent's own
    /// frame) is fully known. Used for analysis and full-information play.
    pub fn with_opponent_layout(own: &Layout, opponent: &Layout, me: Player) -> GameState {
        let mut state = GameState::new(own, me);
        for &(station, rank) in opponent.placements() {
            if let Some(piece) = state.position.board.piece_mut(station.rotated()) {
                piece.rank = Some(rank);
            }
        }
        state
    }

    /// Wraps an existing position.
    pub fn from_position(position: Position, me: Player) -> GameState {
        GameState {
            position,
            me,
            history: Vec::new(),
        }
    }

    /// Current piece placement.
    pub fn board(&self) -> &Board {
        &self.position.board
    }

    /// Side whose turn it is.
    pub fn side_to_move(&self) -> Side {
        self.position.to_move
    }

    /// Seat number of the given side.
    pub fn player_of(&self, side: Side) -> Player {
        match side {
            Side::Own => self.me,
            Side::Opponent => self.me.opposite(),
        }
    }

    /// Board side of the given seat.
    pub fn side_of(&self, player: Player) -> Side {
        if player == self.me {
            Side::Own
        } else {
            Side::Opponent
        }
    }

    /// Result by seat, or `InProgress`. Reflects local rules only; the
    /// referee has the final word.
    pub fn status(&self) -> GameStatus {
        match self.position.terminal {
            None => GameStatus::InProgress,
            Some(Terminal::Draw) => GameStatus::Draw,
            Some(Terminal::Winner(side)) => GameStatus::Won(self.player_of(side)),
        }
    }

    /// Returns true once the position is terminal.
    pub fn is_over(&self) -> bool {
        self.position.is_terminal()
    }

    /// Legal moves of the side to move.
    pub fn legal_moves(&self) -> Vec<Move> {
        movegen::legal_moves(&self.position, self.position.to_move)
    }

    /// Legality of a move by the side to move.
    pub fn is_legal_move(&self, mv: Move) -> bool {
        movegen::is_legal_move(&self.position, self.position.to_move, mv)
    }

    /// Applies a move, resolving combat from known ranks.
    pub fn apply_move(&self, mv: Move) -> Result<(GameState, CombatOutcome), RuleError> {
        let (position, outcome) = self.position.apply_move(mv)?;
        Ok((self.advance(position, mv, outcome), outcome))
    }

    /// Applies a move with a referee-reported outcome.
    pub fn apply_reported(
        &self,
        mv: Move,
        outcome: CombatOutcome,
    ) -> Result<(GameState, CombatOutcome), RuleError> {
        let (position, outcome) = self.position.apply_reported(mv, outcome)?;
        Ok((self.advance(position, mv, outcome), outcome))
    }

    fn advance(&self, position: Position, mv: Move, outcome: CombatOutcome) -> GameState {
        let mut history = self.history.clone();
        history.push(PlayedMove {
            side: self.position.to_move,
            mv,
            outcome,
        });
        GameState {
            position,
            me: self.me,
            history,
        }
    }

    /// Records a declared rank for the piece on `station`. Returns the
    /// updated piece, or `None` if the station is empty.
    pub fn reveal(&mut self, station: Station, rank: Rank) -> Option<Piece> {
        let piece = self.position.board.piece_mut(station)?;
        piece.rank = Some(rank);
        piece.revealed = true;
        Some(*piece)
    }

    /// Clears a terminal state inferred from local rules, so play goes on
    /// until the referee declares the result.
    pub fn reopen(&mut self) {
        self.position.terminal = None;
    }

    /// Marks the game as finished by an external verdict.
    pub fn conclude(&mut self, winner: Option<Player>) {
        self.position.terminal = Some(match winner {
            Some(p) => Terminal::Winner(self.side_of(p)),
            None => Terminal::Draw,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::setup::Layout;

    fn st(name: &str) -> Station {
        Station::parse(name).unwrap()
    }

    fn mv(a: &str, b: &str) -> Move {
        Move::new(st(a), st(b))
    }

    #[test]
    fn new_game_places_both_sides() {
        let state = GameState::new(&Layout::standard(), Player::One);
        assert_eq!(state.board().count(Side::Own), 25);
        assert_eq!(state.board().count(Side::Opponent), 25);
        assert_eq!(state.side_to_move(), Side::Own);
        assert_eq!(state.status(), GameStatus::InProgress);
        assert!(state.board().get(st("C9")).is_none(), "camps start empty");
        assert!(state.board().get(st("A7")).unwrap().rank.is_none());

        let second = GameState::new(&Layout::standard(), Player::Two);
        assert_eq!(second.side_to_move(), Side::Opponent);
    }

    #[test]
    fn hidden_combat_needs_reported_outcome() {
        let state = GameState::new(&Layout::standard(), Player::One);
        // Our General on A6 attacks the hidden piece on A7.
        assert_eq!(
            state.apply_move(mv("A6", "A7")).unwrap_err(),
            RuleError::HiddenRank(st("A7"))
        );
        let (next, outcome) = state
            .apply_reported(mv("A6", "A7"), CombatOutcome::AttackerWins)
            .unwrap();
        assert_eq!(outcome, CombatOutcome::AttackerWins);
        assert_eq!(next.board().count(Side::Opponent), 24);
        let general = next.board().get(st("A7")).unwrap();
        assert_eq!(general.rank, Some(Rank::General));
        assert!(general.revealed);
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.side_to_move(), Side::Opponent);
    }

    #[test]
    fn illegal_moves_are_rejected() {
        let state = GameState::new(&Layout::standard(), Player::One);
        let err = state.apply_move(mv("B1", "B2")).unwrap_err();
        assert!(matches!(err, RuleError::IllegalMove { .. }));
        let err = state.apply_move(mv("A7", "A6")).unwrap_err();
        assert!(matches!(
            err,
            RuleError::IllegalMove {
                reason: IllegalReason::NotOwner,
                ..
            }
        ));
    }

    #[test]
    fn reported_outcomes_are_checked() {
        let state = GameState::new(&Layout::standard(), Player::One);
        // A6 -> A7 is an attack; "no contact" is impossible.
        assert!(matches!(
            state.apply_reported(mv("A6", "A7"), CombatOutcome::NoContact),
            Err(RuleError::OutcomeMismatch { .. })
        ));
        // C3 -> C4 enters an empty camp; combat is impossible.
        assert!(matches!(
            state.apply_reported(mv("C3", "C4"), CombatOutcome::AttackerWins),
            Err(RuleError::OutcomeMismatch { .. })
        ));
    }

    #[test]
    fn known_ranks_resolve_combat() {
        let state =
            GameState::with_opponent_layout(&Layout::standard(), &Layout::standard(), Player::One);
        // A7 holds the piece the opponent placed on its E6: a Captain.
        let (next, outcome) = state.apply_move(mv("A6", "A7")).unwrap();
        assert_eq!(outcome, CombatOutcome::AttackerWins);
        assert_eq!(next.board().count(Side::Opponent), 24);
        // A wrong report for the same fight is rejected.
        assert!(matches!(
            state.apply_reported(mv("A6", "A7"), CombatOutcome::DefenderWins),
            Err(RuleError::OutcomeMismatch { .. })
        ));
    }

    #[test]
    fn capturing_the_flag_ends_the_game() {
        let mut board = Board::empty();
        board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
        board.place(st("C3"), Piece::own(PieceId(1), Rank::Captain));
        board.place(st("B2"), Piece::hidden(PieceId(0)));
        board.place(st("B12"), Piece::hidden(PieceId(1)));
        let state = GameState::from_position(Position::new(board, Side::Opponent), Player::One);

        let (next, outcome) = state
            .apply_reported(mv("B2", "B1"), CombatOutcome::AttackerWins)
            .unwrap();
        assert_eq!(outcome, CombatOutcome::FlagCaptured);
        assert_eq!(next.status(), GameStatus::Won(Player::Two));
        assert_eq!(next.apply_move(mv("C3", "C4")).unwrap_err(), RuleError::GameOver);
    }

    #[test]
    fn marshal_death_reveals_flag() {
        let mut board = Board::empty();
        board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
        board.place(st("C3"), Piece::own(PieceId(1), Rank::FieldMarshal));
        board.place(st("A2"), Piece::own(PieceId(2), Rank::Captain));
        board.place(st("C2"), Piece::hidden(PieceId(0)));
        board.place(st("B12"), Piece::hidden(PieceId(1)));
        let state = GameState::from_position(Position::new(board, Side::Own), Player::One);

        let (next, _) = state
            .apply_reported(mv("C3", "C2"), CombatOutcome::Mutual)
            .unwrap();
        assert!(next.board().get(st("B1")).unwrap().revealed);
    }

    #[test]
    fn side_without_moves_loses() {
        let mut board = Board::empty();
        board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
        board.place(st("C2"), Piece::own(PieceId(1), Rank::Colonel));
        board.place(st("E2"), Piece::hidden(PieceId(0)).with_rank(Rank::Engineer));
        board.place(st("B12"), Piece::hidden(PieceId(1)).with_rank(Rank::Flag));
        let state = GameState::from_position(Position::new(board, Side::Own), Player::Two);

        let (next, outcome) = state.apply_move(mv("C2", "E2")).unwrap();
        assert_eq!(outcome, CombatOutcome::AttackerWins);
        assert_eq!(next.status(), GameStatus::Won(Player::Two));
    }

    #[test]
    fn quiet_plies_lead_to_draw() {
        let mut board = Board::empty();
        board.place(st("A3"), Piece::own(PieceId(0), Rank::Captain));
        board.place(st("A10"), Piece::hidden(PieceId(0)).with_rank(Rank::Captain));
        let mut pos = Position::new(board, Side::Own);
        pos.quiet_plies = QUIET_PLY_LIMIT - 1;
        let (next, _) = pos.apply_move(mv("A3", "B3")).unwrap();
        assert_eq!(next.terminal, Some(Terminal::Draw));
    }

    #[test]
    fn hidden_piece_may_take_an_engineer_path() {
        let mut board = Board::empty();
        board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
        board.place(st("A3"), Piece::own(PieceId(1), Rank::Captain));
        board.place(st("A11"), Piece::hidden(PieceId(0)));
        board.place(st("D12"), Piece::hidden(PieceId(1)));
        let pos = Position::new(board, Side::Opponent);

        let corner = mv("A11", "B7");
        assert!(pos.is_hidden_engineer_path(corner));
        assert!(matches!(
            pos.apply_move(corner),
            Err(RuleError::IllegalMove {
                reason: IllegalReason::Unreachable,
                ..
            })
        ));
        let (next, outcome) = pos.apply_reported(corner, CombatOutcome::NoContact).unwrap();
        assert_eq!(outcome, CombatOutcome::NoContact);
        assert!(next.board.get(st("B7")).is_some());

        assert!(!pos.is_hidden_engineer_path(mv("A11", "A7")));
        assert!(pos.apply_reported(mv("A11", "C5"), CombatOutcome::NoContact).is_err());
    }

    #[test]
    fn reveal_records_rank() {
        let mut state = GameState::new(&Layout::standard(), Player::One);
        let piece = state.reveal(st("B12"), Rank::Flag).unwrap();
        assert_eq!(piece.rank, Some(Rank::Flag));
        assert!(state.reveal(st("C9"), Rank::Flag).is_none());
    }
}

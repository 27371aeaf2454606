//! Legal move generation.
//!
//! `legal_moves` enumerates every legal move of a side; `check_move`
//! validates a single move independently of the enumeration, so the two
//! can be cross-checked.

pub mod reach;

use thiserror::Error;

use crate::board::{Move, Position, Side, Station, ALL_STATIONS};

pub use reach::{can_enter, can_move, is_reachable, reachable};

/// Why a move is not legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IllegalReason {
    #[error("origin and destination are the same station")]
    NullMove,

    #[error("no piece on the origin station")]
    EmptyOrigin,

    #[error("the piece on the origin belongs to the other side")]
    NotOwner,

    #[error("the piece cannot move")]
    Immobile,

    #[error("the destination is blocked")]
    Blocked,

    #[error("the destination is out of reach")]
    Unreachable,
}

/// All legal moves for `side`, sorted and free of duplicates.
///
/// Empty only when the side has no piece that can move anywhere.
pub fn legal_moves(pos: &Position, side: Side) -> Vec<Move> {
    let mut moves = Vec::new();
    for (origin, _) in pos.board.pieces(side) {
        for dest in reachable(&pos.board, origin) {
            moves.push(Move::new(origin, dest));
        }
    }
    // Pieces are visited in station order and destinations come sorted,
    // so the list is already ordered.
    debug_assert!(moves.windows(2).all(|w| w[0] < w[1]));
    moves
}

/// Returns true if `side` has at least one legal move.
pub fn has_legal_move(pos: &Position, side: Side) -> bool {
    pos.board
        .pieces(side)
        .any(|(origin, _)| !reachable(&pos.board, origin).is_empty())
}

/// Validates a single move for `side`.
pub fn check_move(pos: &Position, side: Side, mv: Move) -> Result<(), IllegalReason> {
    if mv.origin == mv.dest {
        return Err(IllegalReason::NullMove);
    }
    let piece = pos.board.get(mv.origin).ok_or(IllegalReason::EmptyOrigin)?;
    if piece.side != side {
        return Err(IllegalReason::NotOwner);
    }
    if !can_move(&piece, mv.origin) {
        return Err(IllegalReason::Immobile);
    }
    if !can_enter(&pos.board, &piece, mv.dest) {
        return Err(IllegalReason::Blocked);
    }
    if !is_reachable(&pos.board, &piece, mv.origin, mv.dest) {
        return Err(IllegalReason::Unreachable);
    }
    Ok(())
}

/// Pure legality predicate.
pub fn is_legal_move(pos: &Position, side: Side, mv: Move) -> bool {
    check_move(pos, side, mv).is_ok()
}

/// Every (origin, dest) pair on the board, used by exhaustive checks.
pub fn all_station_pairs() -> impl Iterator<Item = Move> {
    ALL_STATIONS.into_iter().flat_map(|o: Station| {
        ALL_STATIONS
            .into_iter()
            .map(move |d| Move::new(o, d))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Piece, PieceId, Rank};

    fn st(name: &str) -> Station {
        Station::parse(name).unwrap()
    }

    fn position() -> Position {
        let mut board = Board::empty();
        board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
        board.place(st("C2"), Piece::own(PieceId(1), Rank::Colonel));
        board.place(st("E2"), Piece::hidden(PieceId(0)));
        board.place(st("D12"), Piece::hidden(PieceId(1)));
        Position::new(board, Side::Own)
    }

    #[test]
    fn generated_moves_pass_check() {
        let pos = position();
        let moves = legal_moves(&pos, Side::Own);
        assert!(!moves.is_empty());
        for mv in &moves {
            assert_eq!(check_move(&pos, Side::Own, *mv), Ok(()), "{}", mv);
        }
    }

    #[test]
    fn generation_is_complete() {
        let pos = position();
        for side in [Side::Own, Side::Opponent] {
            let moves = legal_moves(&pos, side);
            for mv in all_station_pairs() {
                assert_eq!(
                    is_legal_move(&pos, side, mv),
                    moves.binary_search(&mv).is_ok(),
                    "{:?} {}",
                    side,
                    mv
                );
            }
        }
    }

    #[test]
    fn check_move_reasons() {
        let pos = position();
        assert_eq!(
            check_move(&pos, Side::Own, Move::new(st("C2"), st("C2"))),
            Err(IllegalReason::NullMove)
        );
        assert_eq!(
            check_move(&pos, Side::Own, Move::new(st("C3"), st("C4"))),
            Err(IllegalReason::EmptyOrigin)
        );
        assert_eq!(
            check_move(&pos, Side::Own, Move::new(st("E2"), st("E3"))),
            Err(IllegalReason::NotOwner)
        );
        assert_eq!(
            check_move(&pos, Side::Own, Move::new(st("B1"), st("A1"))),
            Err(IllegalReason::Immobile)
        );
        assert_eq!(
            check_move(&pos, Side::Own, Move::new(st("C2"), st("B1"))),
            Err(IllegalReason::Blocked)
        );
        assert_eq!(
            check_move(&pos, Side::Own, Move::new(st("C2"), st("C6"))),
            Err(IllegalReason::Unreachable)
        );
    }

    #[test]
    fn rail_attack_and_step_are_both_legal() {
        let pos = position();
        let moves = legal_moves(&pos, Side::Own);
        assert!(moves.contains(&Move::new(st("C2"), st("C3"))));
        assert!(moves.contains(&Move::new(st("C2"), st("E2"))));
    }

    #[test]
    fn no_moves_when_only_immobile_pieces() {
        let mut board = Board::empty();
        board.place(st("B1"), Piece::own(PieceId(0), Rank::Flag));
        board.place(st("A1"), Piece::own(PieceId(1), Rank::Landmine));
        let pos = Position::new(board, Side::Own);
        assert!(legal_moves(&pos, Side::Own).is_empty());
        assert!(!has_legal_move(&pos, Side::Own));
    }
}

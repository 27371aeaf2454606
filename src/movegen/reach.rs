//! Destination generation for a single piece.
//!
//! A piece reaches its step neighbours and, from a railway station, any
//! station along a straight rail ray up to the first occupied one. A known
//! engineer may instead follow the railway network around corners.

use std::collections::VecDeque;

use crate::board::station::{
    is_step_adjacent, rail_links, rail_ray, step_neighbors, Direction, Station, Zone,
    STATION_COUNT,
};
use crate::board::{Board, Piece, Rank};

/// Returns true if the piece on `origin` is allowed to move at all.
pub fn can_move(piece: &Piece, origin: Station) -> bool {
    origin.zone() != Zone::Headquarters && piece.may_move()
}

/// Returns true if `mover` may end a move on `dest`: empty, or an enemy
/// that is not sheltering in a camp.
pub fn can_enter(board: &Board, mover: &Piece, dest: Station) -> bool {
    match board.get(dest) {
        None => true,
        Some(other) => other.side != mover.side && dest.zone() != Zone::Camp,
    }
}

fn turns_corners(piece: &Piece) -> bool {
    piece.rank == Some(Rank::Engineer)
}

/// All destinations for the piece on `origin`, sorted and unique.
///
/// Returns an empty vec if `origin` is empty or its piece cannot move.
pub fn reachable(board: &Board, origin: Station) -> Vec<Station> {
    let Some(piece) = board.get(origin) else {
        return Vec::new();
    };
    if !can_move(&piece, origin) {
        return Vec::new();
    }

    let mut seen = [false; STATION_COUNT];
    let mut dests = Vec::new();
    let mut push = |s: Station, dests: &mut Vec<Station>| {
        if !seen[s.index()] {
            seen[s.index()] = true;
            dests.push(s);
        }
    };

    for &next in step_neighbors(origin) {
        if can_enter(board, &piece, next) {
            push(next, &mut dests);
        }
    }

    if origin.on_railway() {
        if turns_corners(&piece) {
            for s in rail_network_reach(board, &piece, origin) {
                push(s, &mut dests);
            }
        } else {
            for dir in Direction::ALL {
                for &s in rail_ray(origin, dir) {
                    if board.get(s).is_none() {
                        push(s, &mut dests);
                        continue;
                    }
                    if can_enter(board, &piece, s) {
                        push(s, &mut dests);
                    }
                    break;
                }
            }
        }
    }

    dests.sort();
    dests
}

/// Breadth-first walk over empty rail stations; occupied enemy stations
/// end a branch but are themselves reachable.
fn rail_network_reach(board: &Board, piece: &Piece, origin: Station) -> Vec<Station> {
    let mut visited = [false; STATION_COUNT];
    let mut queue = VecDeque::new();
    let mut out = Vec::new();
    visited[origin.index()] = true;
    queue.push_back(origin);

    while let Some(cur) = queue.pop_front() {
        for &next in rail_links(cur) {
            if visited[next.index()] {
                continue;
            }
            visited[next.index()] = true;
            match board.get(next) {
                None => {
                    out.push(next);
                    queue.push_back(next);
                }
                Some(_) => {
                    if can_enter(board, piece, next) {
                        out.push(next);
                    }
                }
            }
        }
    }
    out
}

/// Checks reachability of `dest` from `origin` by walking only the
/// relevant geometry, without building the full destination list.
///
/// Ownership, mobility and destination occupancy are the caller's job.
pub fn is_reachable(board: &Board, piece: &Piece, origin: Station, dest: Station) -> bool {
    if is_step_adjacent(origin, dest) {
        return true;
    }
    if !origin.on_railway() || !dest.on_railway() {
        return false;
    }
    if turns_corners(piece) {
        return rail_network_reach(board, piece, origin).contains(&dest);
    }
    Direction::ALL.iter().any(|&dir| {
        for &s in rail_ray(origin, dir) {
            if s == dest {
                return true;
            }
            if board.get(s).is_some() {
                return false;
            }
        }
        false
    })
}

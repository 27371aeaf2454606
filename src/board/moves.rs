//! Move representation.
//!
//! A move names only its origin and destination. Whether it is a single
//! step or a rail run is decided by the topology, never spelled out.

use std::fmt;

use super::station::Station;

/// A move from `origin` to `dest` by the side to move.
///
/// Ordering is lexicographic on (origin, dest), which gives the
/// deterministic tie-break used when search cannot finish a single depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    pub origin: Station,
    pub dest: Station,
}

impl Move {
    pub const fn new(origin: Station, dest: Station) -> Self {
        Move { origin, dest }
    }

    /// The same move seen from the other side of the table.
    pub const fn rotated(self) -> Move {
        Move {
            origin: self.origin.rotated(),
            dest: self.dest.rotated(),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.origin, self.dest)
    }
}

//! Board topology for the 5x12 Luzhanqi board.
//!
//! Stations are addressed in the agent's own frame: columns A..E, rows
//! 1..12, with our half on rows 1..6. The `Station` newtype wraps a
//! row-major index so it can be used directly as an array index.
//!
//! Step adjacency, railway links and straight rail rays are computed once
//! via `LazyLock` and shared read-only by move generation and evaluation.

use std::collections::VecDeque;
use std::fmt;
use std::sync::LazyLock;

/// Number of board columns (A..E).
pub const COLUMNS: usize = 5;

/// Number of board rows (1..12).
pub const ROWS: usize = 12;

/// Total number of stations on the board.
pub const STATION_COUNT: usize = COLUMNS * ROWS;

/// Index of the last row of our half (row 6).
pub const FRONT_ROW: u8 = 5;

/// A board location. Ordered row-major: row 1 first, column A first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Station(u8);

/// All stations in index order.
pub const ALL_STATIONS: [Station; STATION_COUNT] = {
    let mut all = [Station(0); STATION_COUNT];
    let mut i = 0;
    while i < STATION_COUNT {
        all[i] = Station(i as u8);
        i += 1;
    }
    all
};

/// The rule class of a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    /// Ordinary soldier station.
    Post,
    /// Safe station: an occupant cannot be attacked; connects diagonally.
    Camp,
    /// Home station: pieces placed here never move again.
    Headquarters,
}

/// A straight railway direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards row 12.
    North,
    /// Towards row 1.
    South,
    /// Towards column E.
    East,
    /// Towards column A.
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    const fn delta(self) -> (i8, i8) {
        match self {
            Direction::North => (0, 1),
            Direction::South => (0, -1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

impl Station {
    /// Returns the station at the given zero-based column and row, if on the board.
    pub const fn at(col: u8, row: u8) -> Option<Station> {
        if (col as usize) < COLUMNS && (row as usize) < ROWS {
            Some(Station(row * COLUMNS as u8 + col))
        } else {
            None
        }
    }

    /// Returns the station with the given row-major index, if valid.
    pub const fn from_index(idx: usize) -> Option<Station> {
        if idx < STATION_COUNT {
            Some(Station(idx as u8))
        } else {
            None
        }
    }

    /// Row-major index, usable as an array index.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Zero-based column (0 = A).
    pub const fn col(self) -> u8 {
        self.0 % COLUMNS as u8
    }

    /// Zero-based row (0 = row 1).
    pub const fn row(self) -> u8 {
        self.0 / COLUMNS as u8
    }

    /// Returns true if the station lies in our half (rows 1..6).
    pub const fn is_own_half(self) -> bool {
        self.row() <= FRONT_ROW
    }

    /// The same station seen from the other player's side of the table.
    pub const fn rotated(self) -> Station {
        Station((STATION_COUNT - 1) as u8 - self.0)
    }

    /// Distance in rows from the station to the nearer home row, folding
    /// both halves onto 0 (headquarters row) ..= 5 (front row).
    const fn depth(self) -> u8 {
        let row = self.row();
        if row <= FRONT_ROW {
            row
        } else {
            ROWS as u8 - 1 - row
        }
    }

    /// Returns the zone of this station.
    pub const fn zone(self) -> Zone {
        match (self.col(), self.depth()) {
            (1 | 3, 0) => Zone::Headquarters,
            (1 | 3, 2) | (2, 3) | (1 | 3, 4) => Zone::Camp,
            _ => Zone::Post,
        }
    }

    /// Returns true if this station is part of the railway network.
    pub fn on_railway(self) -> bool {
        !TOPOLOGY.rail_links[self.index()].is_empty()
    }

    /// Parses a station from its `A1`..`E12` name (case-insensitive column).
    pub fn parse(s: &str) -> Option<Station> {
        let mut chars = s.chars();
        let col_char = chars.next()?.to_ascii_uppercase();
        if !('A'..='E').contains(&col_char) {
            return None;
        }
        let digits = chars.as_str();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let row: u8 = digits.parse().ok()?;
        if row == 0 {
            return None;
        }
        Station::at(col_char as u8 - b'A', row - 1)
    }

    fn offset(self, dc: i8, dr: i8) -> Option<Station> {
        let col = self.col() as i8 + dc;
        let row = self.row() as i8 + dr;
        if col < 0 || row < 0 {
            return None;
        }
        Station::at(col as u8, row as u8)
    }
}

impl fmt::Display for Station {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'A' + self.col()) as char, self.row() + 1)
    }
}

/// Precomputed board graph.
struct Topology {
    steps: Vec<Vec<Station>>,
    rail_links: Vec<Vec<Station>>,
    /// Rays indexed by `[station][direction]`.
    rail_rays: Vec<[Vec<Station>; 4]>,
}

static TOPOLOGY: LazyLock<Topology> = LazyLock::new(build_topology);

/// Returns true if the row holds a full-width railway (rows 2, 6, 7, 11).
const fn is_rail_row(row: u8) -> bool {
    matches!(row, 1 | 5 | 6 | 10)
}

/// Returns true if two orthogonally adjacent stations are joined by rail.
fn rail_linked(a: Station, b: Station) -> bool {
    if a.row() == b.row() {
        return a.col().abs_diff(b.col()) == 1 && is_rail_row(a.row());
    }
    if a.col() != b.col() || a.row().abs_diff(b.row()) != 1 {
        return false;
    }
    let low = a.row().min(b.row());
    match a.col() {
        0 | 4 => (1..=9).contains(&low),
        2 => low == FRONT_ROW,
        _ => false,
    }
}

/// Returns true if a single step connects the two stations.
fn step_linked(a: Station, b: Station) -> bool {
    let dc = a.col().abs_diff(b.col());
    let dr = a.row().abs_diff(b.row());
    match (dc, dr) {
        (1, 0) => true,
        (0, 1) => {
            // The front line is only crossable where the railway bridges it.
            let crosses_front = a.row().min(b.row()) == FRONT_ROW;
            !crosses_front || rail_linked(a, b)
        }
        (1, 1) => a.zone() == Zone::Camp || b.zone() == Zone::Camp,
        _ => false,
    }
}

fn build_topology() -> Topology {
    let mut steps = Vec::with_capacity(STATION_COUNT);
    let mut rail_links = Vec::with_capacity(STATION_COUNT);
    let mut rail_rays = Vec::with_capacity(STATION_COUNT);

    for &s in ALL_STATIONS.iter() {
        let mut neighbors = Vec::new();
        let mut links = Vec::new();
        for dr in -1i8..=1 {
            for dc in -1i8..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let Some(t) = s.offset(dc, dr) else { continue };
                if step_linked(s, t) {
                    neighbors.push(t);
                }
                if (dr == 0 || dc == 0) && rail_linked(s, t) {
                    links.push(t);
                }
            }
        }
        neighbors.sort();
        links.sort();

        let rays = Direction::ALL.map(|dir| {
            let (dc, dr) = dir.delta();
            let mut ray = Vec::new();
            let mut cur = s;
            while let Some(next) = cur.offset(dc, dr) {
                if !rail_linked(cur, next) {
                    break;
                }
                ray.push(next);
                cur = next;
            }
            ray
        });

        steps.push(neighbors);
        rail_links.push(links);
        rail_rays.push(rays);
    }

    Topology {
        steps,
        rail_links,
        rail_rays,
    }
}

/// Stations reachable from `s` by a single step.
pub fn step_neighbors(s: Station) -> &'static [Station] {
    &TOPOLOGY.steps[s.index()]
}

/// Returns true if `a` and `b` are joined by a single step.
pub fn is_step_adjacent(a: Station, b: Station) -> bool {
    TOPOLOGY.steps[a.index()].contains(&b)
}

/// Railway neighbours of `s` (empty if `s` is off the railway).
pub fn rail_links(s: Station) -> &'static [Station] {
    &TOPOLOGY.rail_links[s.index()]
}

/// The straight run of rail stations leaving `s` in `dir`, nearest first.
///
/// Occupancy is not considered; callers stop at the first occupied station.
pub fn rail_ray(s: Station, dir: Direction) -> &'static [Station] {
    let slot = Direction::ALL
        .iter()
        .position(|&d| d == dir)
        .unwrap_or_default();
    &TOPOLOGY.rail_rays[s.index()][slot]
}

/// Headquarters stations of the given half.
pub fn headquarters(own_half: bool) -> [Station; 2] {
    if own_half {
        [Station(1), Station(3)]
    } else {
        [Station(56), Station(58)]
    }
}

/// Graph distance (steps and rail links, ignoring occupancy) from every
/// station to the nearest headquarters of the requested half.
pub fn distance_to_headquarters(own_half: bool) -> &'static [u8; STATION_COUNT] {
    static OWN: LazyLock<[u8; STATION_COUNT]> = LazyLock::new(|| bfs_from(headquarters(true)));
    static THEIRS: LazyLock<[u8; STATION_COUNT]> =
        LazyLock::new(|| bfs_from(headquarters(false)));
    if own_half {
        &OWN
    } else {
        &THEIRS
    }
}

fn bfs_from(sources: [Station; 2]) -> [u8; STATION_COUNT] {
    let mut dist = [u8::MAX; STATION_COUNT];
    let mut queue = VecDeque::with_capacity(STATION_COUNT);
    for s in sources {
        dist[s.index()] = 0;
        queue.push_back(s);
    }
    while let Some(cur) = queue.pop_front() {
        let d = dist[cur.index()];
        for &next in step_neighbors(cur).iter().chain(rail_links(cur)) {
            if dist[next.index()] == u8::MAX {
                dist[next.index()] = d + 1;
                queue.push_back(next);
            }
        }
    }
    dist
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(name: &str) -> Station {
        Station::parse(name).unwrap()
    }

    #[test]
    fn station_name_roundtrip() {
        for &s in ALL_STATIONS.iter() {
            assert_eq!(Station::parse(&s.to_string()), Some(s));
        }
        assert_eq!(st("A1").index(), 0);
        assert_eq!(st("E12").index(), STATION_COUNT - 1);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Station::parse(""), None);
        assert_eq!(Station::parse("F1"), None);
        assert_eq!(Station::parse("A0"), None);
        assert_eq!(Station::parse("A13"), None);
        assert_eq!(Station::parse("A1x"), None);
        assert_eq!(Station::parse("a7"), Some(st("A7")));
    }

    #[test]
    fn zones_match_board_layout() {
        for name in ["B3", "D3", "C4", "B5", "D5", "B8", "D8", "C9", "B10", "D10"] {
            assert_eq!(st(name).zone(), Zone::Camp, "{}", name);
        }
        for name in ["B1", "D1", "B12", "D12"] {
            assert_eq!(st(name).zone(), Zone::Headquarters, "{}", name);
        }
        assert_eq!(st("C1").zone(), Zone::Post);
        assert_eq!(st("C6").zone(), Zone::Post);
    }

    #[test]
    fn rotation_is_an_involution() {
        assert_eq!(st("A1").rotated(), st("E12"));
        assert_eq!(st("B2").rotated(), st("D11"));
        for &s in ALL_STATIONS.iter() {
            assert_eq!(s.rotated().rotated(), s);
            assert_eq!(s.rotated().zone(), s.zone());
        }
    }

    #[test]
    fn front_line_crossings() {
        assert!(is_step_adjacent(st("A6"), st("A7")));
        assert!(is_step_adjacent(st("C6"), st("C7")));
        assert!(is_step_adjacent(st("E6"), st("E7")));
        assert!(!is_step_adjacent(st("B6"), st("B7")));
        assert!(!is_step_adjacent(st("D6"), st("D7")));
    }

    #[test]
    fn camps_connect_diagonally() {
        assert!(is_step_adjacent(st("C4"), st("B3")));
        assert!(is_step_adjacent(st("B3"), st("A2")));
        assert!(is_step_adjacent(st("C2"), st("B3")));
        assert!(!is_step_adjacent(st("A1"), st("B2")));
    }

    #[test]
    fn adjacency_is_symmetric() {
        for &a in ALL_STATIONS.iter() {
            for &b in step_neighbors(a) {
                assert!(is_step_adjacent(b, a), "{} -> {}", a, b);
            }
            for &b in rail_links(a) {
                assert!(rail_links(b).contains(&a), "{} => {}", a, b);
            }
        }
    }

    #[test]
    fn railway_membership() {
        assert!(st("A2").on_railway());
        assert!(st("C2").on_railway());
        assert!(st("A4").on_railway());
        assert!(!st("A1").on_railway());
        assert!(!st("C4").on_railway());
        assert!(!st("B3").on_railway());
        assert!(!st("A12").on_railway());
    }

    #[test]
    fn rail_rays_run_straight() {
        let north = rail_ray(st("A2"), Direction::North);
        assert_eq!(north.first(), Some(&st("A3")));
        assert_eq!(north.last(), Some(&st("A11")));
        assert_eq!(north.len(), 9);

        let east = rail_ray(st("A2"), Direction::East);
        assert_eq!(east, &[st("B2"), st("C2"), st("D2"), st("E2")]);

        // Column C only bridges the front line.
        assert_eq!(rail_ray(st("C6"), Direction::North), &[st("C7")]);
        assert!(rail_ray(st("C2"), Direction::North).is_empty());
    }

    #[test]
    fn headquarters_distance() {
        let theirs = distance_to_headquarters(false);
        assert_eq!(theirs[st("B12").index()], 0);
        assert_eq!(theirs[st("C12").index()], 1);
        assert!(theirs[st("A1").index()] > theirs[st("A7").index()]);
        let ours = distance_to_headquarters(true);
        assert_eq!(ours[st("D1").index()], 0);
    }
}

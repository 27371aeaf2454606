//! Referee notation: parenthesised token lists.
//!
//! Every referee message is a list of atoms and nested lists, e.g.
//! `( A6 A7 )` or `( ( A1 1 ) ( B1 F ) ... )`. This module tokenizes such
//! lines and encodes/decodes the pieces shared by several message kinds:
//! moves, layouts and time values.

use std::fmt::Write;
use std::time::Duration;

use thiserror::Error;

use crate::board::{Layout, LayoutError, Move, Rank, Station};

/// Errors raised while reading referee text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,

    #[error("unbalanced parentheses in '{0}'")]
    Unbalanced(String),

    #[error("unknown station '{0}'")]
    UnknownStation(String),

    #[error("unknown rank '{0}'")]
    UnknownRank(String),

    #[error("unknown outcome '{0}'")]
    UnknownOutcome(String),

    #[error("unknown player '{0}'")]
    UnknownPlayer(String),

    #[error("invalid time '{0}': expected <digits>[.<digit>](s|ms)")]
    BadTime(String),

    #[error("unrecognized message '{0}'")]
    Unrecognized(String),

    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),
}

/// A parsed token tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sexp {
    Atom(String),
    List(Vec<Sexp>),
}

impl Sexp {
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Sexp::Atom(s) => Some(s),
            Sexp::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Sexp]> {
        match self {
            Sexp::List(items) => Some(items),
            Sexp::Atom(_) => None,
        }
    }
}

/// Tokenizes one line into a single token tree. Parentheses need not be
/// separated from atoms by whitespace.
pub fn tokenize(line: &str) -> Result<Sexp, ProtocolError> {
    let unbalanced = || ProtocolError::Unbalanced(line.trim().to_string());
    let mut stack: Vec<Vec<Sexp>> = Vec::new();
    let mut done: Option<Sexp> = None;
    let mut atom = String::new();

    let flush = |atom: &mut String, stack: &mut Vec<Vec<Sexp>>| -> Result<(), ProtocolError> {
        if atom.is_empty() {
            return Ok(());
        }
        let top = stack.last_mut().ok_or_else(unbalanced)?;
        top.push(Sexp::Atom(std::mem::take(atom)));
        Ok(())
    };

    for c in line.chars() {
        if done.is_some() && !c.is_whitespace() {
            return Err(unbalanced());
        }
        match c {
            '(' => {
                flush(&mut atom, &mut stack)?;
                stack.push(Vec::new());
            }
            ')' => {
                flush(&mut atom, &mut stack)?;
                let items = stack.pop().ok_or_else(unbalanced)?;
                match stack.last_mut() {
                    Some(parent) => parent.push(Sexp::List(items)),
                    None => done = Some(Sexp::List(items)),
                }
            }
            c if c.is_whitespace() => flush(&mut atom, &mut stack)?,
            c => atom.push(c),
        }
    }
    if !atom.is_empty() || !stack.is_empty() {
        return Err(unbalanced());
    }
    done.ok_or(ProtocolError::Empty)
}

pub fn parse_station(token: &str) -> Result<Station, ProtocolError> {
    Station::parse(token).ok_or_else(|| ProtocolError::UnknownStation(token.to_string()))
}

pub fn parse_rank(token: &str) -> Result<Rank, ProtocolError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Rank::from_symbol(c),
        _ => None,
    }
    .ok_or_else(|| ProtocolError::UnknownRank(token.to_string()))
}

/// Formats a move as `( A6 A7 )`.
pub fn format_move(mv: Move) -> String {
    format!("( {} {} )", mv.origin, mv.dest)
}

/// Parses a move written as `( A6 A7 )`.
pub fn parse_move(text: &str) -> Result<Move, ProtocolError> {
    let tree = tokenize(text)?;
    let unrecognized = || ProtocolError::Unrecognized(text.trim().to_string());
    match tree.as_list() {
        Some([Sexp::Atom(a), Sexp::Atom(b)]) => Ok(Move::new(parse_station(a)?, parse_station(b)?)),
        _ => Err(unrecognized()),
    }
}

/// Formats a layout as `( ( A1 1 ) ( B1 F ) ... )`.
pub fn format_layout(layout: &Layout) -> String {
    let mut out = String::from("(");
    for (station, rank) in layout.placements() {
        let _ = write!(out, " ( {} {} )", station, rank.symbol());
    }
    out.push_str(" )");
    out
}

/// Reads layout placements from an already tokenized list of pairs.
pub fn layout_from_items(items: &[Sexp]) -> Result<Layout, ProtocolError> {
    let mut placements = Vec::with_capacity(items.len());
    for item in items {
        match item.as_list() {
            Some([Sexp::Atom(s), Sexp::Atom(r)]) => {
                placements.push((parse_station(s)?, parse_rank(r)?));
            }
            _ => return Err(ProtocolError::Unrecognized(format!("{:?}", item))),
        }
    }
    Ok(Layout::new(placements)?)
}

/// Parses a layout written as `( ( A1 1 ) ( B1 F ) ... )`.
pub fn parse_layout(text: &str) -> Result<Layout, ProtocolError> {
    let tree = tokenize(text)?;
    let items = tree
        .as_list()
        .ok_or_else(|| ProtocolError::Unrecognized(text.trim().to_string()))?;
    layout_from_items(items)
}

/// Parses a time value: whole digits with at most one fractional digit,
/// followed by `s` or `ms`. Examples: `2s`, `2.0s`, `2000ms`, `2000.0ms`.
pub fn parse_duration(text: &str) -> Result<Duration, ProtocolError> {
    let bad = || ProtocolError::BadTime(text.to_string());
    let (number, millis) = if let Some(n) = text.strip_suffix("ms") {
        (n, true)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, false)
    } else {
        return Err(bad());
    };

    let (whole, frac) = match number.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (number, None),
    };
    if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return Err(bad());
    }
    let tenths = match frac {
        None => 0,
        Some(f) if f.len() == 1 && f.as_bytes()[0].is_ascii_digit() => {
            u64::from(f.as_bytes()[0] - b'0')
        }
        Some(_) => return Err(bad()),
    };
    let whole: u64 = whole.parse().map_err(|_| bad())?;

    let micros_per_unit: u64 = if millis { 1_000 } else { 1_000_000 };
    whole
        .checked_mul(micros_per_unit)
        .and_then(|m| m.checked_add(tenths * micros_per_unit / 10))
        .map(Duration::from_micros)
        .ok_or_else(bad)
}

//! Referee message parser.
//!
//! Parses incoming referee lines into structured `Message` variants that
//! the agent loop can dispatch on. Message kinds are recognised from the
//! shape of the token list; the rendering side lives on the `Grammar`
//! trait so an alternative referee dialect can be swapped in whole.

use std::time::Duration;

use super::notation::{
    format_layout, format_move, layout_from_items, parse_duration, parse_rank, parse_station,
    tokenize, ProtocolError, Sexp,
};
use crate::board::{Layout, Move, Player, Rank, Station};
use crate::resolve::CombatOutcome;

/// A parsed referee-to-agent message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A full initial layout: `( ( A1 1 ) ( B1 F ) ... )`.
    Layout(Layout),

    /// A move and, when reported by the referee, its mover and outcome:
    /// `( A6 A7 1 win )` or a bare `( A6 A7 )`.
    MoveReport {
        mv: Move,
        player: Option<Player>,
        outcome: Option<CombatOutcome>,
    },

    /// It is the agent's turn: `( go )` or `( go 1.5s )`.
    YourTurn { remaining: Option<Duration> },

    /// A rank declaration for the piece on a station: `( B12 F )`.
    Reveal { station: Station, rank: Rank },

    /// End of game: `( 1 wins )`, `( 2 wins )` or `( draw )`.
    GameResult { winner: Option<Player> },

    /// Any line that is not a parenthesised message.
    Info(String),
}

/// Outcome keywords of move reports, from the mover's point of view.
const OUTCOME_TOKENS: [(&str, CombatOutcome); 5] = [
    ("move", CombatOutcome::NoContact),
    ("win", CombatOutcome::AttackerWins),
    ("loss", CombatOutcome::DefenderWins),
    ("tie", CombatOutcome::Mutual),
    ("flag", CombatOutcome::FlagCaptured),
];

pub fn parse_outcome(token: &str) -> Result<CombatOutcome, ProtocolError> {
    OUTCOME_TOKENS
        .iter()
        .find(|(t, _)| t.eq_ignore_ascii_case(token))
        .map(|&(_, o)| o)
        .ok_or_else(|| ProtocolError::UnknownOutcome(token.to_string()))
}

pub fn format_outcome(outcome: CombatOutcome) -> &'static str {
    OUTCOME_TOKENS
        .iter()
        .find(|&&(_, o)| o == outcome)
        .map_or("move", |&(t, _)| t)
}

fn parse_player(token: &str) -> Result<Player, ProtocolError> {
    token
        .parse::<u8>()
        .ok()
        .and_then(Player::from_number)
        .ok_or_else(|| ProtocolError::UnknownPlayer(token.to_string()))
}

fn is_station(token: &str) -> bool {
    Station::parse(token).is_some()
}

/// Parses a single referee line.
///
/// Lines that do not start with `(` are returned as `Message::Info`.
pub fn parse_message(line: &str) -> Result<Message, ProtocolError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::Empty);
    }
    if !trimmed.starts_with('(') {
        return Ok(Message::Info(trimmed.to_string()));
    }

    let tree = tokenize(trimmed)?;
    let unrecognized = || ProtocolError::Unrecognized(trimmed.to_string());
    let items = tree.as_list().ok_or_else(unrecognized)?;

    if items.first().is_some_and(|i| i.as_list().is_some()) {
        return Ok(Message::Layout(layout_from_items(items)?));
    }

    let atoms: Vec<&str> = items
        .iter()
        .map(Sexp::as_atom)
        .collect::<Option<_>>()
        .ok_or_else(unrecognized)?;

    match atoms.as_slice() {
        [go, rest @ ..] if go.eq_ignore_ascii_case("go") => parse_go(rest),
        [d] if d.eq_ignore_ascii_case("draw") => Ok(Message::GameResult { winner: None }),
        [n, w] if w.eq_ignore_ascii_case("wins") => Ok(Message::GameResult {
            winner: Some(parse_player(n)?),
        }),
        [a, b] if is_station(a) && is_station(b) => Ok(Message::MoveReport {
            mv: Move::new(parse_station(a)?, parse_station(b)?),
            player: None,
            outcome: None,
        }),
        [s, r] if is_station(s) => Ok(Message::Reveal {
            station: parse_station(s)?,
            rank: parse_rank(r)?,
        }),
        [a, b, p, o] => Ok(Message::MoveReport {
            mv: Move::new(parse_station(a)?, parse_station(b)?),
            player: Some(parse_player(p)?),
            outcome: Some(parse_outcome(o)?),
        }),
        _ => Err(unrecognized()),
    }
}

/// Parses the arguments of `( go [time] )`.
fn parse_go(args: &[&str]) -> Result<Message, ProtocolError> {
    match args {
        [] => Ok(Message::YourTurn { remaining: None }),
        [t] => Ok(Message::YourTurn {
            remaining: Some(parse_duration(t)?),
        }),
        _ => Err(ProtocolError::Unrecognized(format!("go {}", args.join(" ")))),
    }
}

/// The referee dialect: parsing, rendering and frame conversion.
pub trait Grammar {
    fn parse_message(&self, line: &str) -> Result<Message, ProtocolError>;

    fn render_move(&self, mv: Move) -> String;

    fn render_layout(&self, layout: &Layout) -> String;

    /// Converts a move reported by the opponent into our frame.
    fn opponent_move_to_own_frame(&self, mv: Move) -> Move;
}

/// The parenthesised referee grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefereeGrammar {
    /// Opponent moves arrive in the opponent's frame and are rotated.
    pub mirror_opponent: bool,
}

impl Default for RefereeGrammar {
    fn default() -> Self {
        RefereeGrammar {
            mirror_opponent: true,
        }
    }
}

impl Grammar for RefereeGrammar {
    fn parse_message(&self, line: &str) -> Result<Message, ProtocolError> {
        parse_message(line)
    }

    fn render_move(&self, mv: Move) -> String {
        format_move(mv)
    }

    fn render_layout(&self, layout: &Layout) -> String {
        format_layout(layout)
    }

    fn opponent_move_to_own_frame(&self, mv: Move) -> Move {
        if self.mirror_opponent {
            mv.rotated()
        } else {
            mv
        }
    }
}

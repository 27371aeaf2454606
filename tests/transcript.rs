//! Referee transcripts driven through the agent's line loop.
//!
//! A simulated referee keeps the full-information game, answers every
//! agent move with its outcome and plays random moves for the opponent.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use luzhanqi_agent::board::{GameState, GameStatus, Layout, Move, Player, Side};
use luzhanqi_agent::config::AgentConfig;
use luzhanqi_agent::engine::{run, Agent, AgentError, AgentState};
use luzhanqi_agent::protocol::{format_layout, format_outcome, parse_move};

fn quick_config(player: Player, seed: u64) -> AgentConfig {
    AgentConfig {
        player,
        move_time_ms: 80,
        safety_margin_ms: 30,
        max_depth: 2,
        seed: Some(seed),
        ..AgentConfig::default()
    }
}

/// Drives an agent line by line and collects what it writes.
struct Referee {
    agent: Agent,
    truth: GameState,
    out: Vec<u8>,
    read: usize,
    rng: SmallRng,
    opponent: Player,
}

impl Referee {
    fn new(player: Player, seed: u64) -> Referee {
        let mut rng = SmallRng::seed_from_u64(seed);
        let agent = Agent::new(quick_config(player, seed)).unwrap();
        let opponent_layout = Layout::random(&mut rng).unwrap();
        let truth = GameState::with_opponent_layout(agent.layout(), &opponent_layout, player);
        Referee {
            agent,
            truth,
            out: Vec::new(),
            read: 0,
            rng,
            opponent: player.opposite(),
        }
    }

    fn send(&mut self, line: &str) {
        self.agent
            .handle_line(line, &mut self.out)
            .unwrap_or_else(|e| panic!("agent failed on '{}': {}", line, e));
    }

    fn new_lines(&mut self) -> Vec<String> {
        let text = String::from_utf8_lossy(&self.out[self.read..]).into_owned();
        self.read = self.out.len();
        text.lines().map(str::to_string).collect()
    }

    /// Plays one ply for whichever side is to move. Returns false once
    /// the game is over.
    fn step(&mut self) -> bool {
        if self.truth.is_over() {
            return false;
        }
        match self.truth.side_to_move() {
            Side::Own => {
                let lines = self.new_lines();
                assert_eq!(lines.len(), 1, "expected one agent move, got {:?}", lines);
                let mv = parse_move(&lines[0]).unwrap();
                assert!(self.truth.is_legal_move(mv), "agent played illegal {}", mv);
                let (next, outcome) = self.truth.apply_move(mv).unwrap();
                self.truth = next;
                let report = format!(
                    "( {} {} {} {} )",
                    mv.origin,
                    mv.dest,
                    self.agent_player().number(),
                    format_outcome(outcome)
                );
                self.send(&report);
            }
            Side::Opponent => {
                let moves = self.truth.legal_moves();
                let Some(&mv) = moves.choose(&mut self.rng) else {
                    return false;
                };
                let (next, outcome) = self.truth.apply_move(mv).unwrap();
                self.truth = next;
                let theirs = mv.rotated();
                let report = format!(
                    "( {} {} {} {} )",
                    theirs.origin,
                    theirs.dest,
                    self.opponent.number(),
                    format_outcome(outcome)
                );
                self.send(&report);
            }
        }
        !self.truth.is_over()
    }

    fn agent_player(&self) -> Player {
        self.opponent.opposite()
    }
}

fn play(player: Player, seed: u64, plies: usize) -> Referee {
    let mut referee = Referee::new(player, seed);
    let mut announce = Vec::new();
    referee.agent.announce_layout(&mut announce).unwrap();
    let layout = String::from_utf8(announce).unwrap();
    referee.send(layout.trim());

    for _ in 0..plies {
        if !referee.step() {
            break;
        }
    }
    referee
}

#[test]
fn agent_tracks_a_game_as_first_player() {
    let referee = play(Player::One, 11, 30);
    let game = referee.agent.game().unwrap();
    assert_eq!(game.history.len(), referee.truth.history.len());
    assert_eq!(game.board().count(Side::Own), referee.truth.board().count(Side::Own));
    assert_eq!(
        game.board().count(Side::Opponent),
        referee.truth.board().count(Side::Opponent)
    );
}

#[test]
fn agent_tracks_a_game_as_second_player() {
    let referee = play(Player::Two, 12, 30);
    let game = referee.agent.game().unwrap();
    assert_eq!(game.history.len(), referee.truth.history.len());
    for (station, piece) in referee.truth.board().pieces(Side::Opponent) {
        let seen = game.board().get(station).unwrap();
        assert_eq!(seen.side, Side::Opponent);
        assert_eq!(seen.id, piece.id, "piece identity on {}", station);
    }
}

#[test]
fn belief_keeps_known_ranks_possible() {
    let referee = play(Player::One, 13, 40);
    let belief = referee.agent.belief().unwrap();
    for (_, piece) in referee.truth.board().pieces(Side::Opponent) {
        let rank = piece.rank.unwrap();
        let allowed = belief.allowed(piece.id).unwrap();
        assert!(allowed.contains(rank), "{:?} ruled out {}", piece.id, rank);
        let dist = belief.distribution_for(piece.id).unwrap();
        let total: f64 = dist.iter().map(|(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-6);
    }
}

#[test]
fn result_line_ends_the_session() {
    let mut referee = play(Player::Two, 14, 6);
    referee.send("( 1 wins )");
    assert_eq!(referee.agent.state(), AgentState::GameOver);
    assert_eq!(referee.agent.status(), GameStatus::Won(Player::One));
    referee.new_lines();
    referee.send("( go )");
    assert!(referee.new_lines().is_empty());
}

#[test]
fn scripted_session_through_run() {
    let mut agent = Agent::new(quick_config(Player::Two, 5)).unwrap();
    let input = [
        "Referee ready".to_string(),
        format_layout(&Layout::standard()),
        "( A6 B5 1 move )".to_string(),
        "( draw )".to_string(),
    ]
    .join("\n");
    let mut out = Vec::new();
    let status = run(&mut agent, input.as_bytes(), &mut out).unwrap();
    assert_eq!(status, GameStatus::Draw);

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], format_layout(&Layout::standard()));
    let reply: Move = parse_move(lines[1]).unwrap();
    assert!(reply.origin.is_own_half());
}

#[test]
fn truncated_session_reports_closed_channel() {
    let mut agent = Agent::new(quick_config(Player::One, 6)).unwrap();
    let input = format!("{}\n", format_layout(&Layout::standard()));
    let mut out = Vec::new();
    let err = run(&mut agent, input.as_bytes(), &mut out).unwrap_err();
    assert!(matches!(err, AgentError::ChannelClosed));
    // Layout plus the opening move.
    assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
}

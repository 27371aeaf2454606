//! Agent state management.
//!
//! Holds the game state, belief and configuration between referee
//! messages, and drives the protocol state machine:
//!
//! `AwaitSetup -> AwaitTurn <-> ComputingMove -> EmittingMove -> AwaitTurn`,
//! ending in `GameOver`.
//!
//! Our own moves are applied only when the referee reports them back with
//! their outcome; until then the emitted move is kept as pending.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::belief::{ranks_consistent_with_combat, Belief, BeliefEvent};
use crate::board::{
    GameState, GameStatus, Layout, Move, Piece, Player, Rank, RankSet, RuleError, Side, Station,
};
use crate::config::{AgentConfig, ConfigError};
use crate::protocol::{Grammar, Message, ProtocolError, RefereeGrammar};
use crate::resolve::CombatOutcome;
use crate::search::{select_move, SearchResult, TimeBudget};

/// Protocol state of the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentState {
    AwaitSetup,
    AwaitTurn,
    ComputingMove,
    EmittingMove,
    GameOver,
}

/// Errors that stop the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("malformed referee message: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("referee move does not fit the rules: {0}")]
    Rules(#[from] RuleError),

    #[error("combat on {0} was reported without an outcome")]
    UnreportedCombat(Move),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("referee channel closed before the game ended")]
    ChannelClosed,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// The playing agent.
pub struct Agent<G: Grammar = RefereeGrammar> {
    config: AgentConfig,
    grammar: G,
    state: AgentState,
    layout: Layout,
    game: Option<GameState>,
    belief: Option<Belief>,
    pending: Option<Move>,
    last_search: Option<SearchResult>,
}

impl Agent<RefereeGrammar> {
    /// Creates an agent speaking the default referee grammar.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let grammar = RefereeGrammar {
            mirror_opponent: config.mirror_opponent,
        };
        Agent::with_grammar(config, grammar)
    }
}

impl<G: Grammar> Agent<G> {
    /// Creates an agent with a custom grammar. The initial layout is
    /// chosen here, from the configured source.
    pub fn with_grammar(config: AgentConfig, grammar: G) -> Result<Self, AgentError> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let layout = config.initial_layout(&mut rng)?;
        Ok(Agent {
            config,
            grammar,
            state: AgentState::AwaitSetup,
            layout,
            game: None,
            belief: None,
            pending: None,
            last_search: None,
        })
    }

    /// Creates an agent already in play from an existing game state.
    pub fn resume(config: AgentConfig, grammar: G, game: GameState) -> Result<Self, AgentError> {
        let mut agent = Agent::with_grammar(config, grammar)?;
        agent.belief = Some(Belief::new(game.board()));
        agent.state = if game.is_over() {
            AgentState::GameOver
        } else {
            AgentState::AwaitTurn
        };
        agent.game = Some(game);
        Ok(agent)
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// The game as the agent sees it, once setup is done.
    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    /// Rank belief over the opponent pieces, once setup is done.
    pub fn belief(&self) -> Option<&Belief> {
        self.belief.as_ref()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Our move that the referee has not yet confirmed.
    pub fn pending_move(&self) -> Option<Move> {
        self.pending
    }

    /// Statistics of the most recent search.
    pub fn last_search(&self) -> Option<&SearchResult> {
        self.last_search.as_ref()
    }

    /// Game result so far; `InProgress` before setup.
    pub fn status(&self) -> GameStatus {
        self.game
            .as_ref()
            .map_or(GameStatus::InProgress, GameState::status)
    }

    /// Writes our initial layout to the referee.
    pub fn announce_layout<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self.grammar.render_layout(&self.layout))?;
        out.flush()
    }

    /// Starts the game from `layout`, which becomes our layout.
    pub fn setup(&mut self, layout: Layout) {
        let game = GameState::new(&layout, self.config.player);
        info!(player = %self.config.player, "game set up");
        self.belief = Some(Belief::new(game.board()));
        self.game = Some(game);
        self.layout = layout;
        self.pending = None;
        self.state = AgentState::AwaitTurn;
    }

    /// Handles one line from the referee.
    ///
    /// Malformed lines are fatal while waiting for setup and skipped
    /// afterwards.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<(), AgentError> {
        if self.state == AgentState::GameOver {
            debug!(line, "ignoring message after game over");
            return Ok(());
        }

        let message = match self.grammar.parse_message(line) {
            Ok(m) => m,
            Err(e) if self.state == AgentState::AwaitSetup => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, line, "skipping malformed referee message");
                return Ok(());
            }
        };

        match message {
            Message::Info(text) => {
                info!(referee = %text, "referee info");
                return Ok(());
            }
            Message::Layout(layout) => {
                if self.state == AgentState::AwaitSetup {
                    self.setup(layout);
                    return self.maybe_take_turn(out);
                }
                warn!("ignoring layout received during play");
                return Ok(());
            }
            _ => {}
        }

        if self.state == AgentState::AwaitSetup {
            debug!("no layout from the referee; playing the announced one");
            self.setup(self.layout.clone());
        }

        match message {
            Message::MoveReport {
                mv,
                player,
                outcome,
            } => {
                self.handle_move_report(mv, player, outcome)?;
                self.maybe_take_turn(out)
            }
            Message::YourTurn { remaining } => self.handle_turn(remaining, out),
            Message::Reveal { station, rank } => {
                self.handle_reveal(station, rank);
                Ok(())
            }
            Message::GameResult { winner } => {
                self.handle_result(winner);
                Ok(())
            }
            Message::Info(_) | Message::Layout(_) => Ok(()),
        }
    }

    /// Starts a turn on our own initiative when implicit turns are on.
    fn maybe_take_turn<W: Write>(&mut self, out: &mut W) -> Result<(), AgentError> {
        if !self.config.implicit_turns || self.pending.is_some() {
            return Ok(());
        }
        match &self.game {
            Some(game) if !game.is_over() && game.side_to_move() == Side::Own => {
                self.take_turn(None, out)
            }
            _ => Ok(()),
        }
    }

    /// Handles an explicit turn signal.
    pub fn handle_turn<W: Write>(
        &mut self,
        remaining: Option<Duration>,
        out: &mut W,
    ) -> Result<(), AgentError> {
        if self.pending.is_some() {
            debug!("turn signal while our move is pending; ignored");
            return Ok(());
        }
        match &self.game {
            Some(game) if game.side_to_move() == Side::Opponent => {
                warn!("turn signal while the opponent is to move; ignored");
                Ok(())
            }
            _ => self.take_turn(remaining, out),
        }
    }

    /// Searches for and emits our move.
    fn take_turn<W: Write>(
        &mut self,
        remaining: Option<Duration>,
        out: &mut W,
    ) -> Result<(), AgentError> {
        let (Some(game), Some(belief)) = (&self.game, &self.belief) else {
            return Ok(());
        };
        if game.is_over() {
            self.state = AgentState::GameOver;
            return Ok(());
        }

        self.state = AgentState::ComputingMove;
        let budget = TimeBudget::new(self.config.turn_budget(remaining));
        let result = select_move(game, belief, &budget, &self.config.search_config());
        drop(budget);

        let Some(result) = result else {
            warn!("no legal move available; waiting for the referee");
            self.state = AgentState::AwaitTurn;
            return Ok(());
        };

        self.state = AgentState::EmittingMove;
        writeln!(out, "{}", self.grammar.render_move(result.mv))?;
        out.flush()?;
        self.pending = Some(result.mv);
        self.last_search = Some(result);
        self.state = AgentState::AwaitTurn;
        Ok(())
    }

    /// Applies a move reported by the referee.
    pub fn handle_move_report(
        &mut self,
        mv: Move,
        player: Option<Player>,
        outcome: Option<CombatOutcome>,
    ) -> Result<(), AgentError> {
        let Some(game) = &self.game else {
            return Ok(());
        };
        let side = match player {
            Some(p) => game.side_of(p),
            None => Side::Opponent,
        };

        match side {
            Side::Own => {
                if let Some(pending) = self.pending.take() {
                    if pending != mv {
                        warn!(%pending, reported = %mv, "referee reported a different move");
                    }
                }
                let outcome = match outcome {
                    Some(o) => o,
                    None => self.quiet_outcome(mv)?,
                };
                self.apply(mv, outcome)
            }
            Side::Opponent => {
                self.confirm_pending()?;
                let mv = self.grammar.opponent_move_to_own_frame(mv);
                let outcome = match outcome {
                    Some(o) => o,
                    None => self.quiet_outcome(mv)?,
                };
                self.apply(mv, outcome)
            }
        }
    }

    /// Applies our pending move as a quiet move when the referee went on
    /// without reporting it.
    fn confirm_pending(&mut self) -> Result<(), AgentError> {
        let Some(mv) = self.pending.take() else {
            return Ok(());
        };
        let own_turn = self
            .game
            .as_ref()
            .is_some_and(|g| g.side_to_move() == Side::Own);
        if !own_turn {
            return Ok(());
        }
        debug!(%mv, "applying unreported own move");
        let outcome = self.quiet_outcome(mv)?;
        self.apply(mv, outcome)
    }

    /// The outcome of a move reported without one: only valid for a move
    /// onto an empty station.
    fn quiet_outcome(&self, mv: Move) -> Result<CombatOutcome, AgentError> {
        let occupied = self
            .game
            .as_ref()
            .is_some_and(|g| g.board().get(mv.dest).is_some());
        if occupied {
            Err(AgentError::UnreportedCombat(mv))
        } else {
            Ok(CombatOutcome::NoContact)
        }
    }

    fn apply(&mut self, mv: Move, reported: CombatOutcome) -> Result<(), AgentError> {
        let Some(game) = &self.game else {
            return Ok(());
        };
        let mover = game.side_to_move();
        let attacker = game.board().get(mv.origin);
        let defender = game.board().get(mv.dest);
        let engineer_path = game.position.is_hidden_engineer_path(mv);
        let (mut next, outcome) = game.apply_reported(mv, reported)?;

        info!(side = ?mover, %mv, ?outcome, "move applied");
        if let (Some(attacker), Some(belief)) = (attacker, self.belief.as_mut()) {
            for event in belief_events(mover, attacker, defender, outcome, engineer_path) {
                belief.update(event);
            }
        }

        debug!(board = %next.board(), "board after move");

        if outcome == CombatOutcome::FlagCaptured {
            info!(status = ?next.status(), "game over");
            self.state = AgentState::GameOver;
        } else if next.is_over() {
            info!(status = ?next.status(), "local rules end the game; waiting for the referee");
            next.reopen();
        }
        self.game = Some(next);
        Ok(())
    }

    fn handle_reveal(&mut self, station: Station, rank: Rank) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        let before = game.board().get(station);
        if let Some(Piece {
            side: Side::Own,
            rank: Some(known),
            ..
        }) = before
        {
            if known != rank {
                warn!(%station, %known, %rank, "reveal contradicts our own piece");
            }
            return;
        }
        match game.reveal(station, rank) {
            Some(piece) => {
                debug!(%station, %rank, "opponent piece revealed");
                if let Some(belief) = self.belief.as_mut() {
                    belief.update(BeliefEvent::Revealed {
                        piece: piece.id,
                        rank,
                    });
                }
            }
            None => warn!(%station, %rank, "reveal for an empty station"),
        }
    }

    fn handle_result(&mut self, winner: Option<Player>) {
        if let Some(game) = self.game.as_mut() {
            game.conclude(winner);
        }
        match winner {
            Some(p) if p == self.config.player => info!("game won"),
            Some(_) => info!("game lost"),
            None => info!("game drawn"),
        }
        self.pending = None;
        self.state = AgentState::GameOver;
    }
}

/// Belief observations implied by a move and its outcome.
fn belief_events(
    mover: Side,
    attacker: Piece,
    defender: Option<Piece>,
    outcome: CombatOutcome,
    engineer_path: bool,
) -> Vec<BeliefEvent> {
    let mut events = Vec::new();
    if mover == Side::Opponent {
        events.push(BeliefEvent::Moved { piece: attacker.id });
        if engineer_path {
            events.push(BeliefEvent::Constrained {
                piece: attacker.id,
                allowed: RankSet::single(Rank::Engineer),
            });
        }
    }
    let Some(defender) = defender else {
        return events;
    };

    let (theirs, ours, opponent_attacked) = match mover {
        Side::Opponent => (attacker, defender, true),
        Side::Own => (defender, attacker, false),
    };
    if outcome == CombatOutcome::FlagCaptured && !opponent_attacked {
        events.push(BeliefEvent::Revealed {
            piece: theirs.id,
            rank: Rank::Flag,
        });
    } else if let Some(rank) = ours.rank {
        events.push(BeliefEvent::Constrained {
            piece: theirs.id,
            allowed: ranks_consistent_with_combat(rank, opponent_attacked, outcome),
        });
    }

    let theirs_survived = if opponent_attacked {
        outcome.attacker_survives()
    } else {
        outcome.defender_survives()
    };
    if !theirs_survived {
        events.push(BeliefEvent::Removed { piece: theirs.id });
    }
    events
}

/// Runs the agent over a line-oriented referee channel until the game
/// ends. Returns the final status.
pub fn run<G: Grammar, R: BufRead, W: Write>(
    agent: &mut Agent<G>,
    input: R,
    out: &mut W,
) -> Result<GameStatus, AgentError> {
    agent.announce_layout(out)?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        agent.handle_line(&line, out)?;
        if agent.state() == AgentState::GameOver {
            return Ok(agent.status());
        }
    }
    Err(AgentError::ChannelClosed)
}

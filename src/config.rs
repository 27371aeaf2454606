//! Agent configuration.
//!
//! Loaded from an optional JSON file; every field has a default so an
//! empty object is a valid configuration. Command-line flags override the
//! file after loading.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Layout, LayoutError, Player};
use crate::eval::EvalWeights;
use crate::protocol::{parse_layout, ProtocolError};
use crate::search::SearchConfig;

const DEFAULT_MOVE_TIME_MS: u64 = 2_000;
const DEFAULT_SAFETY_MARGIN_MS: u64 = 150;
const DEFAULT_MAX_DEPTH: u32 = 8;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("invalid layout in config: {0}")]
    Layout(#[from] ProtocolError),

    #[error("could not generate a layout: {0}")]
    Generate(#[from] LayoutError),
}

/// Where the agent's initial layout comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutChoice {
    /// The built-in standard layout.
    #[default]
    Standard,
    /// A random legal layout drawn from the seeded RNG.
    Random,
    /// A layout in referee notation: `( ( A1 1 ) ( B1 F ) ... )`.
    Fixed(String),
}

/// Runtime configuration of the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Seat number; player one moves first.
    pub player: Player,
    /// Time allowed per move, in milliseconds.
    pub move_time_ms: u64,
    /// Reserved for output and scheduling latency.
    pub safety_margin_ms: u64,
    pub max_depth: u32,
    pub seed: Option<u64>,
    /// Start thinking right after an opponent move without waiting for `go`.
    pub implicit_turns: bool,
    /// Opponent moves are reported in the opponent's own frame.
    pub mirror_opponent: bool,
    pub layout: LayoutChoice,
    pub weights: EvalWeights,
}

impl Default for AgentConfig {
    fn default() -> Self {
        AgentConfig {
            player: Player::One,
            move_time_ms: DEFAULT_MOVE_TIME_MS,
            safety_margin_ms: DEFAULT_SAFETY_MARGIN_MS,
            max_depth: DEFAULT_MAX_DEPTH,
            seed: None,
            implicit_turns: true,
            mirror_opponent: true,
            layout: LayoutChoice::default(),
            weights: EvalWeights::default(),
        }
    }
}

impl AgentConfig {
    /// Loads configuration from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path.to_path_buf(),
        })?;
        let config: AgentConfig = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            ConfigError::Parse {
                source,
                path: path.to_path_buf(),
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration without performing I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.move_time_ms == 0 {
            return Err(ConfigError::Invalid("move_time_ms must be positive".into()));
        }
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if let LayoutChoice::Fixed(text) = &self.layout {
            parse_layout(text)?;
        }
        Ok(())
    }

    pub fn move_time(&self) -> Duration {
        Duration::from_millis(self.move_time_ms)
    }

    /// Search time for one turn: the per-move time, capped by the time the
    /// referee says is left, minus the safety margin.
    pub fn turn_budget(&self, remaining: Option<Duration>) -> Duration {
        let limit = match remaining {
            Some(r) => r.min(self.move_time()),
            None => self.move_time(),
        };
        limit.saturating_sub(Duration::from_millis(self.safety_margin_ms))
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            max_depth: self.max_depth,
            weights: self.weights.clone(),
        }
    }

    /// Builds the initial layout this configuration asks for.
    pub fn initial_layout<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Layout, ConfigError> {
        match &self.layout {
            LayoutChoice::Standard => Ok(Layout::standard()),
            LayoutChoice::Random => Ok(Layout::random(rng)?),
            LayoutChoice::Fixed(text) => Ok(parse_layout(text)?),
        }
    }
}

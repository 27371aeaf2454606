//! luzhanqi -- a Luzhanqi player agent for a line-oriented referee.
//!
//! Reads referee messages from stdin and writes the layout and moves to
//! stdout. Diagnostics go to stderr through `tracing`.

use std::ffi::OsString;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use luzhanqi_agent::board::Player;
use luzhanqi_agent::config::AgentConfig;
use luzhanqi_agent::engine::{run, Agent};
use luzhanqi_agent::protocol::parse_duration;

/// Luzhanqi player agent.
#[derive(Debug, Parser)]
#[command(name = "luzhanqi", version, about = "Luzhanqi player agent")]
struct Cli {
    /// Seat to play: 1 moves first.
    #[arg(
        long = "go",
        value_name = "1|2",
        value_parser = parse_player,
        required_unless_present = "config"
    )]
    player: Option<Player>,

    /// Time per move, e.g. `2s`, `2.0s`, `2000ms`. Also accepted as
    /// `--time/move`.
    #[arg(
        long = "time-per-move",
        value_name = "TIME",
        value_parser = parse_time,
        required_unless_present = "config"
    )]
    time_per_move: Option<Duration>,

    /// JSON configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// RNG seed for layout generation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, value_name = "FILTER", default_value = "info")]
    log_level: String,
}

fn parse_player(s: &str) -> Result<Player, String> {
    s.parse::<u8>()
        .ok()
        .and_then(Player::from_number)
        .ok_or_else(|| format!("expected 1 or 2, got '{}'", s))
}

fn parse_time(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/// Rewrites the referee's `--time/move` spelling to a clap-friendly flag.
fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s) if s == "--time/move" || s.starts_with("--time/move=") => {
                OsString::from(s.replacen("--time/move", "--time-per-move", 1))
            }
            _ => arg,
        })
        .collect()
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(cli: &Cli) -> Result<AgentConfig> {
    let mut config = match &cli.config {
        Some(path) => AgentConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AgentConfig::default(),
    };
    if let Some(player) = cli.player {
        config.player = player;
    }
    if let Some(time) = cli.time_per_move {
        config.move_time_ms = u64::try_from(time.as_millis()).unwrap_or(u64::MAX).max(1);
    }
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));
    init_logging(&cli.log_level);

    let config = load_config(&cli)?;
    info!(player = %config.player, move_time_ms = config.move_time_ms, "starting agent");
    let mut agent = Agent::new(config).context("creating agent")?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match run(&mut agent, stdin.lock(), &mut out) {
        Ok(status) => {
            info!(?status, "game finished");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "agent stopped");
            Err(e).context("playing game")
        }
    }
}

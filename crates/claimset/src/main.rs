//! `claimset` command-line runner.
//!
//! Starts a game with the requested mix of human and autonomous agents
//! and logs every view event. Human agents are driven from stdin, one
//! `<agent> <slot>` pair per line; `quit` (or end of input) stops the
//! game.

mod logging;

use std::error::Error;
use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use crossbeam_channel::{Receiver, RecvTimeoutError};

use claimset::prelude::*;

#[derive(Parser)]
#[command(name = "claimset")]
#[command(version)]
#[command(about = "Concurrent claim arbitration over a shared grid")]
struct Cli {
    /// Number of human agents (driven from stdin)
    #[arg(long, default_value = "2")]
    humans: u32,

    /// Number of autonomous agents
    #[arg(long, default_value = "0")]
    bots: u32,

    /// Features per item
    #[arg(long, default_value = "4")]
    features: u32,

    /// Values per feature; also the number of markers per claim
    #[arg(long, default_value = "3")]
    values: u32,

    /// Grid slots
    #[arg(long, default_value = "12")]
    slots: u32,

    /// Round length in ms: positive counts down, 0 shows elapsed time,
    /// negative disables the timer
    #[arg(long, default_value = "60000", allow_negative_numbers = true)]
    countdown_ms: i64,

    /// Remaining time (ms) below which the countdown warns
    #[arg(long, default_value = "5000")]
    warning_ms: i64,

    /// Freeze after a valid claim (ms)
    #[arg(long, default_value = "1000")]
    point_freeze_ms: u64,

    /// Freeze after an invalid claim (ms)
    #[arg(long, default_value = "3000")]
    penalty_freeze_ms: u64,

    /// Delay per item placement or removal (ms)
    #[arg(long, default_value = "100")]
    placement_delay_ms: u64,

    /// Arbiter wake-up period (ms)
    #[arg(long, default_value = "100")]
    tick_ms: u64,

    /// Without a countdown, redeal until the grid holds a claim
    #[arg(long)]
    require_claim: bool,

    /// Log every valid claim on the grid after each deal
    #[arg(long)]
    hints: bool,

    /// Seed for dealing and autonomous agents (default: clock-derived)
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self, rules: &FeatureRules) -> GameConfig {
        let mut agents = vec![AgentKind::Human; self.humans as usize];
        agents.extend(std::iter::repeat_n(AgentKind::Autonomous, self.bots as usize));
        GameConfig {
            agents,
            claim_size: rules.claim_size(),
            pool_size: rules.pool_size(),
            grid_slots: self.slots,
            timer: TimerMode::from_millis(self.countdown_ms, self.warning_ms),
            point_freeze: Duration::from_millis(self.point_freeze_ms),
            penalty_freeze: Duration::from_millis(self.penalty_freeze_ms),
            placement_delay: Duration::from_millis(self.placement_delay_ms),
            tick: Duration::from_millis(self.tick_ms),
            require_claim_on_deal: self.require_claim,
            hints: self.hints,
            seed: self.seed.unwrap_or_else(clock_seed),
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(if cli.verbose { "info" } else { "warn" });

    match run(&cli) {
        Ok(report) => {
            for (agent, score) in report.scores.iter().enumerate() {
                println!("agent {agent}: {score}");
            }
            let winners: Vec<String> = report.winners.iter().map(ToString::to_string).collect();
            if report.finished {
                println!("winners: {}", winners.join(", "));
            } else {
                println!("stopped; leading: {}", winners.join(", "));
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("claimset: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<GameReport, Box<dyn Error>> {
    let rules = FeatureRules::new(cli.features, cli.values)?;
    let config = cli.config(&rules);
    let view = Arc::new(LogView::with_features(rules.clone()));

    let mut game = Game::start(config, Arc::new(rules), view)?;
    let inputs: Vec<InputHandle> = (0..cli.humans)
        .filter_map(|a| game.input(AgentId(a)))
        .collect();
    if inputs.is_empty() {
        return Ok(game.join());
    }

    let quit = spawn_stdin_reader(inputs)?;
    loop {
        if game.is_finished() {
            return Ok(game.join());
        }
        match quit.recv_timeout(Duration::from_millis(100)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return Ok(game.shutdown()),
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

/// Route stdin lines to human agents. The returned channel yields (or
/// disconnects) when the user quits.
fn spawn_stdin_reader(inputs: Vec<InputHandle>) -> io::Result<Receiver<()>> {
    let (quit_tx, quit_rx) = crossbeam_channel::bounded(1);
    thread::Builder::new()
        .name("claimset-input".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" {
                    let _ = quit_tx.send(());
                    return;
                }
                match parse_press(line) {
                    Some((agent, slot)) => match inputs.iter().find(|h| h.agent() == agent) {
                        Some(handle) => {
                            if let Err(err) = handle.press(slot) {
                                tracing::warn!(%agent, %slot, %err, "input dropped");
                            }
                        }
                        None => tracing::warn!(%agent, "not a human agent"),
                    },
                    None => tracing::warn!(line, "expected `<agent> <slot>`"),
                }
            }
        })?;
    Ok(quit_rx)
}

fn parse_press(line: &str) -> Option<(AgentId, SlotId)> {
    let mut parts = line.split_whitespace();
    let agent = parts.next()?.parse().ok()?;
    let slot = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((AgentId(agent), SlotId(slot)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_agent_and_slot() {
        assert_eq!(parse_press("1 7"), Some((AgentId(1), SlotId(7))));
        assert_eq!(parse_press("  0   11 "), Some((AgentId(0), SlotId(11))));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_press("1"), None);
        assert_eq!(parse_press("a 2"), None);
        assert_eq!(parse_press("1 2 3"), None);
        assert_eq!(parse_press("-1 2"), None);
    }

    #[test]
    fn cli_maps_onto_config() {
        let cli = Cli::parse_from([
            "claimset",
            "--humans",
            "1",
            "--bots",
            "2",
            "--countdown-ms",
            "-1",
            "--seed",
            "9",
        ]);
        let rules = FeatureRules::classic();
        let config = cli.config(&rules);
        assert_eq!(
            config.agents,
            vec![AgentKind::Human, AgentKind::Autonomous, AgentKind::Autonomous]
        );
        assert_eq!(config.timer, TimerMode::Disabled);
        assert_eq!(config.pool_size, 81);
        assert_eq!(config.seed, 9);
        assert_eq!(config.validate(), Ok(()));
    }
}

//! Batch simulation of game rounds
//!
//! Plays many rounds of one game with a fixed stake on a throwaway casino
//! and reports the empirical return-to-player, win rate and house edge.

use crate::casino::Casino;
use crate::config::HeyBetConfig;
use crate::errors::{ConfigurationError, HeyBetResult};
use crate::games::crash::CrashPhase;
use crate::games::mines::{RevealOutcome, GRID_SIZE};
use crate::games::types::{Color, GameKind};
use crate::ledger::SettlementReceipt;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum SimulationScenario {
    Double { rounds: usize, stake: f64, choice: Color },
    /// Cash out as soon as the multiplier reaches `target`
    Crash { rounds: usize, stake: f64, target: f64 },
    /// Reveal `reveals` cells, then cash out
    Mines {
        rounds: usize,
        stake: f64,
        mines: usize,
        reveals: usize,
    },
    Slots { rounds: usize, stake: f64 },
}

impl SimulationScenario {
    pub fn game(&self) -> GameKind {
        match self {
            SimulationScenario::Double { .. } => GameKind::Double,
            SimulationScenario::Crash { .. } => GameKind::Crash,
            SimulationScenario::Mines { .. } => GameKind::Mines,
            SimulationScenario::Slots { .. } => GameKind::Slots,
        }
    }

    pub fn rounds(&self) -> usize {
        match *self {
            SimulationScenario::Double { rounds, .. }
            | SimulationScenario::Crash { rounds, .. }
            | SimulationScenario::Mines { rounds, .. }
            | SimulationScenario::Slots { rounds, .. } => rounds,
        }
    }

    pub fn stake(&self) -> f64 {
        match *self {
            SimulationScenario::Double { stake, .. }
            | SimulationScenario::Crash { stake, .. }
            | SimulationScenario::Mines { stake, .. }
            | SimulationScenario::Slots { stake, .. } => stake,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub game: GameKind,
    pub rounds: usize,
    pub wins: usize,
    pub total_staked: f64,
    pub total_paid: f64,
    /// Fraction of rounds won
    pub win_rate: f64,
    /// Total paid over total staked
    pub rtp: f64,
    pub house_edge: f64,
    pub execution_time: Duration,
}

#[derive(Default)]
struct Tally {
    rounds: usize,
    wins: usize,
    staked: f64,
    paid: f64,
}

impl Tally {
    fn record(&mut self, receipt: &SettlementReceipt) {
        self.rounds += 1;
        self.staked += receipt.record.stake;
        self.paid += receipt.record.payout;
        if receipt.record.won {
            self.wins += 1;
        }
    }

    fn into_report(self, game: GameKind, execution_time: Duration) -> SimulationReport {
        let win_rate = if self.rounds > 0 {
            self.wins as f64 / self.rounds as f64
        } else {
            0.0
        };
        let rtp = if self.staked > 0.0 { self.paid / self.staked } else { 0.0 };

        SimulationReport {
            game,
            rounds: self.rounds,
            wins: self.wins,
            total_staked: self.staked,
            total_paid: self.paid,
            win_rate,
            rtp,
            house_edge: 1.0 - rtp,
            execution_time,
        }
    }
}

pub struct Simulator {
    config: HeyBetConfig,
    seed: Option<u64>,
}

impl Simulator {
    pub fn new(config: HeyBetConfig) -> Self {
        Self { config, seed: None }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn run(&self, scenario: &SimulationScenario) -> HeyBetResult<SimulationReport> {
        let start = Instant::now();
        let stake = scenario.stake();
        let rounds = scenario.rounds();

        // Enough to cover every stake even if every round loses
        let mut config = self.config.clone();
        config.ledger.initial_balance = stake * (rounds as f64 + 1.0);
        let mut casino = Casino::with_seed(config, self.seed);
        let mut tally = Tally::default();

        match *scenario {
            SimulationScenario::Double { choice, .. } => {
                for _ in 0..rounds {
                    tally.record(&casino.play_double(stake, choice)?);
                }
            }
            SimulationScenario::Slots { .. } => {
                for _ in 0..rounds {
                    tally.record(&casino.spin_slots(stake)?.receipt);
                }
            }
            SimulationScenario::Mines { mines, reveals, .. } => {
                if reveals == 0 || reveals > GRID_SIZE.saturating_sub(mines) {
                    return Err(ConfigurationError::InvalidValue {
                        field: "reveals".to_string(),
                        value: reveals.to_string(),
                        reason: format!("must be between 1 and {}", GRID_SIZE.saturating_sub(mines)),
                    }
                    .into());
                }
                for _ in 0..rounds {
                    tally.record(&play_mines_round(&mut casino, stake, mines, reveals)?);
                }
            }
            SimulationScenario::Crash { target, .. } => {
                if !target.is_finite() || target < 1.0 {
                    return Err(ConfigurationError::InvalidValue {
                        field: "target".to_string(),
                        value: target.to_string(),
                        reason: "must be at least 1.0".to_string(),
                    }
                    .into());
                }
                for _ in 0..rounds {
                    tally.record(&play_crash_round(&mut casino, stake, target)?);
                }
            }
        }

        let report = tally.into_report(scenario.game(), start.elapsed());
        info!(
            game = %report.game,
            rounds = report.rounds,
            rtp = report.rtp,
            win_rate = report.win_rate,
            "Simulation finished"
        );
        Ok(report)
    }
}

/// Layouts are uniformly random, so revealing cells in index order is as good
/// as any other pick order
fn play_mines_round(
    casino: &mut Casino,
    stake: f64,
    mines: usize,
    reveals: usize,
) -> HeyBetResult<SettlementReceipt> {
    casino.start_mines(stake, mines)?;

    let mut settled = None;
    for cell in 0..reveals {
        let reveal = casino.reveal_mine_cell(cell)?;
        if let RevealOutcome::Mine(_) = reveal.outcome {
            settled = reveal.receipt;
            break;
        }
    }

    let receipt = match settled {
        Some(receipt) => receipt,
        None => casino.cash_out_mines()?,
    };
    casino.reset_mines()?;
    Ok(receipt)
}

fn play_crash_round(casino: &mut Casino, stake: f64, target: f64) -> HeyBetResult<SettlementReceipt> {
    let tick = casino.config().tick_interval();

    // Fast-forward to the next betting window
    while casino.crash().phase() != CrashPhase::Betting {
        casino.advance_crash(tick)?;
    }
    casino.place_crash_bet(stake)?;

    loop {
        if let Some(receipt) = casino.advance_crash(tick)?.receipts.pop() {
            return Ok(receipt);
        }

        let crash = casino.crash();
        if crash.phase() == CrashPhase::Flying && crash.multiplier() >= target {
            return casino.cash_out_crash();
        }
    }
}

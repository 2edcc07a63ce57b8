//! Casino facade: one player's seat at every table
//!
//! Owns the ledger, the random source and one engine per game. Stakes are
//! checked before a round starts, and every settlement an engine produces is
//! applied to the ledger before the call returns.

use crate::config::HeyBetConfig;
use crate::errors::{HeyBetResult, ValidationError};
use crate::games::crash::{CrashEvent, CrashGame};
use crate::games::double::DoubleGame;
use crate::games::mines::{MinesRound, MinesTable, RevealOutcome};
use crate::games::slots::{SlotSpin, SlotsGame};
use crate::games::types::Color;
use crate::ledger::{Ledger, SettlementReceipt};
use crate::payments::{Payment, PaymentDesk, PaymentReceipt};
use crate::rng::{RandomSource, SeededRng};
use std::time::Duration;

/// Result of one mines reveal; a mine settles the round immediately
#[derive(Debug, Clone)]
pub struct MinesReveal {
    pub outcome: RevealOutcome,
    pub receipt: Option<SettlementReceipt>,
}

/// Events from one crash step plus any bet they settled
#[derive(Debug, Clone, Default)]
pub struct CrashAdvance {
    pub events: Vec<CrashEvent>,
    pub receipts: Vec<SettlementReceipt>,
}

#[derive(Debug, Clone)]
pub struct SlotsReceipt {
    pub spin: SlotSpin,
    pub receipt: SettlementReceipt,
}

pub struct Casino<R = SeededRng> {
    config: HeyBetConfig,
    ledger: Ledger,
    rng: R,
    double: DoubleGame,
    slots: SlotsGame,
    mines: MinesTable,
    crash: CrashGame,
}

impl Casino<SeededRng> {
    pub fn with_seed(config: HeyBetConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SeededRng::from_seed(seed),
            None => SeededRng::from_entropy(),
        };
        Self::new(config, rng)
    }
}

impl<R: RandomSource> Casino<R> {
    pub fn new(config: HeyBetConfig, rng: R) -> Self {
        Self {
            ledger: Ledger::from_config(&config.ledger),
            double: DoubleGame::new(config.double.clone()),
            slots: SlotsGame::new(config.slots.clone()),
            mines: MinesTable::new(config.mines.clone()),
            crash: CrashGame::new(config.crash.clone()),
            config,
            rng,
        }
    }

    pub fn config(&self) -> &HeyBetConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn balance(&self) -> f64 {
        self.ledger.balance()
    }

    /// Stakes still riding on an open mines or crash round
    pub fn committed(&self) -> f64 {
        self.open_mines_stake().unwrap_or(0.0) + self.crash.active_stake().unwrap_or(0.0)
    }

    /// Reject a stake that is not positive or not covered by the free balance
    pub fn check_stake(&self, stake: f64) -> Result<(), ValidationError> {
        self.ledger.validate_stake(stake)?;

        let free = self.ledger.balance() - self.committed();
        if stake > free {
            return Err(ValidationError::InsufficientFunds {
                requested: stake,
                balance: free,
            });
        }
        Ok(())
    }

    /// The ledger must still hold a riding stake before its round may settle
    fn ensure_covered(&self, stake: Option<f64>) -> Result<(), ValidationError> {
        match stake {
            Some(stake) if stake > self.ledger.balance() => Err(ValidationError::InsufficientFunds {
                requested: stake,
                balance: self.ledger.balance(),
            }),
            _ => Ok(()),
        }
    }

    fn open_mines_stake(&self) -> Option<f64> {
        self.mines
            .round()
            .filter(|round| !round.state().is_terminal())
            .map(MinesRound::stake)
    }

    /// Complete a deposit or withdrawal; stakes riding on open rounds cannot be withdrawn
    pub fn complete_payment(&mut self, desk: &PaymentDesk, payment: Payment) -> HeyBetResult<PaymentReceipt> {
        let held = self.committed();
        desk.complete_holding(payment, &mut self.ledger, held)
    }

    pub fn play_double(&mut self, stake: f64, choice: Color) -> HeyBetResult<SettlementReceipt> {
        self.check_stake(stake)?;
        let settlement = self.double.play(stake, choice, &mut self.rng);
        self.ledger.apply_settlement(settlement)
    }

    /// Color pick against a known wheel result
    pub fn play_double_forced(
        &mut self,
        stake: f64,
        choice: Color,
        outcome: Color,
    ) -> HeyBetResult<SettlementReceipt> {
        self.check_stake(stake)?;
        let settlement = self.double.resolve(stake, choice, outcome);
        self.ledger.apply_settlement(settlement)
    }

    pub fn spin_slots(&mut self, stake: f64) -> HeyBetResult<SlotsReceipt> {
        self.check_stake(stake)?;
        let spin = self.slots.spin(stake, &mut self.rng);
        let receipt = self.ledger.apply_settlement(spin.settlement.clone())?;
        Ok(SlotsReceipt { spin, receipt })
    }

    pub fn mines(&self) -> &MinesTable {
        &self.mines
    }

    pub fn start_mines(&mut self, stake: f64, mines_count: usize) -> HeyBetResult<&MinesRound> {
        self.check_stake(stake)?;
        self.mines.start(stake, mines_count, &mut self.rng)
    }

    pub fn start_mines_with_layout(&mut self, stake: f64, mine_cells: &[usize]) -> HeyBetResult<&MinesRound> {
        self.check_stake(stake)?;
        self.mines.start_with_layout(stake, mine_cells)
    }

    pub fn reveal_mine_cell(&mut self, cell: usize) -> HeyBetResult<MinesReveal> {
        self.ensure_covered(self.open_mines_stake())?;
        let outcome = self.mines.reveal(cell)?;
        let receipt = match &outcome {
            RevealOutcome::Mine(settlement) => Some(self.ledger.apply_settlement(settlement.clone())?),
            RevealOutcome::Diamond { .. } => None,
        };
        Ok(MinesReveal { outcome, receipt })
    }

    pub fn cash_out_mines(&mut self) -> HeyBetResult<SettlementReceipt> {
        self.ensure_covered(self.open_mines_stake())?;
        let settlement = self.mines.cash_out()?;
        self.ledger.apply_settlement(settlement)
    }

    pub fn reset_mines(&mut self) -> HeyBetResult<()> {
        self.mines.reset()
    }

    pub fn crash(&self) -> &CrashGame {
        &self.crash
    }

    pub fn place_crash_bet(&mut self, stake: f64) -> HeyBetResult<()> {
        self.check_stake(stake)?;
        self.crash.place_bet(stake)?;
        Ok(())
    }

    pub fn cash_out_crash(&mut self) -> HeyBetResult<SettlementReceipt> {
        self.ensure_covered(self.crash.active_stake())?;
        let settlement = self.crash.cash_out()?;
        self.ledger.apply_settlement(settlement)
    }

    /// Step the crash table by `elapsed`, settling a bet lost to a crash
    pub fn advance_crash(&mut self, elapsed: Duration) -> HeyBetResult<CrashAdvance> {
        self.ensure_covered(self.crash.active_stake())?;
        let events = self.crash.advance(elapsed, &mut self.rng);
        let mut receipts = Vec::new();
        for event in &events {
            if let CrashEvent::Crashed {
                settlement: Some(settlement),
                ..
            } = event
            {
                receipts.push(self.ledger.apply_settlement(settlement.clone())?);
            }
        }
        Ok(CrashAdvance { events, receipts })
    }
}

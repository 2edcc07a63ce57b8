//! Player balance and bet history
//!
//! The ledger is the only owner of the balance. Rounds never touch it
//! directly: they hand a [`Settlement`] to [`Ledger::apply_settlement`], which
//! applies `balance += payout - stake`, prepends the bet record to the
//! history and recomputes the aggregate stats. All mutation goes through
//! `&mut self`, so two settlements can never be in flight at once.

use crate::config::LedgerConfig;
use crate::errors::{HeyBetResult, ValidationError};
use crate::games::types::{BetRecord, Settlement};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::info;

/// Aggregate over the full bet history
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct GameStats {
    pub total_rounds: usize,
    pub total_staked: f64,
    pub total_paid_out: f64,
    /// Percentage of won rounds, rounded to the nearest integer
    pub win_rate: u32,
}

impl GameStats {
    pub fn from_history<'a>(history: impl IntoIterator<Item = &'a BetRecord>) -> Self {
        let mut stats = GameStats::default();
        let mut wins = 0usize;

        for record in history {
            stats.total_rounds += 1;
            stats.total_staked += record.stake;
            stats.total_paid_out += record.payout;
            if record.won {
                wins += 1;
            }
        }

        if stats.total_rounds > 0 {
            stats.win_rate = ((wins as f64 / stats.total_rounds as f64) * 100.0).round() as u32;
        }
        stats
    }

    pub fn net_result(&self) -> f64 {
        self.total_paid_out - self.total_staked
    }
}

/// Outcome of applying one settlement
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementReceipt {
    pub record: BetRecord,
    pub balance_before: f64,
    pub balance_after: f64,
}

/// Immutable copy of the ledger state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerSnapshot {
    pub balance: f64,
    pub history: Vec<BetRecord>,
    pub stats: GameStats,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    balance: f64,
    history: VecDeque<BetRecord>,
    stats: GameStats,
}

impl Ledger {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance.max(0.0),
            history: VecDeque::new(),
            stats: GameStats::default(),
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(config.initial_balance)
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// Resolved rounds, newest first
    pub fn history(&self) -> impl ExactSizeIterator<Item = &BetRecord> + '_ {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&BetRecord> {
        self.history.front()
    }

    pub fn stats(&self) -> GameStats {
        self.stats
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            balance: self.balance,
            history: self.history.iter().cloned().collect(),
            stats: self.stats,
        }
    }

    /// Check a stake before a round starts
    pub fn validate_stake(&self, stake: f64) -> Result<(), ValidationError> {
        if !stake.is_finite() || stake <= 0.0 {
            return Err(ValidationError::InvalidStake(stake));
        }
        if stake > self.balance {
            return Err(ValidationError::InsufficientFunds {
                requested: stake,
                balance: self.balance,
            });
        }
        Ok(())
    }

    /// Apply a resolved round: debit the stake, credit the payout, record it
    pub fn apply_settlement(&mut self, settlement: Settlement) -> HeyBetResult<SettlementReceipt> {
        let stake = settlement.stake();
        let payout = settlement.payout();

        if !stake.is_finite() || stake < 0.0 {
            return Err(ValidationError::InvalidStake(stake).into());
        }
        if !payout.is_finite() || payout < 0.0 {
            return Err(ValidationError::InvalidStake(payout).into());
        }
        if stake > self.balance {
            return Err(ValidationError::InsufficientFunds {
                requested: stake,
                balance: self.balance,
            }
            .into());
        }

        let balance_before = self.balance;
        self.balance = balance_before - stake + payout;

        let record = settlement.into_record();
        self.history.push_front(record.clone());
        self.stats = GameStats::from_history(&self.history);

        info!(
            game = %record.game(),
            bet_id = %record.id,
            stake,
            payout,
            balance = self.balance,
            "Settlement applied"
        );

        Ok(SettlementReceipt {
            record,
            balance_before,
            balance_after: self.balance,
        })
    }

    /// Credit a deposit; no bet record is created
    pub fn deposit(&mut self, amount: f64) -> Result<f64, ValidationError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::InvalidStake(amount));
        }
        self.balance += amount;
        Ok(self.balance)
    }

    /// Debit a withdrawal; no bet record is created
    pub fn withdraw(&mut self, amount: f64) -> Result<f64, ValidationError> {
        self.validate_stake(amount)?;
        self.balance -= amount;
        Ok(self.balance)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HeyBetError;
    use crate::games::types::{Color, RoundDetails};

    fn double(choice: Color, result: Color) -> RoundDetails {
        RoundDetails::Double { choice, result }
    }

    #[test]
    fn test_win_updates_balance_and_history() {
        let mut ledger = Ledger::new(1000.0);
        let receipt = ledger
            .apply_settlement(Settlement::win(100.0, 200.0, double(Color::Red, Color::Red)))
            .unwrap();

        assert_eq!(receipt.balance_before, 1000.0);
        assert_eq!(receipt.balance_after, 1100.0);
        assert_eq!(ledger.balance(), 1100.0);
        assert_eq!(ledger.history().len(), 1);
        assert!(ledger.latest().unwrap().won);
    }

    #[test]
    fn test_balance_identity_holds_across_rounds() {
        let mut ledger = Ledger::new(500.0);
        let rounds = [
            Settlement::loss(40.0, double(Color::Red, Color::Black)),
            Settlement::win(60.0, 120.0, double(Color::Black, Color::Black)),
            Settlement::loss(0.0, double(Color::Black, Color::Red)),
            Settlement::win(12.5, 31.25, double(Color::Red, Color::Red)),
        ];

        for settlement in rounds {
            let before = ledger.balance();
            let (stake, payout) = (settlement.stake(), settlement.payout());
            let receipt = ledger.apply_settlement(settlement).unwrap();
            assert_eq!(receipt.balance_after, before - stake + payout);
        }
    }

    #[test]
    fn test_history_is_newest_first() {
        let mut ledger = Ledger::new(100.0);
        let first = ledger
            .apply_settlement(Settlement::loss(10.0, double(Color::Red, Color::Black)))
            .unwrap();
        let second = ledger
            .apply_settlement(Settlement::loss(20.0, double(Color::Red, Color::Black)))
            .unwrap();

        let ids: Vec<_> = ledger.history().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![second.record.id, first.record.id]);
    }

    #[test]
    fn test_stats_recomputed() {
        let mut ledger = Ledger::new(1000.0);
        ledger
            .apply_settlement(Settlement::win(100.0, 200.0, double(Color::Red, Color::Red)))
            .unwrap();
        ledger
            .apply_settlement(Settlement::loss(50.0, double(Color::Red, Color::Black)))
            .unwrap();
        ledger
            .apply_settlement(Settlement::loss(50.0, double(Color::Red, Color::Black)))
            .unwrap();

        let stats = ledger.stats();
        assert_eq!(stats.total_rounds, 3);
        assert_eq!(stats.total_staked, 200.0);
        assert_eq!(stats.total_paid_out, 200.0);
        assert_eq!(stats.win_rate, 33);
        assert_eq!(stats.net_result(), 0.0);
    }

    #[test]
    fn test_settlement_above_balance_is_rejected_without_mutation() {
        let mut ledger = Ledger::new(30.0);
        let err = ledger
            .apply_settlement(Settlement::loss(31.0, double(Color::Red, Color::Black)))
            .unwrap_err();

        assert!(matches!(
            err,
            HeyBetError::Validation(ValidationError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.balance(), 30.0);
        assert_eq!(ledger.history().len(), 0);
    }

    #[test]
    fn test_validate_stake() {
        let ledger = Ledger::new(100.0);
        assert!(ledger.validate_stake(100.0).is_ok());
        assert_eq!(ledger.validate_stake(0.0), Err(ValidationError::InvalidStake(0.0)));
        assert!(ledger.validate_stake(-5.0).is_err());
        assert!(ledger.validate_stake(f64::NAN).is_err());
        assert!(matches!(
            ledger.validate_stake(100.01),
            Err(ValidationError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_deposit_and_withdraw_leave_history_alone() {
        let mut ledger = Ledger::new(100.0);
        assert_eq!(ledger.deposit(50.0), Ok(150.0));
        assert_eq!(ledger.withdraw(120.0), Ok(30.0));
        assert!(ledger.withdraw(31.0).is_err());
        assert!(ledger.deposit(0.0).is_err());
        assert_eq!(ledger.history().len(), 0);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut ledger = Ledger::default();
        let snapshot = ledger.snapshot();
        ledger
            .apply_settlement(Settlement::loss(10.0, double(Color::Red, Color::Black)))
            .unwrap();

        assert_eq!(snapshot.balance, 1000.0);
        assert!(snapshot.history.is_empty());
        assert_eq!(ledger.snapshot().history.len(), 1);
    }
}

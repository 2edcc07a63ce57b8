//! Configuration management with validation and defaults
//!
//! The tuning constants of every game live here rather than in the game
//! modules: house edges, crash curve, slot bands and payment limits are all
//! adjustable parameters, not business rules.

use crate::errors::{ConfigurationError, HeyBetResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeyBetConfig {
    pub ledger: LedgerConfig,
    pub double: DoubleConfig,
    pub crash: CrashConfig,
    pub mines: MinesConfig,
    pub slots: SlotsConfig,
    pub payments: PaymentsConfig,
}

/// Starting balance for a fresh ledger
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    pub initial_balance: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            initial_balance: 1000.0,
        }
    }
}

/// Color pick (double) settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DoubleConfig {
    pub payout_multiplier: f64,
}

impl Default for DoubleConfig {
    fn default() -> Self {
        Self {
            payout_multiplier: 2.0,
        }
    }
}

/// Crash (aviator) curve and cycle timing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrashConfig {
    /// Interval between multiplier updates while flying
    pub tick_interval_ms: u64,
    /// Upper bound of the random per-tick multiplier increment
    pub max_increment: f64,
    /// Multiplier below which a round never crashes
    pub crash_floor: f64,
    /// Distance above the floor at which the crash probability reaches 1
    pub crash_span: f64,
    /// Cap on the per-tick crash probability
    pub max_crash_probability: f64,
    pub waiting_ms: u64,
    pub betting_countdown_ms: u64,
    pub crashed_hold_ms: u64,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            max_increment: 0.1,
            crash_floor: 1.1,
            crash_span: 8.9,
            max_crash_probability: 1.0,
            waiting_ms: 0,
            betting_countdown_ms: 2000,
            crashed_hold_ms: 3000,
        }
    }
}

/// Mines grid settings
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MinesConfig {
    pub min_mines: usize,
    pub max_mines: usize,
    pub default_mines: usize,
    /// Factor applied to the fair multiplier (0.97 = 3% house edge)
    pub house_edge_factor: f64,
}

impl Default for MinesConfig {
    fn default() -> Self {
        Self {
            min_mines: 1,
            max_mines: 15,
            default_mines: 3,
            house_edge_factor: 0.97,
        }
    }
}

/// Slot reel outcome bands, as independent probabilities
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SlotsConfig {
    pub jackpot_probability: f64,
    pub triple_probability: f64,
    pub pair_probability: f64,
}

impl Default for SlotsConfig {
    fn default() -> Self {
        Self {
            jackpot_probability: 0.001,
            triple_probability: 0.004,
            pair_probability: 0.045,
        }
    }
}

/// Mock deposit and withdrawal limits
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PaymentsConfig {
    pub min_deposit: f64,
    pub max_deposit: f64,
    pub min_withdraw: f64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            min_deposit: 10.0,
            max_deposit: 10_000.0,
            min_withdraw: 50.0,
        }
    }
}

impl HeyBetConfig {
    /// Short delays for demos and tests that drive the crash cycle in real time
    pub fn fast_rounds() -> Self {
        Self {
            crash: CrashConfig {
                tick_interval_ms: 10,
                betting_countdown_ms: 50,
                crashed_hold_ms: 50,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.ledger.initial_balance.is_finite() || self.ledger.initial_balance < 0.0 {
            return Err(invalid("ledger.initial_balance", self.ledger.initial_balance, "must be a non-negative amount"));
        }

        if !(self.double.payout_multiplier.is_finite() && self.double.payout_multiplier > 1.0) {
            return Err(invalid("double.payout_multiplier", self.double.payout_multiplier, "must be > 1"));
        }

        let crash = &self.crash;
        if crash.tick_interval_ms == 0 {
            return Err(invalid("crash.tick_interval_ms", crash.tick_interval_ms, "must be > 0"));
        }
        if !(crash.max_increment.is_finite() && crash.max_increment > 0.0) {
            return Err(invalid("crash.max_increment", crash.max_increment, "must be > 0"));
        }
        if !(crash.crash_floor.is_finite() && crash.crash_floor >= 1.0) {
            return Err(invalid("crash.crash_floor", crash.crash_floor, "must be >= 1"));
        }
        if !(crash.crash_span.is_finite() && crash.crash_span > 0.0) {
            return Err(invalid("crash.crash_span", crash.crash_span, "must be > 0"));
        }
        if !(crash.max_crash_probability > 0.0 && crash.max_crash_probability <= 1.0) {
            return Err(invalid(
                "crash.max_crash_probability",
                crash.max_crash_probability,
                "must be in (0, 1]",
            ));
        }

        let mines = &self.mines;
        if mines.min_mines == 0 || mines.min_mines > mines.max_mines {
            return Err(ConfigurationError::ValidationFailed(format!(
                "mines range {}..={} is empty or starts at zero",
                mines.min_mines, mines.max_mines
            )));
        }
        if mines.max_mines >= crate::games::mines::GRID_SIZE {
            return Err(invalid("mines.max_mines", mines.max_mines, "must leave at least one safe cell"));
        }
        if !(mines.min_mines..=mines.max_mines).contains(&mines.default_mines) {
            return Err(invalid("mines.default_mines", mines.default_mines, "must be inside the mines range"));
        }
        if !(mines.house_edge_factor > 0.0 && mines.house_edge_factor <= 1.0) {
            return Err(invalid("mines.house_edge_factor", mines.house_edge_factor, "must be in (0, 1]"));
        }

        let slots = &self.slots;
        let bands = [slots.jackpot_probability, slots.triple_probability, slots.pair_probability];
        if bands.iter().any(|p| !(p.is_finite() && *p >= 0.0)) || bands.iter().sum::<f64>() >= 1.0 {
            return Err(ConfigurationError::ValidationFailed(
                "slot band probabilities must be non-negative and sum below 1".to_string(),
            ));
        }

        let payments = &self.payments;
        let deposits_ok = payments.min_deposit > 0.0
            && payments.max_deposit.is_finite()
            && payments.min_deposit <= payments.max_deposit;
        if !deposits_ok {
            return Err(ConfigurationError::ValidationFailed(format!(
                "deposit range {}..={} is invalid",
                payments.min_deposit, payments.max_deposit
            )));
        }
        if !(payments.min_withdraw.is_finite() && payments.min_withdraw > 0.0) {
            return Err(invalid("payments.min_withdraw", payments.min_withdraw, "must be > 0"));
        }

        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.crash.tick_interval_ms)
    }

    pub fn betting_countdown(&self) -> Duration {
        Duration::from_millis(self.crash.betting_countdown_ms)
    }

}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Loads configuration from an optional TOML file plus `HEYBET_*` overrides
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> HeyBetResult<HeyBetConfig> {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => HeyBetConfig::default(),
        };

        Self::apply_overrides(&mut config, std::env::vars())?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn load_from_file(path: &Path) -> HeyBetResult<HeyBetConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(toml::from_str(&content)?)
    }

    /// Apply `HEYBET_*` overrides from the given variables
    pub fn apply_overrides<I>(config: &mut HeyBetConfig, vars: I) -> HeyBetResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                "HEYBET_INITIAL_BALANCE" => config.ledger.initial_balance = parse_var(&key, &value)?,
                "HEYBET_MINES_HOUSE_EDGE" => config.mines.house_edge_factor = parse_var(&key, &value)?,
                "HEYBET_CRASH_TICK_MS" => config.crash.tick_interval_ms = parse_var(&key, &value)?,
                "HEYBET_CRASH_COUNTDOWN_MS" => config.crash.betting_countdown_ms = parse_var(&key, &value)?,
                _ => {}
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> HeyBetResult<T> {
    value.parse().map_err(|_| {
        ConfigurationError::InvalidValue {
            field: key.to_string(),
            value: value.to_string(),
            reason: "could not be parsed".to_string(),
        }
        .into()
    })
}

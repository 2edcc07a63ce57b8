//! Crash (aviator) rounds
//!
//! [`CrashGame`] is a pure, time-driven state machine: callers feed it
//! elapsed time and a random source, and it returns the events that
//! happened. [`CrashRunner`] drives it from a tokio interval and serializes
//! player commands onto the same task, so settlements reach the ledger in
//! the order they happen.

use crate::config::CrashConfig;
use crate::errors::{GameError, HeyBetResult};
use crate::games::types::{RoundDetails, Settlement};
use crate::ledger::{Ledger, SettlementReceipt};
use crate::rng::RandomSource;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 1_024;
const COMMAND_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrashPhase {
    Waiting,
    Betting,
    Flying,
    Crashed,
}

/// Everything observable about a crash table
#[derive(Debug, Clone, PartialEq)]
pub enum CrashEvent {
    BettingOpened { round: u64, countdown: Duration },
    FlightStarted { round: u64 },
    MultiplierUpdated { round: u64, multiplier: f64 },
    CashedOut { round: u64, settlement: Settlement },
    /// `settlement` is the losing settlement of a bet that was still riding
    Crashed {
        round: u64,
        multiplier: f64,
        settlement: Option<Settlement>,
    },
    RoundReset { round: u64 },
}

#[derive(Debug, Clone, Copy)]
struct ActiveBet {
    stake: f64,
    cashed_out_at: Option<f64>,
}

/// Per-tick crash probability at multiplier `m`
pub fn crash_probability(config: &CrashConfig, multiplier: f64) -> f64 {
    ((multiplier - config.crash_floor) / config.crash_span).clamp(0.0, config.max_crash_probability)
}

pub struct CrashGame {
    config: CrashConfig,
    phase: CrashPhase,
    phase_elapsed: Duration,
    round: u64,
    multiplier: f64,
    bet: Option<ActiveBet>,
}

impl CrashGame {
    pub fn new(config: CrashConfig) -> Self {
        Self {
            config,
            phase: CrashPhase::Waiting,
            phase_elapsed: Duration::ZERO,
            round: 0,
            multiplier: 1.0,
            bet: None,
        }
    }

    pub fn phase(&self) -> CrashPhase {
        self.phase
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn config(&self) -> &CrashConfig {
        &self.config
    }

    /// Stake riding on the current round, if not yet cashed out
    pub fn active_stake(&self) -> Option<f64> {
        self.bet
            .filter(|bet| bet.cashed_out_at.is_none())
            .map(|bet| bet.stake)
    }

    /// Remaining betting countdown, zero outside the betting phase
    pub fn countdown_remaining(&self) -> Duration {
        match self.phase {
            CrashPhase::Betting => self.countdown().saturating_sub(self.phase_elapsed),
            _ => Duration::ZERO,
        }
    }

    /// Never zero, so a flight always consumes time
    fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms.max(1))
    }

    fn countdown(&self) -> Duration {
        Duration::from_millis(self.config.betting_countdown_ms)
    }

    fn phase_length(&self) -> Duration {
        match self.phase {
            CrashPhase::Waiting => Duration::from_millis(self.config.waiting_ms),
            CrashPhase::Betting => self.countdown(),
            CrashPhase::Flying => self.tick_interval(),
            CrashPhase::Crashed => Duration::from_millis(self.config.crashed_hold_ms),
        }
    }

    /// Move the table forward by `elapsed`, running every transition and
    /// flight tick that falls inside it
    pub fn advance(&mut self, elapsed: Duration, rng: &mut impl RandomSource) -> Vec<CrashEvent> {
        let mut events = Vec::new();
        let mut remaining = elapsed;

        loop {
            let left = self.phase_length().saturating_sub(self.phase_elapsed);
            if remaining < left {
                self.phase_elapsed += remaining;
                break;
            }
            remaining -= left;
            self.phase_elapsed = Duration::ZERO;

            match self.phase {
                CrashPhase::Waiting => self.open_betting(&mut events),
                CrashPhase::Betting => self.take_off(&mut events),
                CrashPhase::Flying => self.tick(rng, &mut events),
                CrashPhase::Crashed => self.reset(&mut events),
            }
        }

        events
    }

    fn open_betting(&mut self, events: &mut Vec<CrashEvent>) {
        self.round += 1;
        self.phase = CrashPhase::Betting;
        self.multiplier = 1.0;
        self.bet = None;
        debug!(round = self.round, "Betting opened");
        events.push(CrashEvent::BettingOpened {
            round: self.round,
            countdown: self.countdown(),
        });
    }

    fn take_off(&mut self, events: &mut Vec<CrashEvent>) {
        self.phase = CrashPhase::Flying;
        self.multiplier = 1.0;
        debug!(round = self.round, has_bet = self.bet.is_some(), "Flight started");
        events.push(CrashEvent::FlightStarted { round: self.round });
    }

    fn tick(&mut self, rng: &mut impl RandomSource, events: &mut Vec<CrashEvent>) {
        self.multiplier += rng.unit() * self.config.max_increment;

        let probability = crash_probability(&self.config, self.multiplier);
        if !rng.chance(probability) {
            events.push(CrashEvent::MultiplierUpdated {
                round: self.round,
                multiplier: self.multiplier,
            });
            return;
        }

        self.phase = CrashPhase::Crashed;
        let settlement = self.active_stake().map(|stake| {
            Settlement::loss(
                stake,
                RoundDetails::Crash {
                    cashed_out_at: None,
                    crashed_at: Some(self.multiplier),
                },
            )
        });
        self.bet = None;

        info!(round = self.round, multiplier = self.multiplier, "Crashed");
        events.push(CrashEvent::Crashed {
            round: self.round,
            multiplier: self.multiplier,
            settlement,
        });
    }

    fn reset(&mut self, events: &mut Vec<CrashEvent>) {
        self.phase = CrashPhase::Waiting;
        self.multiplier = 1.0;
        self.bet = None;
        events.push(CrashEvent::RoundReset { round: self.round });
    }

    /// Register a stake for the current round; affordability is the caller's check
    pub fn place_bet(&mut self, stake: f64) -> Result<(), GameError> {
        if self.phase != CrashPhase::Betting {
            return Err(GameError::BettingClosed);
        }
        if self.bet.is_some() {
            return Err(GameError::BetAlreadyPlaced);
        }

        self.bet = Some(ActiveBet {
            stake,
            cashed_out_at: None,
        });
        debug!(round = self.round, stake, "Crash bet placed");
        Ok(())
    }

    /// Settle the riding bet at the current multiplier; the flight continues
    pub fn cash_out(&mut self) -> Result<Settlement, GameError> {
        if self.phase != CrashPhase::Flying {
            return Err(GameError::NotFlying);
        }

        let multiplier = self.multiplier;
        let bet = self
            .bet
            .as_mut()
            .filter(|bet| bet.cashed_out_at.is_none())
            .ok_or(GameError::NoActiveBet)?;
        bet.cashed_out_at = Some(multiplier);

        Ok(Settlement::win(
            bet.stake,
            bet.stake * multiplier,
            RoundDetails::Crash {
                cashed_out_at: Some(multiplier),
                crashed_at: None,
            },
        ))
    }
}

enum CrashCommand {
    PlaceBet {
        stake: f64,
        reply: oneshot::Sender<HeyBetResult<()>>,
    },
    CashOut {
        reply: oneshot::Sender<HeyBetResult<SettlementReceipt>>,
    },
    Shutdown,
}

/// Player-side handle to a running crash table
#[derive(Clone)]
pub struct CrashHandle {
    commands: mpsc::Sender<CrashCommand>,
    events: broadcast::Sender<CrashEvent>,
}

impl CrashHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<CrashEvent> {
        self.events.subscribe()
    }

    pub async fn place_bet(&self, stake: f64) -> HeyBetResult<()> {
        let (reply, rx) = oneshot::channel();
        self.send(CrashCommand::PlaceBet { stake, reply }).await?;
        rx.await.map_err(|_| GameError::TableClosed)?
    }

    pub async fn cash_out(&self) -> HeyBetResult<SettlementReceipt> {
        let (reply, rx) = oneshot::channel();
        self.send(CrashCommand::CashOut { reply }).await?;
        rx.await.map_err(|_| GameError::TableClosed)?
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(CrashCommand::Shutdown).await;
    }

    async fn send(&self, command: CrashCommand) -> HeyBetResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GameError::TableClosed.into())
    }
}

/// Next event from a table subscription, skipping any the receiver lagged
/// behind on; `None` once the table is gone
pub async fn next_event(events: &mut broadcast::Receiver<CrashEvent>) -> Option<CrashEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Crash subscriber lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Drives a [`CrashGame`] against a ledger until shut down
pub struct CrashRunner<'a, R> {
    game: CrashGame,
    ledger: &'a mut Ledger,
    rng: R,
    commands: mpsc::Receiver<CrashCommand>,
    events: broadcast::Sender<CrashEvent>,
}

/// Create a crash table bound to `ledger`
///
/// The runner borrows the ledger, so poll it alongside the player logic
/// (for example with `tokio::join!`) rather than spawning it.
pub fn crash_table<R: RandomSource>(
    config: CrashConfig,
    ledger: &mut Ledger,
    rng: R,
) -> (CrashRunner<'_, R>, CrashHandle) {
    let (command_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
    let (events, _) = broadcast::channel(EVENT_CAPACITY);

    let handle = CrashHandle {
        commands: command_tx,
        events: events.clone(),
    };
    let runner = CrashRunner {
        game: CrashGame::new(config),
        ledger,
        rng,
        commands,
        events,
    };

    (runner, handle)
}

impl<'a, R: RandomSource> CrashRunner<'a, R> {
    /// Run until a shutdown command arrives or every handle is dropped
    pub async fn run(mut self) -> CrashGame {
        let mut ticker = tokio::time::interval(self.game.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last = Instant::now();

        info!(
            tick_ms = self.game.config().tick_interval_ms,
            countdown_ms = self.game.config().betting_countdown_ms,
            "Crash table running"
        );

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => {
                    match command {
                        Some(CrashCommand::PlaceBet { stake, reply }) => {
                            let _ = reply.send(self.place_bet(stake));
                        }
                        Some(CrashCommand::CashOut { reply }) => {
                            let _ = reply.send(self.cash_out());
                        }
                        Some(CrashCommand::Shutdown) | None => break,
                    }
                }
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let events = self.game.advance(now - last, &mut self.rng);
                    last = now;
                    for event in events {
                        self.publish(event);
                    }
                }
            }
        }

        info!(rounds = self.game.round(), "Crash table stopped");
        self.game
    }

    fn place_bet(&mut self, stake: f64) -> HeyBetResult<()> {
        self.ledger.validate_stake(stake)?;
        self.game.place_bet(stake)?;
        Ok(())
    }

    fn cash_out(&mut self) -> HeyBetResult<SettlementReceipt> {
        let settlement = self.game.cash_out()?;
        let receipt = self.ledger.apply_settlement(settlement.clone())?;
        self.publish(CrashEvent::CashedOut {
            round: self.game.round(),
            settlement,
        });
        Ok(receipt)
    }

    fn publish(&mut self, event: CrashEvent) {
        if let CrashEvent::Crashed {
            settlement: Some(settlement),
            ..
        } = &event
        {
            if let Err(e) = self.ledger.apply_settlement(settlement.clone()) {
                warn!("Failed to settle crashed bet: {}", e);
            }
        }
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HeyBetConfig;
    use crate::errors::HeyBetError;
    use crate::rng::{ScriptedRng, SeededRng};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn betting_game() -> CrashGame {
        let mut game = CrashGame::new(CrashConfig::default());
        let mut rng = SeededRng::from_seed(1);
        let events = game.advance(Duration::ZERO, &mut rng);
        assert_eq!(
            events,
            vec![CrashEvent::BettingOpened {
                round: 1,
                countdown: ms(2000)
            }]
        );
        game
    }

    #[test]
    fn test_crash_probability_curve() {
        let config = CrashConfig::default();
        assert_eq!(crash_probability(&config, 1.0), 0.0);
        assert_eq!(crash_probability(&config, 1.1), 0.0);
        assert!((crash_probability(&config, 5.55) - 0.5).abs() < 1e-9);
        assert_eq!(crash_probability(&config, 12.0), 1.0);
    }

    #[test]
    fn test_phase_cycle() {
        let mut game = betting_game();
        assert_eq!(game.phase(), CrashPhase::Betting);
        assert_eq!(game.countdown_remaining(), ms(2000));

        // Below the crash floor no tick can crash: unit 0.5 adds 0.05
        let mut rng = ScriptedRng::new([0.5, 0.0]);
        let events = game.advance(ms(2100), &mut rng);
        assert_eq!(events[0], CrashEvent::FlightStarted { round: 1 });
        assert!(matches!(
            events[1],
            CrashEvent::MultiplierUpdated { round: 1, multiplier } if (multiplier - 1.05).abs() < 1e-9
        ));

        // Past the floor a zero draw always crashes
        let mut rng = ScriptedRng::new([0.99, 0.99, 0.5, 0.0]);
        let mut crashed = false;
        for _ in 0..200 {
            let events = game.advance(ms(100), &mut rng);
            if events.iter().any(|e| matches!(e, CrashEvent::Crashed { .. })) {
                crashed = true;
                break;
            }
        }
        assert!(crashed);
        assert_eq!(game.phase(), CrashPhase::Crashed);

        let events = game.advance(ms(3000), &mut rng);
        assert_eq!(events[0], CrashEvent::RoundReset { round: 1 });
        assert!(matches!(events[1], CrashEvent::BettingOpened { round: 2, .. }));
    }

    #[test]
    fn test_bets_only_while_betting() {
        let mut game = CrashGame::new(CrashConfig {
            waiting_ms: 500,
            ..CrashConfig::default()
        });
        assert_eq!(game.place_bet(10.0), Err(GameError::BettingClosed));

        let mut rng = SeededRng::from_seed(3);
        game.advance(ms(500), &mut rng);
        assert_eq!(game.place_bet(10.0), Ok(()));
        assert_eq!(game.place_bet(10.0), Err(GameError::BetAlreadyPlaced));
        assert_eq!(game.active_stake(), Some(10.0));

        game.advance(ms(2000), &mut rng);
        assert_eq!(game.phase(), CrashPhase::Flying);
        assert_eq!(game.place_bet(5.0), Err(GameError::BettingClosed));
    }

    #[test]
    fn test_cash_out_pays_current_multiplier() {
        let mut game = betting_game();
        game.place_bet(100.0).unwrap();
        assert_eq!(game.cash_out(), Err(GameError::NotFlying));

        let mut rng = ScriptedRng::new([0.5, 0.9, 0.5, 0.9]);
        game.advance(ms(2000 + 200), &mut rng);
        assert!((game.multiplier() - 1.1).abs() < 1e-9);

        let settlement = game.cash_out().unwrap();
        assert!(settlement.won());
        assert!((settlement.payout() - 110.0).abs() < 1e-9);
        assert_eq!(game.active_stake(), None);
        assert_eq!(game.cash_out(), Err(GameError::NoActiveBet));

        // The flight keeps going after a cash out
        assert_eq!(game.phase(), CrashPhase::Flying);
    }

    #[test]
    fn test_cash_out_without_bet() {
        let mut game = betting_game();
        let mut rng = SeededRng::from_seed(5);
        game.advance(ms(2000), &mut rng);
        assert_eq!(game.cash_out(), Err(GameError::NoActiveBet));
    }

    #[test]
    fn test_riding_bet_loses_on_crash() {
        let mut game = CrashGame::new(CrashConfig {
            crash_floor: 1.0,
            ..CrashConfig::default()
        });
        let mut rng = SeededRng::from_seed(9);
        game.advance(Duration::ZERO, &mut rng);
        game.place_bet(40.0).unwrap();

        let mut rng = ScriptedRng::new([0.5, 0.0]);
        let events = game.advance(ms(2100), &mut rng);
        match events.last() {
            Some(CrashEvent::Crashed {
                settlement: Some(settlement),
                multiplier,
                ..
            }) => {
                assert!(!settlement.won());
                assert_eq!(settlement.stake(), 40.0);
                assert!((multiplier - 1.05).abs() < 1e-9);
            }
            other => panic!("expected crash, got {:?}", other),
        }

        assert_eq!(game.cash_out(), Err(GameError::NotFlying));
    }

    #[test]
    fn test_multiplier_never_decreases() {
        let mut game = betting_game();
        let mut rng = SeededRng::from_seed(42);
        let mut last = 1.0;

        for _ in 0..2_000 {
            for event in game.advance(ms(100), &mut rng) {
                match event {
                    CrashEvent::MultiplierUpdated { multiplier, .. } => {
                        assert!(multiplier >= last);
                        last = multiplier;
                    }
                    CrashEvent::FlightStarted { .. } => last = 1.0,
                    _ => {}
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_settles_cash_out() {
        let config = HeyBetConfig::fast_rounds();
        let mut ledger = Ledger::new(1000.0);
        let (runner, handle) = crash_table(config.crash.clone(), &mut ledger, SeededRng::from_seed(11));
        let mut events = handle.subscribe();

        let player = async {
            let mut outcome = None;
            while let Some(event) = next_event(&mut events).await {
                match event {
                    CrashEvent::BettingOpened { round: 1, .. } => {
                        handle.place_bet(100.0).await.unwrap();
                    }
                    CrashEvent::FlightStarted { round: 1 } => {
                        outcome = Some(handle.cash_out().await);
                        break;
                    }
                    _ => {}
                }
            }
            handle.shutdown().await;
            outcome
        };

        let (game, outcome) = tokio::join!(runner.run(), player);
        let receipt = outcome.unwrap().unwrap();

        assert!(receipt.record.won);
        assert_eq!(receipt.balance_before, 1000.0);
        assert!((receipt.balance_after - (900.0 + receipt.record.payout)).abs() < 1e-9);
        assert!(game.round() >= 1);
        assert_eq!(ledger.history().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_rejects_cash_out_after_crash() {
        let mut config = HeyBetConfig::fast_rounds().crash;
        config.crash_floor = 1.0;
        config.max_crash_probability = 1.0;
        config.crash_span = 0.001;
        let mut ledger = Ledger::new(500.0);
        let (runner, handle) = crash_table(config, &mut ledger, SeededRng::from_seed(12));
        let mut events = handle.subscribe();

        let player = async {
            let mut result = None;
            while let Some(event) = next_event(&mut events).await {
                match event {
                    CrashEvent::BettingOpened { round: 1, .. } => {
                        handle.place_bet(50.0).await.unwrap();
                    }
                    CrashEvent::Crashed { round: 1, .. } => {
                        result = Some(handle.cash_out().await);
                        break;
                    }
                    _ => {}
                }
            }
            handle.shutdown().await;
            result
        };

        let (_, result) = tokio::join!(runner.run(), player);
        assert!(matches!(result, Some(Err(HeyBetError::Game(_)))));

        assert_eq!(ledger.balance(), 450.0);
        let record = ledger.latest().unwrap();
        assert!(!record.won);
        assert_eq!(record.stake, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_rejects_unaffordable_bet() {
        let mut ledger = Ledger::new(20.0);
        let (runner, handle) = crash_table(
            HeyBetConfig::fast_rounds().crash,
            &mut ledger,
            SeededRng::from_seed(13),
        );
        let mut events = handle.subscribe();

        let player = async {
            let mut result = None;
            while let Some(event) = next_event(&mut events).await {
                if let CrashEvent::BettingOpened { .. } = event {
                    result = Some(handle.place_bet(50.0).await);
                    break;
                }
            }
            handle.shutdown().await;
            result
        };

        let (_, result) = tokio::join!(runner.run(), player);
        assert!(matches!(result, Some(Err(HeyBetError::Validation(_)))));
        assert_eq!(ledger.balance(), 20.0);
    }

    #[tokio::test]
    async fn test_lagged_subscriber_keeps_reading() {
        let (tx, mut events) = broadcast::channel(1);
        for round in 1..=3 {
            tx.send(CrashEvent::RoundReset { round }).unwrap();
        }

        // Only the newest event survives the overflow
        assert!(matches!(
            next_event(&mut events).await,
            Some(CrashEvent::RoundReset { round: 3 })
        ));

        drop(tx);
        assert!(next_event(&mut events).await.is_none());
    }
}

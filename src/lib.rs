//! HeyBet - single-player casino engine
//!
//! A [`Ledger`] owns the player's balance and bet history. Round engines
//! for double (color pick), crash (aviator), mines and tigrinho slots turn
//! a stake into a [`Settlement`] that the ledger applies. The [`Casino`]
//! facade wires the engines to one ledger; accounts, payments and batch
//! simulation sit around it.

pub mod accounts;
pub mod casino;
pub mod config;
pub mod errors;
pub mod games;
pub mod ledger;
pub mod payments;
pub mod rng;
pub mod simulation;
pub mod store;

pub use accounts::{AuthService, ProfileUpdate, RegistrationForm, UserProfile};
pub use casino::{Casino, CrashAdvance, MinesReveal, SlotsReceipt};
pub use config::{ConfigLoader, HeyBetConfig};
pub use errors::{HeyBetError, HeyBetResult};
pub use games::{BetRecord, Color, GameKind, RoundDetails, Settlement, Symbol};
pub use ledger::{GameStats, Ledger, LedgerSnapshot, SettlementReceipt};
pub use payments::{PaymentDesk, PaymentKind, PaymentMethod, PaymentRequest};
pub use rng::{RandomSource, ScriptedRng, SeededRng};
pub use simulation::{SimulationReport, SimulationScenario, Simulator};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};

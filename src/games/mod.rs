pub mod types;
pub mod double;
pub mod crash;
pub mod mines;
pub mod slots;

pub use types::*;
pub use double::DoubleGame;
pub use crash::{crash_table, next_event, CrashEvent, CrashGame, CrashHandle, CrashPhase, CrashRunner};
pub use mines::{MinesRound, MinesState, MinesTable, RevealOutcome};
pub use slots::{PayLine, Pattern, SlotSpin, SlotsGame};

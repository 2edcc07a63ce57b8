//! Error types for the HeyBet engine
//!
//! Every failure is local and user-correctable: nothing here is fatal, and
//! no operation that returns an error has mutated state.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

/// Root error type for all HeyBet operations
#[derive(Debug)]
pub enum HeyBetError {
    /// Rejected input (stake, profile fields, payment data)
    Validation(ValidationError),

    /// Login or registration failures
    Auth(AuthError),

    /// Commands issued in the wrong phase of a round
    Game(GameError),

    /// Configuration loading and validation
    Configuration(ConfigurationError),

    /// Local key-value store failures
    Storage(StorageError),
}

/// Input validation errors, surfaced inline to the player
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Stake must be a positive amount, got {0}")]
    InvalidStake(f64),

    #[error("Insufficient funds: requested {requested:.2}, balance {balance:.2}")]
    InsufficientFunds { requested: f64, balance: f64 },

    #[error("Amount {amount:.2} outside allowed range {min:.2}..={max:.2}")]
    AmountOutOfRange { amount: f64, min: f64, max: f64 },

    #[error("Mines count {count} outside allowed range {min}..={max}")]
    MinesCount { count: usize, min: usize, max: usize },

    #[error("Invalid fields: {0}")]
    Fields(FieldErrors),
}

/// Account errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account already exists for {0}")]
    AccountExists(String),

    #[error("No active session")]
    NotAuthenticated,
}

/// Round state errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Bets are only accepted while betting is open")]
    BettingClosed,

    #[error("A bet is already placed for this round")]
    BetAlreadyPlaced,

    #[error("No active bet to cash out")]
    NoActiveBet,

    #[error("Cash out is only possible while the round is in flight")]
    NotFlying,

    #[error("Cell {cell} does not exist on a {size}-cell grid")]
    InvalidCell { cell: usize, size: usize },

    #[error("Cell {0} is already revealed")]
    CellAlreadyRevealed(usize),

    #[error("Reveal at least one safe cell before cashing out")]
    NothingToCashOut,

    #[error("No round in progress")]
    RoundNotActive,

    #[error("A round is already in progress")]
    RoundInProgress,

    #[error("The finished round must be reset before starting a new one")]
    RoundNotReset,

    #[error("Invalid mine layout: {0}")]
    InvalidLayout(String),

    #[error("The crash table is closed")]
    TableClosed,
}

/// Configuration and validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue { field: String, value: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),
}

/// Local store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StorageError {
    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Corrupted data under key {key}: {reason}")]
    CorruptedData { key: String, reason: String },
}

/// Per-field validation messages, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when nothing was recorded
    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Fields(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", field, message)?;
            first = false;
        }
        Ok(())
    }
}

impl fmt::Display for HeyBetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeyBetError::Validation(e) => write!(f, "Validation error: {}", e),
            HeyBetError::Auth(e) => write!(f, "Auth error: {}", e),
            HeyBetError::Game(e) => write!(f, "Game error: {}", e),
            HeyBetError::Configuration(e) => write!(f, "Configuration error: {}", e),
            HeyBetError::Storage(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl StdError for HeyBetError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            HeyBetError::Validation(e) => Some(e),
            HeyBetError::Auth(e) => Some(e),
            HeyBetError::Game(e) => Some(e),
            HeyBetError::Configuration(e) => Some(e),
            HeyBetError::Storage(e) => Some(e),
        }
    }
}

impl From<ValidationError> for HeyBetError {
    fn from(e: ValidationError) -> Self {
        HeyBetError::Validation(e)
    }
}

impl From<AuthError> for HeyBetError {
    fn from(e: AuthError) -> Self {
        HeyBetError::Auth(e)
    }
}

impl From<GameError> for HeyBetError {
    fn from(e: GameError) -> Self {
        HeyBetError::Game(e)
    }
}

impl From<ConfigurationError> for HeyBetError {
    fn from(e: ConfigurationError) -> Self {
        HeyBetError::Configuration(e)
    }
}

impl From<StorageError> for HeyBetError {
    fn from(e: StorageError) -> Self {
        HeyBetError::Storage(e)
    }
}

// External error conversions
impl From<std::io::Error> for HeyBetError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                HeyBetError::Storage(StorageError::WriteFailed(e.to_string()))
            }
            _ => HeyBetError::Storage(StorageError::ReadFailed(e.to_string())),
        }
    }
}

impl From<serde_json::Error> for HeyBetError {
    fn from(e: serde_json::Error) -> Self {
        HeyBetError::Storage(StorageError::CorruptedData {
            key: "json".to_string(),
            reason: e.to_string(),
        })
    }
}

impl From<toml::de::Error> for HeyBetError {
    fn from(e: toml::de::Error) -> Self {
        HeyBetError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

/// Convenience type alias for Results
pub type HeyBetResult<T> = Result<T, HeyBetError>;

impl HeyBetError {
    /// Field-level messages when this is a form validation failure
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            HeyBetError::Validation(ValidationError::Fields(fields)) => Some(fields),
            _ => None,
        }
    }
}

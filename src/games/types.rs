use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Double,
    Crash,
    Mines,
    Slots,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Double => write!(f, "double"),
            GameKind::Crash => write!(f, "crash"),
            GameKind::Mines => write!(f, "mines"),
            GameKind::Slots => write!(f, "slots"),
        }
    }
}

/// Double wheel color
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
        }
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(Color::Red),
            "black" => Ok(Color::Black),
            other => Err(format!("unknown color '{}', expected red or black", other)),
        }
    }
}

/// Slot reel symbol, ordered from most to least valuable
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Tiger,
    Crown,
    Diamond,
    Clover,
    Star,
    Fire,
    MoneyBag,
    SlotMachine,
}

impl Symbol {
    pub const ALL: [Symbol; 8] = [
        Symbol::Tiger,
        Symbol::Crown,
        Symbol::Diamond,
        Symbol::Clover,
        Symbol::Star,
        Symbol::Fire,
        Symbol::MoneyBag,
        Symbol::SlotMachine,
    ];

    pub fn glyph(&self) -> &'static str {
        match self {
            Symbol::Tiger => "🐅",
            Symbol::Crown => "👑",
            Symbol::Diamond => "💎",
            Symbol::Clover => "🍀",
            Symbol::Star => "⭐",
            Symbol::Fire => "🔥",
            Symbol::MoneyBag => "💰",
            Symbol::SlotMachine => "🎰",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.glyph())
    }
}

/// Game-specific summary kept on the bet record (discriminated union)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum RoundDetails {
    Double {
        choice: Color,
        result: Color,
    },
    Crash {
        #[serde(skip_serializing_if = "Option::is_none")]
        cashed_out_at: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        crashed_at: Option<f64>,
    },
    Mines {
        mines: usize,
        safe_revealed: usize,
        multiplier: f64,
    },
    Slots {
        reels: [Symbol; 3],
        multiplier: f64,
    },
}

impl RoundDetails {
    pub fn kind(&self) -> GameKind {
        match self {
            RoundDetails::Double { .. } => GameKind::Double,
            RoundDetails::Crash { .. } => GameKind::Crash,
            RoundDetails::Mines { .. } => GameKind::Mines,
            RoundDetails::Slots { .. } => GameKind::Slots,
        }
    }
}

/// Immutable record of one resolved round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BetRecord {
    pub id: String,
    pub stake: f64,
    pub won: bool,
    pub payout: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub details: RoundDetails,
}

impl BetRecord {
    pub fn game(&self) -> GameKind {
        self.details.kind()
    }

    /// Balance change this round caused
    pub fn net(&self) -> f64 {
        self.payout - self.stake
    }
}

/// Stake debit plus payout credit, produced by a round engine for the ledger
///
/// Only constructible through [`Settlement::win`] and [`Settlement::loss`],
/// so a lost round always carries a zero payout.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    record: BetRecord,
}

impl Settlement {
    pub fn win(stake: f64, payout: f64, details: RoundDetails) -> Self {
        Self::build(stake, payout.max(0.0), true, details)
    }

    pub fn loss(stake: f64, details: RoundDetails) -> Self {
        Self::build(stake, 0.0, false, details)
    }

    fn build(stake: f64, payout: f64, won: bool, details: RoundDetails) -> Self {
        Self {
            record: BetRecord {
                id: Uuid::new_v4().to_string(),
                stake,
                won,
                payout,
                timestamp: Utc::now(),
                details,
            },
        }
    }

    pub fn stake(&self) -> f64 {
        self.record.stake
    }

    pub fn payout(&self) -> f64 {
        self.record.payout
    }

    pub fn won(&self) -> bool {
        self.record.won
    }

    pub fn game(&self) -> GameKind {
        self.record.game()
    }

    pub fn record(&self) -> &BetRecord {
        &self.record
    }

    pub fn into_record(self) -> BetRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loss_always_pays_zero() {
        let settlement = Settlement::loss(
            25.0,
            RoundDetails::Double {
                choice: Color::Red,
                result: Color::Black,
            },
        );

        assert!(!settlement.won());
        assert_eq!(settlement.payout(), 0.0);
        assert_eq!(settlement.record().net(), -25.0);
        assert_eq!(settlement.game(), GameKind::Double);
    }

    #[test]
    fn test_settlements_get_unique_ids() {
        let details = RoundDetails::Crash {
            cashed_out_at: Some(1.5),
            crashed_at: None,
        };
        let a = Settlement::win(10.0, 15.0, details.clone());
        let b = Settlement::win(10.0, 15.0, details);
        assert_ne!(a.record().id, b.record().id);
    }

    #[test]
    fn test_record_json_shape() {
        let record = Settlement::win(
            10.0,
            50.0,
            RoundDetails::Slots {
                reels: [Symbol::Tiger, Symbol::Tiger, Symbol::Star],
                multiplier: 5.0,
            },
        )
        .into_record();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["game"], "slots");
        assert_eq!(json["reels"][0], "tiger");
        assert_eq!(json["won"], true);

        let back: BetRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("RED".parse::<Color>().unwrap(), Color::Red);
        assert!("green".parse::<Color>().is_err());
    }
}

use crate::config::DoubleConfig;
use crate::games::types::{Color, RoundDetails, Settlement};
use crate::rng::RandomSource;
use tracing::debug;

/// Red/black color pick, resolved in a single shot
pub struct DoubleGame {
    config: DoubleConfig,
}

impl DoubleGame {
    pub fn new(config: DoubleConfig) -> Self {
        Self { config }
    }

    /// Draw the wheel result, red and black with equal probability
    pub fn spin(rng: &mut impl RandomSource) -> Color {
        if rng.below(2) == 0 {
            Color::Red
        } else {
            Color::Black
        }
    }

    /// Settle a stake on `choice` against a known `outcome`
    pub fn resolve(&self, stake: f64, choice: Color, outcome: Color) -> Settlement {
        let details = RoundDetails::Double {
            choice,
            result: outcome,
        };

        if choice == outcome {
            Settlement::win(stake, stake * self.config.payout_multiplier, details)
        } else {
            Settlement::loss(stake, details)
        }
    }

    pub fn play(&self, stake: f64, choice: Color, rng: &mut impl RandomSource) -> Settlement {
        let outcome = Self::spin(rng);
        debug!(%choice, %outcome, stake, "Double round resolved");
        self.resolve(stake, choice, outcome)
    }
}

impl Default for DoubleGame {
    fn default() -> Self {
        Self::new(DoubleConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRng, SeededRng};

    #[test]
    fn test_matching_color_pays_double() {
        let game = DoubleGame::default();
        let settlement = game.resolve(100.0, Color::Red, Color::Red);

        assert!(settlement.won());
        assert_eq!(settlement.payout(), 200.0);
    }

    #[test]
    fn test_other_color_loses_stake() {
        let game = DoubleGame::default();
        let settlement = game.resolve(100.0, Color::Black, Color::Red);

        assert!(!settlement.won());
        assert_eq!(settlement.payout(), 0.0);
    }

    #[test]
    fn test_scripted_spin() {
        let mut rng = ScriptedRng::new([0.1, 0.9]);
        assert_eq!(DoubleGame::spin(&mut rng), Color::Red);
        assert_eq!(DoubleGame::spin(&mut rng), Color::Black);
    }

    #[test]
    fn test_colors_are_roughly_uniform() {
        let mut rng = SeededRng::from_seed(2024);
        let trials = 20_000;
        let reds = (0..trials)
            .filter(|_| DoubleGame::spin(&mut rng) == Color::Red)
            .count();

        // ~7 standard deviations of slack
        let share = reds as f64 / trials as f64;
        assert!((share - 0.5).abs() < 0.025, "red share {}", share);
    }

    #[test]
    fn test_configured_multiplier() {
        let game = DoubleGame::new(DoubleConfig {
            payout_multiplier: 1.9,
        });
        let settlement = game.resolve(10.0, Color::Black, Color::Black);
        assert!((settlement.payout() - 19.0).abs() < 1e-9);
    }
}

use crate::config::SlotsConfig;
use crate::games::types::{RoundDetails, Settlement, Symbol};
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Three of a kind, checked first
pub const TRIPLE_PAYOUTS: [(Symbol, f64); 8] = [
    (Symbol::Tiger, 2500.0),
    (Symbol::Crown, 1000.0),
    (Symbol::Diamond, 500.0),
    (Symbol::Clover, 250.0),
    (Symbol::Star, 100.0),
    (Symbol::Fire, 50.0),
    (Symbol::MoneyBag, 25.0),
    (Symbol::SlotMachine, 10.0),
];

/// Two of a kind on any reels, checked in this order
pub const PAIR_PAYOUTS: [(Symbol, f64); 3] = [
    (Symbol::Tiger, 5.0),
    (Symbol::Crown, 3.0),
    (Symbol::Diamond, 2.0),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "symbol", rename_all = "lowercase")]
pub enum Pattern {
    Triple(Symbol),
    Pair(Symbol),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PayLine {
    pub pattern: Pattern,
    pub multiplier: f64,
}

/// Best paying pattern on the reels, if any
pub fn evaluate(reels: &[Symbol; 3]) -> Option<PayLine> {
    if reels[0] == reels[1] && reels[1] == reels[2] {
        return TRIPLE_PAYOUTS
            .iter()
            .find(|(symbol, _)| *symbol == reels[0])
            .map(|&(symbol, multiplier)| PayLine {
                pattern: Pattern::Triple(symbol),
                multiplier,
            });
    }

    PAIR_PAYOUTS
        .iter()
        .find(|(symbol, _)| reels.iter().filter(|r| *r == symbol).count() >= 2)
        .map(|&(symbol, multiplier)| PayLine {
            pattern: Pattern::Pair(symbol),
            multiplier,
        })
}

/// One resolved spin
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSpin {
    pub reels: [Symbol; 3],
    pub payline: Option<PayLine>,
    pub settlement: Settlement,
}

/// Tigrinho slot machine
pub struct SlotsGame {
    config: SlotsConfig,
}

impl SlotsGame {
    pub fn new(config: SlotsConfig) -> Self {
        Self { config }
    }

    /// Draw reels through the configured outcome bands
    pub fn generate(&self, rng: &mut impl RandomSource) -> [Symbol; 3] {
        let jackpot = self.config.jackpot_probability;
        let triple = jackpot + self.config.triple_probability;
        let pair = triple + self.config.pair_probability;

        let roll = rng.unit();
        if roll < jackpot {
            [Symbol::Tiger; 3]
        } else if roll < triple {
            let symbol = Symbol::ALL[1 + rng.below(Symbol::ALL.len() - 1)];
            [symbol; 3]
        } else if roll < pair {
            let index = rng.below(PAIR_PAYOUTS.len());
            let symbol = PAIR_PAYOUTS[index].0;
            // Any symbol except the paired one, so the band never upgrades to a triple
            let mut other = rng.below(Symbol::ALL.len() - 1);
            if other >= index {
                other += 1;
            }
            [symbol, symbol, Symbol::ALL[other]]
        } else {
            loop {
                let reels = [
                    Symbol::ALL[rng.below(Symbol::ALL.len())],
                    Symbol::ALL[rng.below(Symbol::ALL.len())],
                    Symbol::ALL[rng.below(Symbol::ALL.len())],
                ];
                if evaluate(&reels).is_none() {
                    break reels;
                }
            }
        }
    }

    /// Settle a stake against already drawn reels
    pub fn resolve(&self, stake: f64, reels: [Symbol; 3]) -> SlotSpin {
        let payline = evaluate(&reels);
        let settlement = match payline {
            Some(line) => Settlement::win(
                stake,
                stake * line.multiplier,
                RoundDetails::Slots {
                    reels,
                    multiplier: line.multiplier,
                },
            ),
            None => Settlement::loss(stake, RoundDetails::Slots { reels, multiplier: 0.0 }),
        };

        SlotSpin {
            reels,
            payline,
            settlement,
        }
    }

    pub fn spin(&self, stake: f64, rng: &mut impl RandomSource) -> SlotSpin {
        let reels = self.generate(rng);
        debug!(reels = %format!("{}{}{}", reels[0], reels[1], reels[2]), stake, "Slot spin");
        self.resolve(stake, reels)
    }
}

impl Default for SlotsGame {
    fn default() -> Self {
        Self::new(SlotsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{ScriptedRng, SeededRng};
    use crate::games::types::Symbol::*;

    #[test]
    fn test_triples_take_precedence() {
        let line = evaluate(&[Tiger, Tiger, Tiger]).unwrap();
        assert_eq!(line.pattern, Pattern::Triple(Tiger));
        assert_eq!(line.multiplier, 2500.0);

        let line = evaluate(&[SlotMachine, SlotMachine, SlotMachine]).unwrap();
        assert_eq!(line.multiplier, 10.0);
    }

    #[test]
    fn test_pairs_count_any_reels() {
        assert_eq!(evaluate(&[Crown, Star, Crown]).unwrap().pattern, Pattern::Pair(Crown));
        assert_eq!(evaluate(&[Fire, Diamond, Diamond]).unwrap().multiplier, 2.0);
        assert_eq!(evaluate(&[Tiger, Crown, Tiger]).unwrap().multiplier, 5.0);
    }

    #[test]
    fn test_low_symbol_pairs_pay_nothing() {
        assert!(evaluate(&[Star, Star, Fire]).is_none());
        assert!(evaluate(&[Tiger, Crown, Diamond]).is_none());
    }

    #[test]
    fn test_jackpot_band() {
        let game = SlotsGame::default();
        let mut rng = ScriptedRng::new([0.0005]);
        let spin = game.spin(2.0, &mut rng);

        assert_eq!(spin.reels, [Tiger, Tiger, Tiger]);
        assert_eq!(spin.settlement.payout(), 5000.0);
    }

    #[test]
    fn test_triple_band_skips_tiger() {
        let game = SlotsGame::default();
        let mut rng = ScriptedRng::new([0.003, 0.0]);
        assert_eq!(game.generate(&mut rng), [Crown, Crown, Crown]);
    }

    #[test]
    fn test_pair_band_never_makes_triples() {
        let game = SlotsGame::default();
        let mut rng = ScriptedRng::new([0.02, 0.4, 0.0]);
        let reels = game.generate(&mut rng);
        assert_eq!(reels, [Crown, Crown, Tiger]);
        assert_eq!(evaluate(&reels).unwrap().pattern, Pattern::Pair(Crown));

        let mut rng = ScriptedRng::new([0.02, 0.0, 0.0]);
        assert_eq!(game.generate(&mut rng), [Tiger, Tiger, Crown]);
    }

    #[test]
    fn test_losing_spin_settles_zero() {
        let game = SlotsGame::default();
        let spin = game.resolve(10.0, [Star, Fire, Clover]);
        assert!(spin.payline.is_none());
        assert!(!spin.settlement.won());
        assert_eq!(spin.settlement.payout(), 0.0);
    }

    #[test]
    fn test_generated_outcomes_pay_at_most_once() {
        let game = SlotsGame::default();
        let mut rng = SeededRng::from_seed(77);
        let spins = 20_000;
        let mut wins = 0;

        for _ in 0..spins {
            let spin = game.spin(1.0, &mut rng);
            match spin.payline {
                Some(line) => {
                    wins += 1;
                    assert_eq!(spin.settlement.payout(), line.multiplier);
                }
                None => assert_eq!(spin.settlement.payout(), 0.0),
            }
        }

        let rate = wins as f64 / spins as f64;
        assert!((0.04..0.06).contains(&rate), "win rate {}", rate);
    }
}

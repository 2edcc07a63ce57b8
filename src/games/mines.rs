//! Mines: reveal diamonds on a 5x5 grid without hitting a mine
//!
//! A [`MinesRound`] is one grid; [`MinesTable`] is the seat that enforces
//! the round lifecycle (start, play, terminal, explicit reset).

use crate::config::MinesConfig;
use crate::errors::{GameError, HeyBetResult, ValidationError};
use crate::games::types::{RoundDetails, Settlement};
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const GRID_SIZE: usize = 25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cell {
    pub id: usize,
    pub revealed: bool,
    pub is_mine: bool,
}

impl Cell {
    pub fn is_diamond(&self) -> bool {
        !self.is_mine
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MinesState {
    Active,
    MineHit,
    CashedOut,
}

impl MinesState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MinesState::Active)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RevealOutcome {
    Diamond { multiplier: f64, safe_revealed: usize },
    Mine(Settlement),
}

/// Multiplier after `revealed` diamonds with `mines` mines on the grid
///
/// The fair multiplier is the inverse probability of surviving that many
/// picks, `prod (GRID - i) / (safe - i)`, scaled by the house edge and never
/// below 1.
pub fn multiplier_for(revealed: usize, mines: usize, house_edge_factor: f64) -> f64 {
    if revealed == 0 {
        return 1.0;
    }

    let safe = GRID_SIZE - mines;
    let fair = (0..revealed.min(safe)).fold(1.0, |acc, i| {
        acc * (GRID_SIZE - i) as f64 / (safe - i) as f64
    });

    (fair * house_edge_factor).max(1.0)
}

#[derive(Debug, Clone)]
pub struct MinesRound {
    stake: f64,
    mines_count: usize,
    house_edge_factor: f64,
    cells: Vec<Cell>,
    safe_revealed: usize,
    multiplier: f64,
    state: MinesState,
}

impl MinesRound {
    /// Place `mines_count` mines uniformly at random without replacement
    pub fn new(
        config: &MinesConfig,
        stake: f64,
        mines_count: usize,
        rng: &mut impl RandomSource,
    ) -> Result<Self, ValidationError> {
        check_mines_count(config, mines_count)?;

        let mut positions: Vec<usize> = (0..GRID_SIZE).collect();
        for i in 0..mines_count {
            let j = i + rng.below(GRID_SIZE - i);
            positions.swap(i, j);
        }
        positions.truncate(mines_count);

        Ok(Self::from_positions(config, stake, &positions))
    }

    /// Build a round with the mines at known cells
    pub fn with_layout(config: &MinesConfig, stake: f64, mine_cells: &[usize]) -> HeyBetResult<Self> {
        check_mines_count(config, mine_cells.len())?;

        let mut seen = [false; GRID_SIZE];
        for &cell in mine_cells {
            if cell >= GRID_SIZE {
                return Err(GameError::InvalidCell { cell, size: GRID_SIZE }.into());
            }
            if seen[cell] {
                return Err(GameError::InvalidLayout(format!("cell {} listed twice", cell)).into());
            }
            seen[cell] = true;
        }

        Ok(Self::from_positions(config, stake, mine_cells))
    }

    fn from_positions(config: &MinesConfig, stake: f64, mine_cells: &[usize]) -> Self {
        let mut cells: Vec<Cell> = (0..GRID_SIZE)
            .map(|id| Cell {
                id,
                revealed: false,
                is_mine: false,
            })
            .collect();
        for &pos in mine_cells {
            cells[pos].is_mine = true;
        }

        Self {
            stake,
            mines_count: mine_cells.len(),
            house_edge_factor: config.house_edge_factor,
            cells,
            safe_revealed: 0,
            multiplier: 1.0,
            state: MinesState::Active,
        }
    }

    pub fn reveal(&mut self, cell: usize) -> HeyBetResult<RevealOutcome> {
        if self.state.is_terminal() {
            return Err(GameError::RoundNotActive.into());
        }
        let target = self
            .cells
            .get_mut(cell)
            .ok_or(GameError::InvalidCell { cell, size: GRID_SIZE })?;
        if target.revealed {
            return Err(GameError::CellAlreadyRevealed(cell).into());
        }
        target.revealed = true;

        if target.is_mine {
            self.state = MinesState::MineHit;
            for c in self.cells.iter_mut().filter(|c| c.is_mine) {
                c.revealed = true;
            }
            debug!(cell, safe_revealed = self.safe_revealed, "Mine hit");
            return Ok(RevealOutcome::Mine(Settlement::loss(self.stake, self.details())));
        }

        self.safe_revealed += 1;
        self.multiplier = multiplier_for(self.safe_revealed, self.mines_count, self.house_edge_factor);
        debug!(cell, safe_revealed = self.safe_revealed, multiplier = self.multiplier, "Diamond found");

        Ok(RevealOutcome::Diamond {
            multiplier: self.multiplier,
            safe_revealed: self.safe_revealed,
        })
    }

    /// Lock in `stake * multiplier`; needs at least one diamond
    pub fn cash_out(&mut self) -> HeyBetResult<Settlement> {
        if self.state.is_terminal() {
            return Err(GameError::RoundNotActive.into());
        }
        if self.safe_revealed == 0 {
            return Err(GameError::NothingToCashOut.into());
        }

        self.state = MinesState::CashedOut;
        Ok(Settlement::win(self.stake, self.stake * self.multiplier, self.details()))
    }

    fn details(&self) -> RoundDetails {
        RoundDetails::Mines {
            mines: self.mines_count,
            safe_revealed: self.safe_revealed,
            multiplier: self.multiplier,
        }
    }

    pub fn state(&self) -> MinesState {
        self.state
    }

    pub fn stake(&self) -> f64 {
        self.stake
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Multiplier the next diamond would bring
    pub fn next_multiplier(&self) -> f64 {
        multiplier_for(self.safe_revealed + 1, self.mines_count, self.house_edge_factor)
    }

    pub fn safe_revealed(&self) -> usize {
        self.safe_revealed
    }

    pub fn mines_count(&self) -> usize {
        self.mines_count
    }

    pub fn diamonds_count(&self) -> usize {
        GRID_SIZE - self.mines_count
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

fn check_mines_count(config: &MinesConfig, count: usize) -> Result<(), ValidationError> {
    if count < config.min_mines || count > config.max_mines {
        return Err(ValidationError::MinesCount {
            count,
            min: config.min_mines,
            max: config.max_mines,
        });
    }
    Ok(())
}

/// One player's seat at the mines grid
#[derive(Debug, Clone)]
pub struct MinesTable {
    config: MinesConfig,
    round: Option<MinesRound>,
}

impl MinesTable {
    pub fn new(config: MinesConfig) -> Self {
        Self { config, round: None }
    }

    pub fn config(&self) -> &MinesConfig {
        &self.config
    }

    pub fn round(&self) -> Option<&MinesRound> {
        self.round.as_ref()
    }

    pub fn start(&mut self, stake: f64, mines_count: usize, rng: &mut impl RandomSource) -> HeyBetResult<&MinesRound> {
        self.ensure_idle()?;
        let round = MinesRound::new(&self.config, stake, mines_count, rng)?;
        Ok(&*self.round.insert(round))
    }

    pub fn start_with_layout(&mut self, stake: f64, mine_cells: &[usize]) -> HeyBetResult<&MinesRound> {
        self.ensure_idle()?;
        let round = MinesRound::with_layout(&self.config, stake, mine_cells)?;
        Ok(&*self.round.insert(round))
    }

    pub fn reveal(&mut self, cell: usize) -> HeyBetResult<RevealOutcome> {
        self.round.as_mut().ok_or(GameError::RoundNotActive)?.reveal(cell)
    }

    pub fn cash_out(&mut self) -> HeyBetResult<Settlement> {
        self.round.as_mut().ok_or(GameError::RoundNotActive)?.cash_out()
    }

    /// Clear a finished round so a new one can start
    pub fn reset(&mut self) -> HeyBetResult<()> {
        match &self.round {
            Some(round) if !round.state().is_terminal() => Err(GameError::RoundInProgress.into()),
            _ => {
                self.round = None;
                Ok(())
            }
        }
    }

    fn ensure_idle(&self) -> Result<(), GameError> {
        match &self.round {
            None => Ok(()),
            Some(round) if round.state().is_terminal() => Err(GameError::RoundNotReset),
            Some(_) => Err(GameError::RoundInProgress),
        }
    }
}

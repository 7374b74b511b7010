//! Per-turn income

use serde::{Deserialize, Serialize};

use crate::board::{Board, Terrain};
use crate::game::Faction;

/// Income every faction receives at the start of its turn
pub const BASE_INCOME: i32 = 6;

/// Extra income per owned mine
pub const MINE_INCOME: i32 = 4;

/// Tunable income rates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeRates {
    pub base: i32,
    pub per_mine: i32,
}

impl Default for IncomeRates {
    fn default() -> Self {
        Self {
            base: BASE_INCOME,
            per_mine: MINE_INCOME,
        }
    }
}

/// Income `faction` earns this turn from the board it controls
pub fn turn_income(board: &Board, faction: Faction, rates: IncomeRates) -> i32 {
    let mines = board.count(Terrain::Mine, Some(faction)) as i32;
    rates.base.saturating_add(rates.per_mine.saturating_mul(mines))
}

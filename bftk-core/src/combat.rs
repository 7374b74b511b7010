//! Dice-based combat resolution
//!
//! Each side adds one d6 to its stat: attack for the attacker, defense for the
//! defender. The attacker must score strictly higher; ties go to the defender.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::units::Unit;

/// Number of faces on a combat die
pub const DIE_SIDES: u8 = 6;

/// Source of d6 rolls
pub trait Dice {
    /// Roll one die, 1..=DIE_SIDES
    fn roll(&mut self) -> u8;
}

impl<R: Rng> Dice for R {
    fn roll(&mut self) -> u8 {
        self.gen_range(1..=DIE_SIDES)
    }
}

/// Result of one attack
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatOutcome {
    pub attacker_wins: bool,
    pub attack_roll: u8,
    pub defense_roll: u8,
}

/// Roll both dice and resolve the fight. Does not touch any game state.
pub fn resolve<D: Dice + ?Sized>(attacker: &Unit, defender: &Unit, dice: &mut D) -> CombatOutcome {
    let attack_roll = dice.roll();
    let defense_roll = dice.roll();
    resolve_rolls(attacker.attack(), defender.defense(), attack_roll, defense_roll)
}

/// Resolve with known rolls
pub fn resolve_rolls(attack: i32, defense: i32, attack_roll: u8, defense_roll: u8) -> CombatOutcome {
    let attack_total = attack + i32::from(attack_roll);
    let defense_total = defense + i32::from(defense_roll);
    CombatOutcome {
        attacker_wins: attack_total > defense_total,
        attack_roll,
        defense_roll,
    }
}

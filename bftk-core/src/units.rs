//! Unit archetypes, stat presets and the unit arena

use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::board::Position;
use crate::game::Faction;

/// Unit archetype
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    Melee,   // Soldier
    Mounted, // Knight: stops on entering forest
    Ranged,  // Archer: range 1 against forest targets
}

/// Fixed stats of an archetype
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitStats {
    pub tag: &'static str,
    pub attack: i32,
    pub defense: i32,
    pub move_range: u32,
    pub attack_range: u32,
    pub price: i32,
}

impl UnitStats {
    const fn new(tag: &'static str, attack: i32, defense: i32, move_range: u32, attack_range: u32, price: i32) -> Self {
        Self {
            tag,
            attack,
            defense,
            move_range,
            attack_range,
            price,
        }
    }
}

/// Stat presets, indexed by `Archetype as usize`
pub static ARCHETYPE_STATS: [UnitStats; 3] = [
    UnitStats::new("Soldier", 9, 9, 1, 1, 20),
    UnitStats::new("Knight", 12, 12, 2, 2, 55),
    UnitStats::new("Archer", 10, 7, 1, 2, 30),
];

impl Archetype {
    pub const ALL: [Archetype; 3] = [Archetype::Melee, Archetype::Mounted, Archetype::Ranged];

    pub fn stats(self) -> &'static UnitStats {
        &ARCHETYPE_STATS[self as usize]
    }

    /// Snapshot tag ("Soldier", "Knight", "Archer")
    pub fn tag(self) -> &'static str {
        self.stats().tag
    }

    /// Unknown tags fall back to Melee
    pub fn from_tag(tag: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|a| a.tag() == tag)
            .unwrap_or(Archetype::Melee)
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error parsing an archetype name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit type {0:?} (expected soldier, knight or archer)")]
pub struct ParseArchetypeError(String);

impl FromStr for Archetype {
    type Err = ParseArchetypeError;

    /// Accepts tags and archetype names, case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soldier" | "melee" => Ok(Archetype::Melee),
            "knight" | "mounted" => Ok(Archetype::Mounted),
            "archer" | "ranged" => Ok(Archetype::Ranged),
            _ => Err(ParseArchetypeError(s.to_string())),
        }
    }
}

/// Stable unit identifier within one match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// A unit on the board
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unit {
    pub id: UnitId,
    pub archetype: Archetype,
    pub faction: Faction,
    pub pos: Position,
    pub has_acted: bool,
}

impl Unit {
    pub fn attack(&self) -> i32 {
        self.archetype.stats().attack
    }

    pub fn defense(&self) -> i32 {
        self.archetype.stats().defense
    }

    pub fn move_range(&self) -> u32 {
        self.archetype.stats().move_range
    }

    pub fn attack_range(&self) -> u32 {
        self.archetype.stats().attack_range
    }

    pub fn price(&self) -> i32 {
        self.archetype.stats().price
    }
}

/// Arena of live units, keyed by id. Ids are never reused within a roster.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    units: FxHashMap<UnitId, Unit>,
    /// Live ids in creation order
    order: Vec<UnitId>,
    next_id: u32,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a unit and return its id
    pub fn spawn(&mut self, archetype: Archetype, faction: Faction, pos: Position) -> UnitId {
        self.next_id += 1;
        let id = UnitId(self.next_id);
        self.units.insert(
            id,
            Unit {
                id,
                archetype,
                faction,
                pos,
                has_acted: false,
            },
        );
        self.order.push(id);
        id
    }

    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        let unit = self.units.remove(&id)?;
        self.order.retain(|&other| other != id);
        Some(unit)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units in id (creation) order
    pub fn iter(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.order.iter().filter_map(move |id| self.units.get(id))
    }

    pub fn count_for(&self, faction: Faction) -> usize {
        self.units.values().filter(|u| u.faction == faction).count()
    }

    /// Clear the acted flag on every unit of `faction`
    pub fn ready(&mut self, faction: Faction) {
        for unit in self.units.values_mut().filter(|u| u.faction == faction) {
            unit.has_acted = false;
        }
    }
}

//! BFTK Core - Rule engine for a two-faction grid strategy game
//!
//! This crate provides the authoritative match logic:
//! - Board geometry (square grid, orthogonal movement)
//! - Unit archetypes and their stat presets
//! - Dice combat, territory capture and per-turn income
//! - Seeded terrain layout
//! - Match state machine with turn and victory handling
//! - JSON snapshots for save/load

pub mod board;
pub mod units;
pub mod combat;
pub mod economy;
pub mod terrain;
pub mod config;
pub mod error;
pub mod game;
pub mod snapshot;

// Re-exports for convenient access
pub use board::{Board, Position, Terrain, Tile, DIRECTIONS, MAX_DIMENSION};
pub use units::{Archetype, Unit, UnitId, UnitStats, ARCHETYPE_STATS};
pub use combat::{CombatOutcome, Dice};
pub use economy::IncomeRates;
pub use config::{MatchConfig, TerrainMix};
pub use error::{ActionError, SetupError, SnapshotError};
pub use game::{Castles, Faction, GameState, Phase, Player};
pub use snapshot::SaveRoot;

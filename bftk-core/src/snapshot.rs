//! Save-file mapping for a match
//!
//! The snapshot is a flat JSON document with a string tag for every enum.
//! Unknown tags fall back to defaults; entries outside the map are dropped
//! with a warning instead of failing the load.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::board::{Board, Position, Terrain};
use crate::config::MatchConfig;
use crate::error::SnapshotError;
use crate::game::{Castles, Faction, GameState, Phase, Player};
use crate::units::{Archetype, Roster};

/// Format version written into every snapshot
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Owner tag for tiles without an owner
const NO_OWNER: &str = "NONE";

// ============================================================================
// SNAPSHOT TYPES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveRoot {
    pub version: String,
    pub metadata: Metadata,
    pub game: GameDto,
}

impl Default for SaveRoot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            metadata: Metadata::default(),
            game: GameDto::default(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub created_at_utc: String,
    pub seed: u64,
    /// Combat dice position, absent in older saves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_word_pos: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDto {
    pub state: String,
    pub turn: i64,
    #[serde(rename = "currentPlayer")]
    pub current_player: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    pub map: Option<MapDto>,
    pub players: Vec<PlayerDto>,
    pub units: Vec<UnitDto>,
    pub castles: Option<CastlesDto>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapDto {
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<TileDto>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileDto {
    pub x: i32,
    pub y: i32,
    #[serde(rename = "type")]
    pub terrain: String,
    pub owner: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerDto {
    pub id: String,
    pub name: String,
    pub resources: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitDto {
    pub id: String,
    pub owner: String,
    #[serde(rename = "type")]
    pub archetype: String,
    pub pos: Option<PosDto>,
    pub hp: i32,
    /// Written only for units that already acted this turn
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub acted: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PosDto {
    pub x: i32,
    pub y: i32,
}

impl From<Position> for PosDto {
    fn from(pos: Position) -> Self {
        Self { x: pos.x, y: pos.y }
    }
}

impl From<PosDto> for Position {
    fn from(dto: PosDto) -> Self {
        Position::new(dto.x, dto.y)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CastlesDto {
    #[serde(rename = "A")]
    pub a: Option<PosDto>,
    #[serde(rename = "B")]
    pub b: Option<PosDto>,
}

fn owner_tag(owner: Option<Faction>) -> String {
    owner.map_or(NO_OWNER, Faction::tag).to_string()
}

fn phase_tag(phase: Phase) -> &'static str {
    match phase {
        Phase::Running => "Running",
        Phase::GameOver => "GameOver",
    }
}

// ============================================================================
// SAVE
// ============================================================================

impl GameState {
    /// Capture the full match as a snapshot
    pub fn to_snapshot(&self, created_at: DateTime<Utc>) -> SaveRoot {
        let tiles = self
            .board
            .tiles()
            .map(|(pos, tile)| TileDto {
                x: pos.x,
                y: pos.y,
                terrain: tile.terrain.tag().to_string(),
                owner: owner_tag(tile.owner),
            })
            .collect();

        let players = [Faction::A, Faction::B]
            .into_iter()
            .map(|faction| {
                let player = self.player(faction);
                PlayerDto {
                    id: faction.tag().to_string(),
                    name: player.name.clone(),
                    resources: player.resources,
                }
            })
            .collect();

        let units = self
            .roster
            .iter()
            .map(|unit| UnitDto {
                id: unit.id.to_string(),
                owner: unit.faction.tag().to_string(),
                archetype: unit.archetype.tag().to_string(),
                pos: Some(unit.pos.into()),
                hp: 1,
                acted: unit.has_acted,
            })
            .collect();

        SaveRoot {
            version: SNAPSHOT_VERSION.to_string(),
            metadata: Metadata {
                created_at_utc: created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                seed: self.seed,
                rng_word_pos: u64::try_from(self.rng.get_word_pos()).ok(),
            },
            game: GameDto {
                state: phase_tag(self.phase).to_string(),
                turn: i64::from(self.turn),
                current_player: self.current.tag().to_string(),
                winner: self.winner.map(|f| f.tag().to_string()),
                map: Some(MapDto {
                    width: self.board.width(),
                    height: self.board.height(),
                    tiles,
                }),
                players,
                units,
                castles: Some(CastlesDto {
                    a: Some(self.castles.a.into()),
                    b: Some(self.castles.b.into()),
                }),
            },
        }
    }

    /// Write the match to a JSON save file
    pub fn save_to_path(&self, path: &Path) -> anyhow::Result<()> {
        let snapshot = self.to_snapshot(Utc::now());
        let content = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write save: {}", path.display()))?;
        debug!("Saved match to {}", path.display());
        Ok(())
    }

    // ========================================================================
    // LOAD
    // ========================================================================

    /// Rebuild a match from a snapshot. `config` supplies everything the
    /// snapshot does not carry (economy, limits, default names).
    pub fn from_snapshot(root: &SaveRoot, config: &MatchConfig) -> Result<Self, SnapshotError> {
        let game = &root.game;
        let map = game.map.as_ref().ok_or(SnapshotError::MissingMap)?;
        let (width, height) = (map.width, map.height);
        if !Board::accepts(width, height) {
            return Err(SnapshotError::InvalidDimensions { width, height });
        }

        let mut board = Board::new(width, height);
        for dto in &map.tiles {
            let pos = Position::new(dto.x, dto.y);
            let Some(tile) = board.get_mut(pos) else {
                warn!("Skipping tile outside the {}x{} map at {}", width, height, pos);
                continue;
            };
            tile.terrain = Terrain::from_tag(&dto.terrain).unwrap_or_default();
            tile.owner = Faction::from_tag(&dto.owner);
        }

        let castles = match &game.castles {
            Some(CastlesDto {
                a: Some(a),
                b: Some(b),
            }) => Castles {
                a: (*a).into(),
                b: (*b).into(),
            },
            _ => Castles::corners(width, height),
        };

        let players = [Faction::A, Faction::B].map(|faction| {
            let dto = game.players.iter().find(|p| p.id == faction.tag());
            let name = dto
                .map(|p| p.name.as_str())
                .filter(|name| !name.is_empty())
                .unwrap_or(config.name_for(faction));
            Player::new(faction, name, dto.map_or(0, |p| p.resources))
        });

        let mut roster = Roster::new();
        for dto in &game.units {
            let Some(pos) = dto.pos.map(Position::from) else {
                warn!("Skipping unit {:?} without a position", dto.id);
                continue;
            };
            let Some(tile) = board.get_mut(pos) else {
                warn!("Skipping unit {:?} outside the map at {}", dto.id, pos);
                continue;
            };
            if !tile.is_empty() {
                warn!("Skipping unit {:?} on occupied tile {}", dto.id, pos);
                continue;
            }
            let faction = Faction::from_tag(&dto.owner).unwrap_or(Faction::A);
            let archetype = Archetype::from_tag(&dto.archetype);
            tile.occupant = Some(roster.spawn(archetype, faction, pos));
        }

        let turn = u32::try_from(game.turn).ok().filter(|&t| t > 0).unwrap_or(1);
        let current = Faction::from_tag(&game.current_player).unwrap_or(Faction::A);

        let mut rng = ChaCha8Rng::seed_from_u64(root.metadata.seed);
        if let Some(word_pos) = root.metadata.rng_word_pos {
            rng.set_word_pos(u128::from(word_pos));
        }

        let mut state = GameState {
            board,
            roster,
            players,
            current,
            turn,
            phase: Phase::Running,
            winner: None,
            castles,
            config: config.clone(),
            seed: root.metadata.seed,
            rng,
        };

        if game.state == phase_tag(Phase::GameOver) {
            let winner = game
                .winner
                .as_deref()
                .and_then(Faction::from_tag)
                .or_else(|| state.derive_winner());
            if winner.is_none() {
                warn!("Finished snapshot names no winner");
            }
            state.phase = Phase::GameOver;
            state.winner = winner;
        }

        Ok(state)
    }

    /// Replace this match with the one in `root`. On error the current match
    /// is kept as it was.
    pub fn load_snapshot(&mut self, root: &SaveRoot) -> Result<(), SnapshotError> {
        *self = Self::from_snapshot(root, &self.config)?;
        debug!("Loaded turn {} with {} units", self.turn, self.roster.len());
        Ok(())
    }

    /// Read a match from a JSON save file
    pub fn load_from_path(path: &Path, config: &MatchConfig) -> anyhow::Result<Self> {
        let root = read_snapshot(path)?;
        let state = Self::from_snapshot(&root, config)
            .with_context(|| format!("Invalid save: {}", path.display()))?;
        Ok(state)
    }

    /// Read a save to continue the turn in progress. Unlike `load_from_path`,
    /// units of the current faction that already acted stay exhausted.
    pub fn resume_from_path(path: &Path, config: &MatchConfig) -> anyhow::Result<Self> {
        let root = read_snapshot(path)?;
        let mut state = Self::from_snapshot(&root, config)
            .with_context(|| format!("Invalid save: {}", path.display()))?;
        state.restore_acted(&root);
        Ok(state)
    }

    fn restore_acted(&mut self, root: &SaveRoot) {
        for dto in root.game.units.iter().filter(|u| u.acted) {
            let Some(pos) = dto.pos.map(Position::from) else {
                continue;
            };
            let Some(id) = self.board.get(pos).and_then(|t| t.occupant) else {
                continue;
            };
            let current = self.current;
            if let Some(unit) = self.roster.get_mut(id) {
                if unit.faction == current && unit.archetype == Archetype::from_tag(&dto.archetype) {
                    unit.has_acted = true;
                }
            }
        }
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<SaveRoot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read save: {}", path.display()))?;
    let root = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse save: {}", path.display()))?;
    Ok(root)
}

// ============================================================================
// TESTS
// ============================================================================

//! Match configuration

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::economy::IncomeRates;
use crate::game::Faction;

/// Terrain mix for generated boards, as fractions of non-castle tiles
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainMix {
    pub forest: f64,
    pub mine: f64,
    pub temple: f64,
    /// Put one temple on each side at fixed spots next to the starting armies
    pub fixed_temples: bool,
}

impl Default for TerrainMix {
    fn default() -> Self {
        Self {
            forest: 0.25,
            mine: 0.20,
            temple: 0.10,
            fixed_temples: true,
        }
    }
}

/// Everything needed to start a match
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub width: i32,
    pub height: i32,
    pub starting_resources: i32,
    pub income: IncomeRates,
    /// Recruitment is refused once a faction fields this many units
    pub max_units_per_faction: usize,
    pub terrain: TerrainMix,
    pub name_a: String,
    pub name_b: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            width: 7,
            height: 7,
            starting_resources: 0,
            income: IncomeRates::default(),
            max_units_per_faction: 10,
            terrain: TerrainMix::default(),
            name_a: "Red Empire".to_string(),
            name_b: "Blue Kingdom".to_string(),
        }
    }
}

impl MatchConfig {
    /// Default display name for a faction
    pub fn name_for(&self, faction: Faction) -> &str {
        match faction {
            Faction::A => &self.name_a,
            Faction::B => &self.name_b,
        }
    }

    /// Load from JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

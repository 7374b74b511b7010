//! New command - start a match and write its first save
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), create_match()
//! - Level 3: apply_overrides()
//! - Level 4: pick_seed()

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use bftk_core::{GameState, MatchConfig};

use crate::load_config;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args, Debug)]
pub struct NewArgs {
    /// Where to write the match save
    #[arg(long, value_name = "FILE")]
    pub save: PathBuf,

    /// Match config file (JSON)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Terrain seed; random when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Board width (overrides config)
    #[arg(long)]
    pub width: Option<i32>,

    /// Board height (overrides config)
    #[arg(long)]
    pub height: Option<i32>,

    /// Replace an existing save
    #[arg(long)]
    pub force: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run new command
pub fn run(args: NewArgs) -> Result<()> {
    if args.save.exists() && !args.force {
        anyhow::bail!(
            "Save {} already exists (use --force to replace it)",
            args.save.display()
        );
    }

    let config = build_config(&args)?;
    let seed = pick_seed(args.seed);
    let game = create_match(&config, seed)?;

    game.save_to_path(&args.save)?;
    tracing::info!(
        "Started {}x{} match with seed {} in {}",
        config.width,
        config.height,
        seed,
        args.save.display()
    );
    println!("New match saved to {} (seed {})", args.save.display(), seed);
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn build_config(args: &NewArgs) -> Result<MatchConfig> {
    let config = load_config(args.config.as_deref())?;
    Ok(apply_overrides(config, args))
}

fn create_match(config: &MatchConfig, seed: u64) -> Result<GameState> {
    GameState::new(config, seed).context("Failed to set up match")
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Command-line dimensions win over the config file
fn apply_overrides(mut config: MatchConfig, args: &NewArgs) -> MatchConfig {
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    config
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn pick_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

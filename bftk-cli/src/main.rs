//! BFTK CLI - Command-line front end
//!
//! Each invocation loads a match from a save file, applies one command and
//! writes the match back.
//!
//! Commands:
//! - new: Start a match
//! - show: Print the board and match status
//! - options: List moves and attack targets for one unit
//! - move / attack / recruit / end-turn: Play the current faction's turn

mod new_cmd;
mod play_cmd;
mod show_cmd;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use bftk_core::MatchConfig;

#[derive(Parser)]
#[command(name = "bftk")]
#[command(about = "Two-faction grid strategy game")]
struct Cli {
    /// Log filter, used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a new match
    New(new_cmd::NewArgs),
    /// Show the board and match status
    Show(show_cmd::ShowArgs),
    /// List reachable tiles and attack targets of a unit
    Options(show_cmd::OptionsArgs),
    /// Move a unit
    Move(play_cmd::MoveArgs),
    /// Attack an enemy unit
    Attack(play_cmd::AttackArgs),
    /// Recruit a unit next to the castle
    Recruit(play_cmd::RecruitArgs),
    /// End the current faction's turn
    EndTurn(play_cmd::EndTurnArgs),
}

/// Save file plus the rules it is played under
#[derive(Args, Clone, Debug)]
pub struct SaveArgs {
    /// Match save file (JSON)
    #[arg(long, value_name = "FILE")]
    pub save: PathBuf,

    /// Match config file (JSON); defaults apply when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl SaveArgs {
    pub fn load_config(&self) -> Result<MatchConfig> {
        load_config(self.config.as_deref())
    }
}

/// Read a config file, or fall back to the defaults
pub fn load_config(path: Option<&Path>) -> Result<MatchConfig> {
    match path {
        Some(path) => MatchConfig::load(path),
        None => Ok(MatchConfig::default()),
    }
}

fn init_logging(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::New(args) => new_cmd::run(args),
        Commands::Show(args) => show_cmd::run_show(args),
        Commands::Options(args) => show_cmd::run_options(args),
        Commands::Move(args) => play_cmd::run_move(args),
        Commands::Attack(args) => play_cmd::run_attack(args),
        Commands::Recruit(args) => play_cmd::run_recruit(args),
        Commands::EndTurn(args) => play_cmd::run_end_turn(args),
    }
}

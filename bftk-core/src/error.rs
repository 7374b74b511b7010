//! Rejection reasons for match requests

use crate::board::{Position, MAX_DIMENSION};

/// Why a move, attack or recruit request was refused. A rejected request
/// leaves the match untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("game is already over")]
    GameOver,

    #[error("position out of bounds")]
    OutOfBounds,

    #[error("no unit at {0}")]
    NoUnitAtSource(Position),

    #[error("no defending unit at {0}")]
    NoDefender(Position),

    #[error("unit at {0} does not belong to the current faction")]
    NotYourUnit(Position),

    #[error("unit at {0} already acted this turn")]
    AlreadyActed(Position),

    #[error("destination {0} is occupied")]
    DestinationOccupied(Position),

    #[error("destination {0} is not reachable")]
    Unreachable(Position),

    #[error("target {0} is out of attack range")]
    OutOfRange(Position),

    #[error("cannot attack own unit at {0}")]
    OwnUnit(Position),

    #[error("insufficient resources: need {need}, have {have}")]
    InsufficientResources { need: i32, have: i32 },

    #[error("unit limit reached ({limit})")]
    UnitLimit { limit: usize },

    #[error("no free tile next to the castle")]
    NoFreeTile,
}

/// Errors building or laying out a match
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error(
        "board must be at least 2x2 and at most {}x{}, got {width}x{height}",
        MAX_DIMENSION,
        MAX_DIMENSION
    )]
    InvalidDimensions { width: i32, height: i32 },

    #[error("position {0} is out of bounds")]
    OutOfBounds(Position),

    #[error("castle tile at {0} cannot be changed")]
    CastleTile(Position),

    #[error("tile {0} is already occupied")]
    Occupied(Position),
}

/// Errors loading a snapshot. The current match is kept when these occur.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot has no map")]
    MissingMap,

    #[error("snapshot map has invalid dimensions {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
}

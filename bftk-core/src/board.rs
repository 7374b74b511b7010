//! Square grid geometry and tile storage

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::game::Faction;
use crate::units::UnitId;

/// Grid coordinates (x = column, y = row)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance between two positions
    pub fn manhattan(&self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Orthogonal neighbors, in `DIRECTIONS` order. May be off the board.
    pub fn neighbors(&self) -> [Position; 4] {
        DIRECTIONS.map(|(dx, dy)| Position::new(self.x + dx, self.y + dy))
    }
}

/// Direction vectors (dx, dy): left, right, up, down
pub const DIRECTIONS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

/// Error parsing a position from `"x,y"` text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a position as \"x,y\", got {0:?}")]
pub struct ParsePositionError(String);

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (x, y) = trimmed
            .split_once(',')
            .ok_or_else(|| ParsePositionError(s.to_string()))?;
        let x = x.trim().parse().map_err(|_| ParsePositionError(s.to_string()))?;
        let y = y.trim().parse().map_err(|_| ParsePositionError(s.to_string()))?;
        Ok(Position::new(x, y))
    }
}

/// Terrain type of a tile
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Plains,
    Forest,
    Mine,
    Temple,
    Castle,
}

impl Terrain {
    /// Mines and temples change hands when a unit arrives on them
    pub fn is_capturable(self) -> bool {
        matches!(self, Terrain::Mine | Terrain::Temple)
    }

    /// Snapshot tag
    pub fn tag(self) -> &'static str {
        match self {
            Terrain::Plains => "PLAINS",
            Terrain::Forest => "FOREST",
            Terrain::Mine => "MINE",
            Terrain::Temple => "TEMPLE",
            Terrain::Castle => "CASTLE",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "PLAINS" => Some(Terrain::Plains),
            "FOREST" => Some(Terrain::Forest),
            "MINE" => Some(Terrain::Mine),
            "TEMPLE" => Some(Terrain::Temple),
            "CASTLE" => Some(Terrain::Castle),
            _ => None,
        }
    }
}

/// A single grid cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Tile {
    pub terrain: Terrain,
    pub owner: Option<Faction>,
    pub occupant: Option<UnitId>,
}

impl Tile {
    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

/// Largest accepted board side. Keeps tile offsets well inside `i32`.
pub const MAX_DIMENSION: i32 = 256;

/// Fixed-size board, tiles stored row-major
#[derive(Clone, Debug)]
pub struct Board {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl Board {
    /// All-plains board with no owners. Dimensions must be positive.
    pub fn new(width: i32, height: i32) -> Self {
        debug_assert!(width > 0 && height > 0);
        let len = (width.max(0) as usize) * (height.max(0) as usize);
        Self {
            width,
            height,
            tiles: vec![Tile::default(); len],
        }
    }

    /// Whether `width` x `height` is a board this crate will allocate
    pub fn accepts(width: i32, height: i32) -> bool {
        (1..=MAX_DIMENSION).contains(&width) && (1..=MAX_DIMENSION).contains(&height)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width && pos.y < self.height
    }

    fn offset(&self, pos: Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| (pos.y * self.width + pos.x) as usize)
    }

    pub fn get(&self, pos: Position) -> Option<&Tile> {
        self.offset(pos).map(|i| &self.tiles[i])
    }

    pub fn get_mut(&mut self, pos: Position) -> Option<&mut Tile> {
        self.offset(pos).map(move |i| &mut self.tiles[i])
    }

    /// Iterate tiles in row-major order
    pub fn tiles(&self) -> impl Iterator<Item = (Position, &Tile)> + '_ {
        let width = self.width;
        self.tiles.iter().enumerate().map(move |(i, tile)| {
            let i = i as i32;
            (Position::new(i % width, i / width), tile)
        })
    }

    /// Count tiles of a terrain type held by `owner`
    pub fn count(&self, terrain: Terrain, owner: Option<Faction>) -> usize {
        self.tiles
            .iter()
            .filter(|t| t.terrain == terrain && t.owner == owner)
            .count()
    }

    /// In-bounds orthogonal neighbors of `pos`
    pub fn neighbors(&self, pos: Position) -> impl Iterator<Item = Position> + '_ {
        pos.neighbors().into_iter().filter(|&n| self.in_bounds(n))
    }
}

impl Index<Position> for Board {
    type Output = Tile;

    fn index(&self, pos: Position) -> &Tile {
        match self.get(pos) {
            Some(tile) => tile,
            None => panic!("position {} outside {}x{} board", pos, self.width, self.height),
        }
    }
}

impl IndexMut<Position> for Board {
    fn index_mut(&mut self, pos: Position) -> &mut Tile {
        let (width, height) = (self.width, self.height);
        match self.get_mut(pos) {
            Some(tile) => tile,
            None => panic!("position {} outside {}x{} board", pos, width, height),
        }
    }
}

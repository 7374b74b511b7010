//! Seeded terrain layout
//!
//! The board is split along the anti-diagonal into a half for each faction.
//! Every terrain kind is dealt out in equal shares to both halves, and an odd
//! leftover goes onto the diagonal itself, so neither side starts with more
//! forests, mines or temples than the other.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::board::{Board, Position, Terrain};
use crate::config::TerrainMix;
use crate::game::Castles;

/// Candidate cells, split by side of the diagonal
struct Halves {
    side_a: Vec<Position>,
    side_b: Vec<Position>,
    diagonal: Vec<Position>,
}

impl Halves {
    fn remove(&mut self, pos: Position) {
        self.side_a.retain(|&p| p != pos);
        self.side_b.retain(|&p| p != pos);
        self.diagonal.retain(|&p| p != pos);
    }
}

/// Lay out terrain on `board`. All non-castle tiles are reset to plains with no
/// owner first; castle tiles are left as they are.
pub fn generate(board: &mut Board, castles: &Castles, mix: &TerrainMix, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let is_castle = |p: Position| p == castles.a || p == castles.b;

    let diag_sum = board.width() - 1;
    let mut halves = Halves {
        side_a: Vec::new(),
        side_b: Vec::new(),
        diagonal: Vec::new(),
    };

    for y in 0..board.height() {
        for x in 0..board.width() {
            let pos = Position::new(x, y);
            if is_castle(pos) {
                continue;
            }
            let tile = &mut board[pos];
            tile.terrain = Terrain::Plains;
            tile.owner = None;

            match (x + y).cmp(&diag_sum) {
                std::cmp::Ordering::Less => halves.side_a.push(pos),
                std::cmp::Ordering::Greater => halves.side_b.push(pos),
                std::cmp::Ordering::Equal => halves.diagonal.push(pos),
            }
        }
    }

    halves.side_a.shuffle(&mut rng);
    halves.side_b.shuffle(&mut rng);
    halves.diagonal.shuffle(&mut rng);

    let non_castle = (board.width() * board.height() - 2).max(0) as f64;
    let count = |fraction: f64| (non_castle * fraction.clamp(0.0, 1.0)).round() as usize;

    let forests = count(mix.forest);
    let mines = count(mix.mine);
    let mut temples = count(mix.temple);

    if mix.fixed_temples && temples >= 2 {
        let fixed = [
            Position::new(1, board.height() - 2),
            Position::new(board.width() - 2, 1),
        ];
        for pos in fixed {
            if board.in_bounds(pos) && !is_castle(pos) {
                board[pos].terrain = Terrain::Temple;
                halves.remove(pos);
                temples -= 1;
            }
        }
    }

    place_fair(board, &mut halves, Terrain::Forest, forests);
    place_fair(board, &mut halves, Terrain::Mine, mines);
    place_fair(board, &mut halves, Terrain::Temple, temples);
}

/// Half to each side, odd remainder on the diagonal (or whichever side has room)
fn place_fair(board: &mut Board, halves: &mut Halves, terrain: Terrain, count: usize) {
    if count == 0 {
        return;
    }

    let half = count / 2;
    place_from(board, &mut halves.side_a, terrain, half);
    place_from(board, &mut halves.side_b, terrain, half);

    if count % 2 == 1
        && !place_from(board, &mut halves.diagonal, terrain, 1)
        && !place_from(board, &mut halves.side_a, terrain, 1)
    {
        place_from(board, &mut halves.side_b, terrain, 1);
    }
}

/// Convert up to `amount` plains cells from the front of `cells`, consuming
/// them. Returns whether the full amount was placed.
fn place_from(board: &mut Board, cells: &mut Vec<Position>, terrain: Terrain, amount: usize) -> bool {
    let mut placed = 0;
    while placed < amount && !cells.is_empty() {
        let pos = cells.remove(0);
        let tile = &mut board[pos];
        if tile.terrain == Terrain::Plains {
            tile.terrain = terrain;
            placed += 1;
        }
    }
    placed == amount
}

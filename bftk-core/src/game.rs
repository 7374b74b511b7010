//! Match state machine: setup, movement, combat, capture, income and victory

use std::collections::VecDeque;
use std::fmt;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::board::{Board, Position, Terrain};
use crate::combat::{self, CombatOutcome, Dice};
use crate::config::MatchConfig;
use crate::economy;
use crate::error::{ActionError, SetupError};
use crate::terrain;
use crate::units::{Archetype, Roster, Unit, UnitId};

// ============================================================================
// CORE TYPES
// ============================================================================

/// One of the two sides
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    #[serde(rename = "FACTION_A")]
    A = 0,
    #[serde(rename = "FACTION_B")]
    B = 1,
}

impl Faction {
    pub fn opponent(self) -> Self {
        match self {
            Faction::A => Faction::B,
            Faction::B => Faction::A,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Snapshot tag
    pub fn tag(self) -> &'static str {
        match self {
            Faction::A => "FACTION_A",
            Faction::B => "FACTION_B",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "FACTION_A" => Some(Faction::A),
            "FACTION_B" => Some(Faction::B),
            _ => None,
        }
    }
}

impl fmt::Display for Faction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Match phase. GameOver is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Running,
    GameOver,
}

/// A faction's treasury and display name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub faction: Faction,
    pub name: String,
    pub resources: i32,
}

impl Player {
    pub fn new(faction: Faction, name: impl Into<String>, resources: i32) -> Self {
        Self {
            faction,
            name: name.into(),
            resources,
        }
    }
}

/// Castle position of each faction, fixed for the whole match
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Castles {
    pub a: Position,
    pub b: Position,
}

impl Castles {
    /// A in the bottom-left corner, B in the top-right
    pub fn corners(width: i32, height: i32) -> Self {
        Self {
            a: Position::new(0, height - 1),
            b: Position::new(width - 1, 0),
        }
    }

    pub fn of(&self, faction: Faction) -> Position {
        match faction {
            Faction::A => self.a,
            Faction::B => self.b,
        }
    }
}

// ============================================================================
// GAME STATE
// ============================================================================

/// Authoritative match state. Every mutating request is validated in full
/// before the first write, so a rejected request changes nothing.
#[derive(Clone, Debug)]
pub struct GameState {
    pub(crate) board: Board,
    pub(crate) roster: Roster,
    /// Indexed by `Faction::index`
    pub(crate) players: [Player; 2],
    pub(crate) current: Faction,
    pub(crate) turn: u32,
    pub(crate) phase: Phase,
    pub(crate) winner: Option<Faction>,
    pub(crate) castles: Castles,
    pub(crate) config: MatchConfig,
    pub(crate) seed: u64,
    /// Combat dice
    pub(crate) rng: ChaCha8Rng,
}

impl GameState {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    /// Start a new match: generated terrain, two soldiers per side, first
    /// income paid to faction A.
    pub fn new(config: &MatchConfig, seed: u64) -> Result<Self, SetupError> {
        let mut state = Self::empty(config, seed)?;
        terrain::generate(&mut state.board, &state.castles, &config.terrain, seed);

        let (w, h) = (config.width, config.height);
        let starting = [
            (Faction::A, Position::new(0, h - 2)),
            (Faction::A, Position::new(1, h - 2)),
            (Faction::B, Position::new(w - 1, 1)),
            (Faction::B, Position::new(w - 2, 1)),
        ];
        for (faction, pos) in starting {
            // small boards may not have room for every starter
            if let Err(e) = state.place_unit(Archetype::Melee, faction, pos) {
                debug!("Skipping starting unit for {}: {}", faction, e);
            }
        }

        state.accrue_income();
        info!("New {}x{} match (seed {})", w, h, seed);
        Ok(state)
    }

    /// All-plains match with castles only and no units. First income is paid.
    pub fn blank(config: &MatchConfig, seed: u64) -> Result<Self, SetupError> {
        let mut state = Self::empty(config, seed)?;
        state.accrue_income();
        Ok(state)
    }

    fn empty(config: &MatchConfig, seed: u64) -> Result<Self, SetupError> {
        let (width, height) = (config.width, config.height);
        if width < 2 || height < 2 || !Board::accepts(width, height) {
            return Err(SetupError::InvalidDimensions { width, height });
        }

        let mut board = Board::new(width, height);
        let castles = Castles::corners(width, height);
        for faction in [Faction::A, Faction::B] {
            let tile = &mut board[castles.of(faction)];
            tile.terrain = Terrain::Castle;
            tile.owner = Some(faction);
        }

        Ok(Self {
            board,
            roster: Roster::new(),
            players: [
                Player::new(Faction::A, config.name_for(Faction::A), config.starting_resources),
                Player::new(Faction::B, config.name_for(Faction::B), config.starting_resources),
            ],
            current: Faction::A,
            turn: 1,
            phase: Phase::Running,
            winner: None,
            castles,
            config: config.clone(),
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    // ========================================================================
    // SETUP
    // ========================================================================

    /// Put a unit on the board at no cost
    pub fn place_unit(&mut self, archetype: Archetype, faction: Faction, pos: Position) -> Result<UnitId, SetupError> {
        let tile = self.board.get(pos).ok_or(SetupError::OutOfBounds(pos))?;
        if !tile.is_empty() {
            return Err(SetupError::Occupied(pos));
        }
        Ok(self.spawn(archetype, faction, pos))
    }

    /// Change the terrain of a non-castle tile. Ownership is cleared.
    pub fn paint_terrain(&mut self, pos: Position, terrain: Terrain) -> Result<(), SetupError> {
        let tile = self.board.get_mut(pos).ok_or(SetupError::OutOfBounds(pos))?;
        if tile.terrain == Terrain::Castle || terrain == Terrain::Castle {
            return Err(SetupError::CastleTile(pos));
        }
        tile.terrain = terrain;
        tile.owner = None;
        Ok(())
    }

    fn spawn(&mut self, archetype: Archetype, faction: Faction, pos: Position) -> UnitId {
        let id = self.roster.spawn(archetype, faction, pos);
        self.board[pos].occupant = Some(id);
        id
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Set once the match is over
    pub fn winner(&self) -> Option<Faction> {
        self.winner
    }

    pub fn current_faction(&self) -> Faction {
        self.current
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn player(&self, faction: Faction) -> &Player {
        &self.players[faction.index()]
    }

    fn player_mut(&mut self, faction: Faction) -> &mut Player {
        &mut self.players[faction.index()]
    }

    pub fn castles(&self) -> Castles {
        self.castles
    }

    pub fn castle(&self, faction: Faction) -> Position {
        self.castles.of(faction)
    }

    /// Live units in creation order
    pub fn units(&self) -> impl Iterator<Item = &Unit> + '_ {
        self.roster.iter()
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.roster.get(id)
    }

    pub fn unit_at(&self, pos: Position) -> Option<&Unit> {
        self.board
            .get(pos)
            .and_then(|tile| tile.occupant)
            .and_then(|id| self.roster.get(id))
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Empty tiles the unit can walk to this turn.
    ///
    /// Breadth-first over orthogonal steps, up to the unit's move range.
    /// Occupied tiles block. A mounted unit that enters a forest stops there.
    pub fn reachable_moves(&self, unit: &Unit) -> FxHashSet<Position> {
        let mut result = FxHashSet::default();
        let start = unit.pos;
        if !self.board.in_bounds(start) {
            return result;
        }

        let stops_in_forest = unit.archetype == Archetype::Mounted;
        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        visited.insert(start);
        queue.push_back((start, 0u32));

        while let Some((pos, dist)) = queue.pop_front() {
            if dist >= unit.move_range() {
                continue;
            }
            if stops_in_forest && pos != start && self.board[pos].terrain == Terrain::Forest {
                continue;
            }

            for next in self.board.neighbors(pos) {
                if !visited.insert(next) {
                    continue;
                }
                if !self.board[next].is_empty() {
                    continue;
                }
                result.insert(next);
                queue.push_back((next, dist + 1));
            }
        }

        result
    }

    /// Enemy-occupied tiles the unit can attack from where it stands
    pub fn attack_targets(&self, unit: &Unit) -> FxHashSet<Position> {
        let mut result = FxHashSet::default();
        let range = unit.attack_range() as i32;
        let from = unit.pos;

        for dy in -range..=range {
            let rem = range - dy.abs();
            for dx in -rem..=rem {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let pos = Position::new(from.x + dx, from.y + dy);
                let Some(target) = self.unit_at(pos) else {
                    continue;
                };
                if target.faction == unit.faction {
                    continue;
                }
                if from.manhattan(pos) <= self.effective_range(unit, pos) {
                    result.insert(pos);
                }
            }
        }

        result
    }

    /// Attack range against a target tile; archers must be adjacent to hit
    /// a unit in forest
    pub fn effective_range(&self, unit: &Unit, target: Position) -> u32 {
        let in_forest = self
            .board
            .get(target)
            .is_some_and(|t| t.terrain == Terrain::Forest);
        if unit.archetype == Archetype::Ranged && in_forest {
            unit.attack_range().min(1)
        } else {
            unit.attack_range()
        }
    }

    // ========================================================================
    // COMMANDS
    // ========================================================================

    /// Move a unit of the current faction to a reachable empty tile
    pub fn move_unit(&mut self, from: Position, to: Position) -> Result<(), ActionError> {
        self.ensure_running()?;
        self.ensure_in_bounds(from, to)?;

        let unit = *self.unit_at(from).ok_or(ActionError::NoUnitAtSource(from))?;
        self.ensure_can_act(&unit)?;
        if !self.board[to].is_empty() {
            return Err(ActionError::DestinationOccupied(to));
        }
        if !self.reachable_moves(&unit).contains(&to) {
            return Err(ActionError::Unreachable(to));
        }

        self.relocate(unit.id, from, to);
        self.mark_acted(unit.id);
        debug!("{} {} moved {} -> {}", unit.faction, unit.archetype, from, to);

        self.capture_on_arrival(to, unit.faction);
        self.check_temple_victory();
        Ok(())
    }

    /// Attack with the match's own dice
    pub fn attack(&mut self, from: Position, target: Position) -> Result<CombatOutcome, ActionError> {
        let mut rng = self.rng.clone();
        let result = self.attack_with(from, target, &mut rng);
        self.rng = rng;
        result
    }

    /// Attack an enemy unit in range, rolling with `dice`.
    ///
    /// The winner of a successful attack moves onto the target tile and
    /// captures it. A lost or tied attack only uses up the attacker's action.
    pub fn attack_with<D: Dice + ?Sized>(
        &mut self,
        from: Position,
        target: Position,
        dice: &mut D,
    ) -> Result<CombatOutcome, ActionError> {
        let (attacker, defender) = self.validate_attack(from, target)?;
        let outcome = combat::resolve(&attacker, &defender, dice);

        if outcome.attacker_wins {
            self.roster.remove(defender.id);
            self.board[target].occupant = None;
            self.relocate(attacker.id, from, target);
        }
        self.mark_acted(attacker.id);

        debug!(
            "{} {} at {} attacked {} {} at {}: {}+{} vs {}+{}, {}",
            attacker.faction,
            attacker.archetype,
            from,
            defender.faction,
            defender.archetype,
            target,
            attacker.attack(),
            outcome.attack_roll,
            defender.defense(),
            outcome.defense_roll,
            if outcome.attacker_wins { "attacker wins" } else { "defender holds" }
        );

        if outcome.attacker_wins {
            self.capture_on_arrival(target, attacker.faction);
        }
        self.check_temple_victory();
        Ok(outcome)
    }

    fn validate_attack(&self, from: Position, target: Position) -> Result<(Unit, Unit), ActionError> {
        self.ensure_running()?;
        self.ensure_in_bounds(from, target)?;

        let attacker = *self.unit_at(from).ok_or(ActionError::NoUnitAtSource(from))?;
        let defender = *self.unit_at(target).ok_or(ActionError::NoDefender(target))?;
        self.ensure_can_act(&attacker)?;
        if defender.faction == attacker.faction {
            return Err(ActionError::OwnUnit(target));
        }
        if from.manhattan(target) > self.effective_range(&attacker, target) {
            return Err(ActionError::OutOfRange(target));
        }

        Ok((attacker, defender))
    }

    /// Buy a unit for the current faction, placed next to its castle
    pub fn recruit(&mut self, archetype: Archetype) -> Result<UnitId, ActionError> {
        self.ensure_running()?;

        let faction = self.current;
        let limit = self.config.max_units_per_faction;
        if self.roster.count_for(faction) >= limit {
            return Err(ActionError::UnitLimit { limit });
        }

        let price = archetype.stats().price;
        let have = self.player(faction).resources;
        if have < price {
            return Err(ActionError::InsufficientResources { need: price, have });
        }

        let castle = self.castles.of(faction);
        let spot = self
            .board
            .neighbors(castle)
            .find(|&p| self.board[p].is_empty())
            .ok_or(ActionError::NoFreeTile)?;

        let id = self.spawn(archetype, faction, spot);
        self.player_mut(faction).resources -= price;
        debug!("{} recruited {} at {} for {}", faction, archetype, spot, price);
        Ok(id)
    }

    /// Finish the current faction's turn.
    ///
    /// Checks castle capture and temple control first; if the match goes on,
    /// the other faction becomes active, its units are readied and it is paid.
    pub fn end_turn(&mut self) {
        if self.is_over() {
            return;
        }
        if self.check_castle_victory() || self.check_temple_victory() {
            return;
        }

        self.current = self.current.opponent();
        self.turn = self.turn.saturating_add(1);
        self.roster.ready(self.current);
        self.accrue_income();
        info!(
            "Turn {}: {} to move ({} resources)",
            self.turn,
            self.current,
            self.player(self.current).resources
        );
    }

    // ========================================================================
    // RULE HELPERS
    // ========================================================================

    fn ensure_running(&self) -> Result<(), ActionError> {
        if self.is_over() {
            return Err(ActionError::GameOver);
        }
        Ok(())
    }

    fn ensure_in_bounds(&self, a: Position, b: Position) -> Result<(), ActionError> {
        if !self.board.in_bounds(a) || !self.board.in_bounds(b) {
            return Err(ActionError::OutOfBounds);
        }
        Ok(())
    }

    fn ensure_can_act(&self, unit: &Unit) -> Result<(), ActionError> {
        if unit.faction != self.current {
            return Err(ActionError::NotYourUnit(unit.pos));
        }
        if unit.has_acted {
            return Err(ActionError::AlreadyActed(unit.pos));
        }
        Ok(())
    }

    fn relocate(&mut self, id: UnitId, from: Position, to: Position) {
        self.board[from].occupant = None;
        self.board[to].occupant = Some(id);
        if let Some(unit) = self.roster.get_mut(id) {
            unit.pos = to;
        }
    }

    fn mark_acted(&mut self, id: UnitId) {
        if let Some(unit) = self.roster.get_mut(id) {
            unit.has_acted = true;
        }
    }

    /// Take a mine or temple, or end the match on reaching the enemy castle
    fn capture_on_arrival(&mut self, pos: Position, faction: Faction) {
        let tile = &mut self.board[pos];
        if tile.owner == Some(faction) {
            return;
        }

        if tile.terrain.is_capturable() {
            tile.owner = Some(faction);
            debug!("{} captured {:?} at {}", faction, tile.terrain, pos);
        } else if tile.terrain == Terrain::Castle {
            tile.owner = Some(faction);
            info!("{} stormed the castle at {}", faction, pos);
            self.declare_winner(faction);
        }
    }

    fn accrue_income(&mut self) {
        let faction = self.current;
        let income = economy::turn_income(&self.board, faction, self.config.income);
        let player = self.player_mut(faction);
        player.resources = player.resources.saturating_add(income);
    }

    /// A castle held by the opposing faction wins the match for it
    fn check_castle_victory(&mut self) -> bool {
        if let Some(faction) = self.castle_holder() {
            self.declare_winner(faction);
            return true;
        }
        false
    }

    fn castle_holder(&self) -> Option<Faction> {
        [Faction::A, Faction::B].into_iter().find_map(|faction| {
            let castle = self.castles.of(faction.opponent());
            (self.board.get(castle)?.owner == Some(faction)).then_some(faction)
        })
    }

    /// One faction holding every temple on the board wins the match
    fn check_temple_victory(&mut self) -> bool {
        if self.is_over() {
            return false;
        }
        if let Some(faction) = self.temple_holder() {
            self.declare_winner(faction);
            return true;
        }
        false
    }

    fn temple_holder(&self) -> Option<Faction> {
        let mut temples = 0;
        let mut held = [0usize; 2];
        for (_, tile) in self.board.tiles() {
            if tile.terrain != Terrain::Temple {
                continue;
            }
            temples += 1;
            if let Some(owner) = tile.owner {
                held[owner.index()] += 1;
            }
        }

        if temples == 0 {
            return None;
        }
        [Faction::A, Faction::B]
            .into_iter()
            .find(|f| held[f.index()] == temples)
    }

    /// Winner implied by castle or temple ownership, if any
    pub(crate) fn derive_winner(&self) -> Option<Faction> {
        self.castle_holder().or_else(|| self.temple_holder())
    }

    fn declare_winner(&mut self, faction: Faction) {
        if self.is_over() {
            return;
        }
        self.winner = Some(faction);
        self.phase = Phase::GameOver;
        info!("{} ({}) wins on turn {}", faction, self.player(faction).name, self.turn);
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::MAX_DIMENSION;

    /// Dice that replay a fixed sequence
    struct LoadedDice(Vec<u8>);

    impl Dice for LoadedDice {
        fn roll(&mut self) -> u8 {
            self.0.remove(0)
        }
    }

    fn blank_game() -> GameState {
        GameState::blank(&MatchConfig::default(), 1).unwrap()
    }

    fn place(game: &mut GameState, archetype: Archetype, faction: Faction, x: i32, y: i32) -> UnitId {
        game.place_unit(archetype, faction, Position::new(x, y)).unwrap()
    }

    fn reach(game: &GameState, x: i32, y: i32) -> FxHashSet<Position> {
        let unit = *game.unit_at(Position::new(x, y)).unwrap();
        game.reachable_moves(&unit)
    }

    #[test]
    fn test_game_creation() {
        let game = GameState::new(&MatchConfig::default(), 123456).unwrap();
        assert_eq!(game.current_faction(), Faction::A);
        assert_eq!(game.turn(), 1);
        assert_eq!(game.phase(), Phase::Running);
        assert_eq!(game.units().count(), 4);
        assert_eq!(game.castle(Faction::A), Position::new(0, 6));
        assert_eq!(game.castle(Faction::B), Position::new(6, 0));
        assert_eq!(game.board()[Position::new(0, 6)].terrain, Terrain::Castle);
        assert_eq!(game.board()[Position::new(6, 0)].owner, Some(Faction::B));
        assert_eq!(game.player(Faction::A).resources, 6);
        assert_eq!(game.player(Faction::B).resources, 0);
    }

    #[test]
    fn test_rejects_tiny_board() {
        let config = MatchConfig {
            width: 1,
            ..MatchConfig::default()
        };
        assert!(matches!(
            GameState::new(&config, 0),
            Err(SetupError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_rejects_oversized_board() {
        for (width, height) in [(MAX_DIMENSION + 1, 7), (7, i32::MAX), (i32::MAX, i32::MAX)] {
            let config = MatchConfig {
                width,
                height,
                ..MatchConfig::default()
            };
            assert_eq!(
                GameState::blank(&config, 0).err(),
                Some(SetupError::InvalidDimensions { width, height })
            );
        }

        let config = MatchConfig {
            width: MAX_DIMENSION,
            height: 2,
            ..MatchConfig::default()
        };
        assert!(GameState::blank(&config, 0).is_ok());
    }

    #[test]
    fn test_reachable_soldier() {
        let mut game = blank_game();
        place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::B, 3, 2);

        let moves = reach(&game, 3, 3);
        assert_eq!(moves.len(), 3);
        assert!(!moves.contains(&Position::new(3, 3)));
        assert!(!moves.contains(&Position::new(3, 2)));
    }

    #[test]
    fn test_reachable_blocked_path() {
        let mut game = blank_game();
        place(&mut game, Archetype::Mounted, Faction::A, 0, 0);
        place(&mut game, Archetype::Melee, Faction::A, 1, 0);
        place(&mut game, Archetype::Melee, Faction::B, 0, 1);

        // boxed in by units on both exits
        assert!(reach(&game, 0, 0).is_empty());
    }

    #[test]
    fn test_knight_reach_and_forest_stop() {
        let mut game = blank_game();
        place(&mut game, Archetype::Mounted, Faction::A, 3, 3);
        assert_eq!(reach(&game, 3, 3).len(), 12);

        // forest on the only way east
        game.paint_terrain(Position::new(4, 3), Terrain::Forest).unwrap();
        place(&mut game, Archetype::Melee, Faction::A, 3, 2);
        place(&mut game, Archetype::Melee, Faction::A, 3, 4);
        place(&mut game, Archetype::Melee, Faction::A, 2, 3);

        let moves = reach(&game, 3, 3);
        assert_eq!(moves, FxHashSet::from_iter([Position::new(4, 3)]));
    }

    #[test]
    fn test_knight_starting_in_forest_moves_freely() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(3, 3), Terrain::Forest).unwrap();
        place(&mut game, Archetype::Mounted, Faction::A, 3, 3);
        assert!(reach(&game, 3, 3).contains(&Position::new(5, 3)));
    }

    #[test]
    fn test_knight_cannot_pass_through_forest() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(1, 0), Terrain::Forest).unwrap();
        let knight = place(&mut game, Archetype::Mounted, Faction::A, 0, 0);
        // (2,0) is two steps away only through the forest
        let unit = *game.unit(knight).unwrap();
        assert!(game.reachable_moves(&unit).contains(&Position::new(1, 1)));
        assert!(!game.reachable_moves(&unit).contains(&Position::new(2, 0)));
    }

    #[test]
    fn test_attack_targets_range() {
        let mut game = blank_game();
        place(&mut game, Archetype::Ranged, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::B, 3, 1);
        place(&mut game, Archetype::Melee, Faction::B, 4, 4);
        place(&mut game, Archetype::Melee, Faction::B, 6, 3);
        place(&mut game, Archetype::Melee, Faction::A, 2, 3);

        let archer = *game.unit_at(Position::new(3, 3)).unwrap();
        let targets = game.attack_targets(&archer);
        assert_eq!(
            targets,
            FxHashSet::from_iter([Position::new(3, 1), Position::new(4, 4)])
        );
    }

    #[test]
    fn test_archer_forest_cap() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(3, 1), Terrain::Forest).unwrap();
        game.paint_terrain(Position::new(4, 3), Terrain::Forest).unwrap();
        place(&mut game, Archetype::Ranged, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::B, 3, 1);
        place(&mut game, Archetype::Melee, Faction::B, 4, 3);

        let archer = *game.unit_at(Position::new(3, 3)).unwrap();
        let targets = game.attack_targets(&archer);
        assert!(!targets.contains(&Position::new(3, 1)));
        assert!(targets.contains(&Position::new(4, 3)));

        let err = game.attack(Position::new(3, 3), Position::new(3, 1)).unwrap_err();
        assert_eq!(err, ActionError::OutOfRange(Position::new(3, 1)));
    }

    #[test]
    fn test_knight_ignores_forest_cap() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(3, 1), Terrain::Forest).unwrap();
        place(&mut game, Archetype::Mounted, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::B, 3, 1);
        let knight = *game.unit_at(Position::new(3, 3)).unwrap();
        assert!(game.attack_targets(&knight).contains(&Position::new(3, 1)));
    }

    #[test]
    fn test_move_validation_order() {
        let mut game = blank_game();
        place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::B, 5, 5);
        place(&mut game, Archetype::Melee, Faction::A, 3, 4);

        let p = Position::new;
        assert_eq!(game.move_unit(p(3, 3), p(7, 3)), Err(ActionError::OutOfBounds));
        assert_eq!(game.move_unit(p(1, 1), p(1, 2)), Err(ActionError::NoUnitAtSource(p(1, 1))));
        assert_eq!(game.move_unit(p(5, 5), p(5, 4)), Err(ActionError::NotYourUnit(p(5, 5))));
        assert_eq!(game.move_unit(p(3, 3), p(3, 4)), Err(ActionError::DestinationOccupied(p(3, 4))));
        assert_eq!(game.move_unit(p(3, 3), p(3, 1)), Err(ActionError::Unreachable(p(3, 1))));

        assert_eq!(game.move_unit(p(3, 3), p(3, 2)), Ok(()));
        assert_eq!(game.move_unit(p(3, 2), p(3, 1)), Err(ActionError::AlreadyActed(p(3, 2))));
    }

    #[test]
    fn test_move_updates_board_and_unit() {
        let mut game = blank_game();
        let id = place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        game.move_unit(Position::new(3, 3), Position::new(4, 3)).unwrap();

        assert!(game.board()[Position::new(3, 3)].is_empty());
        assert_eq!(game.board()[Position::new(4, 3)].occupant, Some(id));
        let unit = game.unit(id).unwrap();
        assert_eq!(unit.pos, Position::new(4, 3));
        assert!(unit.has_acted);
    }

    #[test]
    fn test_move_captures_mine() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(4, 3), Terrain::Mine).unwrap();
        place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        game.move_unit(Position::new(3, 3), Position::new(4, 3)).unwrap();
        assert_eq!(game.board()[Position::new(4, 3)].owner, Some(Faction::A));

        // next A turn pays for the mine: 6 (start) + 6 + 4
        game.end_turn();
        game.end_turn();
        assert_eq!(game.player(Faction::A).resources, 16);
    }

    #[test]
    fn test_castle_capture_by_move() {
        let mut game = blank_game();
        place(&mut game, Archetype::Melee, Faction::A, 6, 1);
        game.move_unit(Position::new(6, 1), Position::new(6, 0)).unwrap();

        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.winner(), Some(Faction::A));
        assert_eq!(game.board()[Position::new(6, 0)].owner, Some(Faction::A));
    }

    #[test]
    fn test_own_castle_is_not_a_capture() {
        let mut game = blank_game();
        place(&mut game, Archetype::Melee, Faction::A, 0, 5);
        game.move_unit(Position::new(0, 5), Position::new(0, 6)).unwrap();
        assert_eq!(game.phase(), Phase::Running);
    }

    #[test]
    fn test_winning_attack_moves_in_and_captures() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(3, 2), Terrain::Temple).unwrap();
        game.paint_terrain(Position::new(0, 0), Terrain::Temple).unwrap();
        let knight = place(&mut game, Archetype::Mounted, Faction::A, 3, 3);
        let victim = place(&mut game, Archetype::Melee, Faction::B, 3, 2);

        // 12 + 6 > 9 + 1
        let outcome = game
            .attack_with(Position::new(3, 3), Position::new(3, 2), &mut LoadedDice(vec![6, 1]))
            .unwrap();
        assert!(outcome.attacker_wins);
        assert!(game.unit(victim).is_none());
        assert_eq!(game.unit(knight).unwrap().pos, Position::new(3, 2));
        assert!(game.board()[Position::new(3, 3)].is_empty());
        assert_eq!(game.board()[Position::new(3, 2)].owner, Some(Faction::A));
        assert_eq!(game.phase(), Phase::Running);
    }

    #[test]
    fn test_winning_attack_takes_last_temple() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(3, 2), Terrain::Temple).unwrap();
        place(&mut game, Archetype::Mounted, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::B, 3, 2);

        let outcome = game
            .attack_with(Position::new(3, 3), Position::new(3, 2), &mut LoadedDice(vec![6, 1]))
            .unwrap();
        assert!(outcome.attacker_wins);
        assert_eq!(game.board()[Position::new(3, 2)].owner, Some(Faction::A));
        assert_eq!(game.winner(), Some(Faction::A));
        assert_eq!(game.phase(), Phase::GameOver);
        assert_eq!(game.turn(), 1);
        assert_eq!(game.current_faction(), Faction::A);
    }

    #[test]
    fn test_lost_attack_leaves_temple_unclaimed() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(3, 2), Terrain::Temple).unwrap();
        place(&mut game, Archetype::Mounted, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::B, 3, 2);

        // 12 + 1 < 9 + 6
        let outcome = game
            .attack_with(Position::new(3, 3), Position::new(3, 2), &mut LoadedDice(vec![1, 6]))
            .unwrap();
        assert!(!outcome.attacker_wins);
        assert_eq!(game.board()[Position::new(3, 2)].owner, None);
        assert_eq!(game.phase(), Phase::Running);
    }

    #[test]
    fn test_end_turn_saturates_counters() {
        let mut game = blank_game();
        game.turn = u32::MAX;
        game.players[Faction::B.index()].resources = i32::MAX - 1;

        game.end_turn();
        assert_eq!(game.current_faction(), Faction::B);
        assert_eq!(game.turn(), u32::MAX);
        assert_eq!(game.player(Faction::B).resources, i32::MAX);
    }

    #[test]
    fn test_ranged_kill_also_moves_in() {
        let mut game = blank_game();
        let archer = place(&mut game, Archetype::Ranged, Faction::A, 3, 3);
        place(&mut game, Archetype::Ranged, Faction::B, 3, 1);

        let outcome = game
            .attack_with(Position::new(3, 3), Position::new(3, 1), &mut LoadedDice(vec![5, 2]))
            .unwrap();
        assert!(outcome.attacker_wins);
        assert_eq!(game.unit(archer).unwrap().pos, Position::new(3, 1));
    }

    #[test]
    fn test_tie_only_exhausts_attacker() {
        let mut game = blank_game();
        let attacker = place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        let defender = place(&mut game, Archetype::Melee, Faction::B, 3, 2);

        let outcome = game
            .attack_with(Position::new(3, 3), Position::new(3, 2), &mut LoadedDice(vec![3, 3]))
            .unwrap();
        assert!(!outcome.attacker_wins);
        assert_eq!(game.unit(attacker).unwrap().pos, Position::new(3, 3));
        assert!(game.unit(attacker).unwrap().has_acted);
        assert_eq!(game.unit(defender).unwrap().pos, Position::new(3, 2));

        // a lost attack still spends the action
        assert_eq!(
            game.move_unit(Position::new(3, 3), Position::new(2, 3)),
            Err(ActionError::AlreadyActed(Position::new(3, 3)))
        );
    }

    #[test]
    fn test_attack_validation() {
        let mut game = blank_game();
        place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::A, 3, 4);
        place(&mut game, Archetype::Melee, Faction::B, 3, 1);
        place(&mut game, Archetype::Melee, Faction::B, 5, 5);

        let p = Position::new;
        assert_eq!(game.attack(p(3, 3), p(3, 9)), Err(ActionError::OutOfBounds));
        assert_eq!(game.attack(p(0, 0), p(3, 1)), Err(ActionError::NoUnitAtSource(p(0, 0))));
        assert_eq!(game.attack(p(3, 3), p(2, 2)), Err(ActionError::NoDefender(p(2, 2))));
        assert_eq!(game.attack(p(5, 5), p(3, 3)), Err(ActionError::NotYourUnit(p(5, 5))));
        assert_eq!(game.attack(p(3, 3), p(3, 4)), Err(ActionError::OwnUnit(p(3, 4))));
        assert_eq!(game.attack(p(3, 3), p(3, 1)), Err(ActionError::OutOfRange(p(3, 1))));
        assert!(game.units().all(|u| !u.has_acted));
    }

    #[test]
    fn test_end_turn_resets_only_new_faction() {
        let mut game = blank_game();
        let a = place(&mut game, Archetype::Melee, Faction::A, 1, 1);
        let b = place(&mut game, Archetype::Melee, Faction::B, 5, 5);

        game.move_unit(Position::new(1, 1), Position::new(1, 2)).unwrap();
        game.end_turn();
        assert_eq!(game.current_faction(), Faction::B);
        assert_eq!(game.turn(), 2);
        assert!(game.unit(a).unwrap().has_acted);
        assert_eq!(game.player(Faction::B).resources, 6);

        game.move_unit(Position::new(5, 5), Position::new(5, 4)).unwrap();
        game.end_turn();
        assert_eq!(game.current_faction(), Faction::A);
        assert!(!game.unit(a).unwrap().has_acted);
        assert!(game.unit(b).unwrap().has_acted);
        assert_eq!(game.player(Faction::A).resources, 12);
    }

    #[test]
    fn test_temple_victory_on_move() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(3, 2), Terrain::Temple).unwrap();
        place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        game.move_unit(Position::new(3, 3), Position::new(3, 2)).unwrap();
        assert_eq!(game.winner(), Some(Faction::A));
        assert_eq!(game.turn(), 1);

        game.end_turn();
        assert_eq!(game.turn(), 1);
        assert_eq!(game.current_faction(), Faction::A);
    }

    #[test]
    fn test_partial_temples_do_not_win() {
        let mut game = blank_game();
        game.paint_terrain(Position::new(3, 2), Terrain::Temple).unwrap();
        game.paint_terrain(Position::new(0, 0), Terrain::Temple).unwrap();
        place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        game.move_unit(Position::new(3, 3), Position::new(3, 2)).unwrap();
        game.end_turn();
        assert_eq!(game.phase(), Phase::Running);
        assert_eq!(game.current_faction(), Faction::B);
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut game = blank_game();
        place(&mut game, Archetype::Melee, Faction::A, 6, 1);
        place(&mut game, Archetype::Melee, Faction::A, 2, 2);
        place(&mut game, Archetype::Melee, Faction::B, 2, 1);
        game.move_unit(Position::new(6, 1), Position::new(6, 0)).unwrap();

        let p = Position::new;
        assert_eq!(game.move_unit(p(2, 2), p(3, 2)), Err(ActionError::GameOver));
        assert_eq!(game.attack(p(2, 2), p(2, 1)), Err(ActionError::GameOver));
        assert_eq!(game.recruit(Archetype::Melee), Err(ActionError::GameOver));
        let resources = game.player(Faction::A).resources;
        game.end_turn();
        assert_eq!(game.turn(), 1);
        assert_eq!(game.player(Faction::A).resources, resources);
    }

    #[test]
    fn test_recruit() {
        let config = MatchConfig {
            starting_resources: 50,
            ..MatchConfig::default()
        };
        let mut game = GameState::blank(&config, 1).unwrap();
        // 50 + 6 income
        let id = game.recruit(Archetype::Ranged).unwrap();
        let unit = *game.unit(id).unwrap();
        // first free neighbour of (0,6) in left/right/up/down order
        assert_eq!(unit.pos, Position::new(1, 6));
        assert_eq!(unit.faction, Faction::A);
        assert!(!unit.has_acted);
        assert_eq!(game.player(Faction::A).resources, 26);

        assert_eq!(
            game.recruit(Archetype::Ranged),
            Err(ActionError::InsufficientResources { need: 30, have: 26 })
        );
        assert_eq!(game.player(Faction::A).resources, 26);

        let second = game.recruit(Archetype::Melee).unwrap();
        assert_eq!(game.unit(second).unwrap().pos, Position::new(0, 5));
        assert_eq!(game.recruit(Archetype::Melee), Err(ActionError::InsufficientResources { need: 20, have: 6 }));
    }

    #[test]
    fn test_recruit_no_free_tile() {
        let config = MatchConfig {
            starting_resources: 100,
            ..MatchConfig::default()
        };
        let mut game = GameState::blank(&config, 1).unwrap();
        place(&mut game, Archetype::Melee, Faction::B, 1, 6);
        place(&mut game, Archetype::Melee, Faction::B, 0, 5);
        assert_eq!(game.recruit(Archetype::Melee), Err(ActionError::NoFreeTile));
        assert_eq!(game.player(Faction::A).resources, 106);
    }

    #[test]
    fn test_recruit_unit_limit() {
        let config = MatchConfig {
            starting_resources: 100,
            max_units_per_faction: 2,
            ..MatchConfig::default()
        };
        let mut game = GameState::blank(&config, 1).unwrap();
        place(&mut game, Archetype::Melee, Faction::A, 3, 3);
        place(&mut game, Archetype::Melee, Faction::A, 4, 4);
        assert_eq!(game.recruit(Archetype::Melee), Err(ActionError::UnitLimit { limit: 2 }));
    }

    #[test]
    fn test_paint_terrain_rejects_castles() {
        let mut game = blank_game();
        assert_eq!(
            game.paint_terrain(Position::new(0, 6), Terrain::Forest),
            Err(SetupError::CastleTile(Position::new(0, 6)))
        );
        assert_eq!(
            game.paint_terrain(Position::new(3, 3), Terrain::Castle),
            Err(SetupError::CastleTile(Position::new(3, 3)))
        );
        assert_eq!(
            game.paint_terrain(Position::new(9, 9), Terrain::Forest),
            Err(SetupError::OutOfBounds(Position::new(9, 9)))
        );
    }

    #[test]
    fn test_internal_dice_are_seeded() {
        let setup = |seed| {
            let mut game = GameState::blank(&MatchConfig::default(), seed).unwrap();
            place(&mut game, Archetype::Melee, Faction::A, 3, 3);
            place(&mut game, Archetype::Melee, Faction::B, 3, 2);
            game
        };
        let first = setup(5).attack(Position::new(3, 3), Position::new(3, 2)).unwrap();
        let second = setup(5).attack(Position::new(3, 3), Position::new(3, 2)).unwrap();
        assert_eq!(first, second);
    }
}

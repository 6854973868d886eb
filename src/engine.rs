//! Core board model for the sphere-matching puzzle.
//!
//! This module defines the game's fundamental components:
//! - `TileType` / `TileState`: the colour of a sphere and its descriptive animation state.
//! - `GridPosition`: a (row, column) cell coordinate with adjacency helpers.
//! - `Tile`: one sphere with a stable identity.
//! - `Board`: the 8x8 grid, including gravity, refill and the no-initial-match population.
use crate::matching::find_all_matches;
use crate::powerups::PowerUpKind;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace, warn};

/// Defines the size of the game board (width and height).
/// The board is always square.
pub const BOARD_SIZE: usize = 8;

/// Number of sphere colours in the fixed catalogue.
pub const TILE_TYPE_COUNT: usize = 6;

/// Fewest colours a board may be played with. With three or more colours the
/// population repair pass can always find a colour that completes no match.
pub const MIN_TILE_TYPES: usize = 3;

/// Upper bound on repair passes during population. One pass is enough in
/// practice; the bound keeps the loop finite regardless.
const MAX_REPAIR_PASSES: usize = 10;

/// Clamps a requested colour count into `MIN_TILE_TYPES..=TILE_TYPE_COUNT`.
pub fn clamp_type_count(type_count: usize) -> usize {
    type_count.clamp(MIN_TILE_TYPES, TILE_TYPE_COUNT)
}

/// Represents the colour of a sphere.
///
/// The engine only ever compares types for equality; the colour is a display identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileType {
    Cyan,
    NeonGreen,
    Purple,
    Orange,
    Yellow,
    Pink,
}

impl TileType {
    /// Every colour in catalogue order. Levels with fewer colours use a prefix of this list.
    pub const ALL: [TileType; TILE_TYPE_COUNT] = [
        TileType::Cyan,
        TileType::NeonGreen,
        TileType::Purple,
        TileType::Orange,
        TileType::Yellow,
        TileType::Pink,
    ];

    /// Draws a colour uniformly from the first `type_count` catalogue entries
    /// (clamped to the valid range).
    pub fn random<R: Rng + ?Sized>(rng: &mut R, type_count: usize) -> TileType {
        TileType::ALL[rng.gen_range(0..clamp_type_count(type_count))]
    }

    /// Converts the tile to its character representation.
    ///
    /// # Examples
    ///
    /// ```
    /// use sphere_match::engine::TileType;
    /// assert_eq!(TileType::Cyan.to_char(), 'C');
    /// assert_eq!(TileType::Pink.to_char(), 'K');
    /// ```
    pub fn to_char(self) -> char {
        match self {
            TileType::Cyan => 'C',
            TileType::NeonGreen => 'G',
            TileType::Purple => 'P',
            TileType::Orange => 'O',
            TileType::Yellow => 'Y',
            TileType::Pink => 'K',
        }
    }

    /// Inverse of [`TileType::to_char`].
    pub fn from_char(ch: char) -> Option<TileType> {
        TileType::ALL.into_iter().find(|t| t.to_char() == ch)
    }

    pub fn name(self) -> &'static str {
        match self {
            TileType::Cyan => "Cyan",
            TileType::NeonGreen => "Neon Green",
            TileType::Purple => "Purple",
            TileType::Orange => "Orange",
            TileType::Yellow => "Yellow",
            TileType::Pink => "Pink",
        }
    }

    /// Returns the ANSI background colour code for terminal output.
    fn to_ansi_color_code(self) -> &'static str {
        match self {
            TileType::Cyan => "46",
            TileType::NeonGreen => "42",
            TileType::Purple => "45",
            TileType::Orange => "48;5;208",
            TileType::Yellow => "43",
            TileType::Pink => "48;5;205",
        }
    }
}

/// Descriptive state for presentation layers. Matching never looks at it.
///
/// Cleared tiles are removed from the board and reported through the cascade waves, so the
/// engine never sets `Matched` or `Exploding`; `Transforming` marks recoloured tiles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileState {
    #[default]
    Normal,
    Highlighted,
    Matched,
    Transforming,
    Exploding,
    Frozen,
    Charged,
}

/// A cell coordinate. Valid when both components are below `BOARD_SIZE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: usize,
    pub column: usize,
}

impl GridPosition {
    pub const fn new(row: usize, column: usize) -> Self {
        GridPosition { row, column }
    }

    /// Manhattan distance between two cells.
    pub fn distance(&self, other: GridPosition) -> usize {
        self.row.abs_diff(other.row) + self.column.abs_diff(other.column)
    }

    pub fn is_adjacent(&self, other: GridPosition) -> bool {
        self.distance(other) == 1
    }

    pub fn is_valid(&self) -> bool {
        self.row < BOARD_SIZE && self.column < BOARD_SIZE
    }

    /// The four axis-aligned neighbours in up, down, left, right order,
    /// filtered to cells on the board.
    ///
    /// ```
    /// use sphere_match::engine::GridPosition;
    /// let corner = GridPosition::new(0, 0);
    /// assert_eq!(corner.neighbors(), vec![GridPosition::new(1, 0), GridPosition::new(0, 1)]);
    /// ```
    pub fn neighbors(&self) -> Vec<GridPosition> {
        let candidates = [
            self.row.checked_sub(1).map(|r| GridPosition::new(r, self.column)),
            Some(GridPosition::new(self.row + 1, self.column)),
            self.column.checked_sub(1).map(|c| GridPosition::new(self.row, c)),
            Some(GridPosition::new(self.row, self.column + 1)),
        ];
        candidates
            .into_iter()
            .flatten()
            .filter(|p| p.is_valid())
            .collect()
    }
}

impl fmt::Display for GridPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Iterates every cell of the board in row-major order.
pub fn all_positions() -> impl Iterator<Item = GridPosition> {
    (0..BOARD_SIZE).flat_map(|r| (0..BOARD_SIZE).map(move |c| GridPosition::new(r, c)))
}

/// A single sphere.
///
/// `position` always equals the cell holding the tile; [`Board::set`] rewrites it on placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    pub id: u64,
    pub position: GridPosition,
    pub tile_type: TileType,
    pub state: TileState,
    /// A power-up carried by the tile. The engine leaves it `None`; power-ups spawn into the
    /// session inventory instead.
    pub power_up: Option<PowerUpKind>,
}

/// One tile falling from `from` to `to` during gravity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TileMovement {
    pub tile_id: u64,
    pub from: GridPosition,
    pub to: GridPosition,
}

/// Represents the game board as a 2D grid of optional tiles.
///
/// The board also allocates tile identities, so every tile it creates gets an id that is
/// unique for the board's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    grid: [[Option<Tile>; BOARD_SIZE]; BOARD_SIZE],
    next_id: u64,
}

impl Board {
    /// Creates a new board with every cell empty.
    ///
    /// # Examples
    /// ```
    /// use sphere_match::engine::{Board, GridPosition};
    /// let board = Board::new_empty();
    /// assert!(board.get(GridPosition::new(0, 0)).is_none());
    /// ```
    pub fn new_empty() -> Self {
        Board {
            grid: [[None; BOARD_SIZE]; BOARD_SIZE],
            next_id: 0,
        }
    }

    /// Creates a board from a grid of colours, assigning ids in row-major order.
    pub fn from_types(types: [[Option<TileType>; BOARD_SIZE]; BOARD_SIZE]) -> Self {
        let mut board = Board::new_empty();
        for pos in all_positions() {
            if let Some(tile_type) = types[pos.row][pos.column] {
                board.spawn(pos, tile_type);
            }
        }
        board
    }

    /// Creates a full board of uniformly random colours that contains no match.
    ///
    /// The random fill is followed by a bounded repair loop: each pass walks the board in
    /// row-major order and recolours any sphere that completes a run or square with the
    /// spheres already visited (left, above).
    ///
    /// # Arguments
    /// * `rng`: The injected random source.
    /// * `type_count`: How many catalogue colours are in play (clamped to `3..=6`).
    pub fn new_populated<R: Rng + ?Sized>(rng: &mut R, type_count: usize) -> Self {
        let mut board = Board::new_empty();
        for pos in all_positions() {
            board.spawn(pos, TileType::random(rng, type_count));
        }

        for pass in 0..MAX_REPAIR_PASSES {
            if find_all_matches(&board).is_empty() {
                debug!(pass, "populated board without initial matches");
                return board;
            }
            let repaired = board.repair_pass(rng, type_count);
            trace!(pass, repaired, "repair pass");
        }
        if !find_all_matches(&board).is_empty() {
            warn!("board still has matches after {} repair passes", MAX_REPAIR_PASSES);
        }
        board
    }

    /// Returns the tile at `pos`.
    ///
    /// # Panics
    /// Panics if `pos` is outside the board. Callers validate with [`Board::is_valid`] first.
    pub fn get(&self, pos: GridPosition) -> Option<Tile> {
        self.grid[pos.row][pos.column]
    }

    /// Places `tile` at `pos` (or clears the cell), rewriting the tile's position to `pos`.
    ///
    /// # Panics
    /// Panics if `pos` is outside the board.
    pub fn set(&mut self, pos: GridPosition, tile: Option<Tile>) {
        self.grid[pos.row][pos.column] = tile.map(|mut t| {
            t.position = pos;
            t
        });
    }

    pub fn is_valid(&self, pos: GridPosition) -> bool {
        pos.is_valid()
    }

    /// Colour at `pos`, or `None` for an empty cell.
    pub fn tile_type(&self, pos: GridPosition) -> Option<TileType> {
        self.get(pos).map(|t| t.tile_type)
    }

    /// Clears the cell and returns what it held.
    pub fn remove(&mut self, pos: GridPosition) -> Option<Tile> {
        self.grid[pos.row][pos.column].take()
    }

    /// Exchanges the contents of two cells, keeping both positions in sync.
    pub fn swap(&mut self, a: GridPosition, b: GridPosition) {
        let first = self.get(a);
        let second = self.get(b);
        self.set(a, second);
        self.set(b, first);
    }

    /// Creates a new tile with a fresh id at `pos`, replacing whatever was there.
    pub fn spawn(&mut self, pos: GridPosition, tile_type: TileType) -> Tile {
        let tile = Tile {
            id: self.next_id,
            position: pos,
            tile_type,
            state: TileState::Normal,
            power_up: None,
        };
        self.next_id += 1;
        self.set(pos, Some(tile));
        tile
    }

    /// Updates the descriptive state of the tile at `pos`, if any.
    pub fn set_state(&mut self, pos: GridPosition, state: TileState) {
        if let Some(tile) = self.grid[pos.row][pos.column].as_mut() {
            tile.state = state;
        }
    }

    pub fn occupied_count(&self) -> usize {
        all_positions().filter(|&p| self.get(p).is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.occupied_count() == BOARD_SIZE * BOARD_SIZE
    }

    /// Iterates over every tile on the board in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        all_positions().filter_map(move |p| self.get(p))
    }

    /// Occupied cells within Chebyshev distance `radius` of `center`, clipped to the board,
    /// in row-major order. Empty when `center` is off the board.
    pub fn find_in_range(&self, center: GridPosition, radius: usize) -> Vec<GridPosition> {
        if !center.is_valid() {
            return Vec::new();
        }
        let rows = center.row.saturating_sub(radius)..=(center.row + radius).min(BOARD_SIZE - 1);
        let cols =
            center.column.saturating_sub(radius)..=(center.column + radius).min(BOARD_SIZE - 1);
        rows.flat_map(|r| cols.clone().map(move |c| GridPosition::new(r, c)))
            .filter(|&p| self.get(p).is_some())
            .collect()
    }

    /// Compacts every column toward the bottom (highest row index).
    ///
    /// Tiles keep their relative order within a column. A movement is recorded for every
    /// tile whose row changes; cells vacated at the top become empty.
    ///
    /// # Returns
    /// The movements, grouped by column from left to right, bottom-most tile first.
    pub fn apply_gravity(&mut self) -> Vec<TileMovement> {
        let mut movements = Vec::new();
        for c in 0..BOARD_SIZE {
            // Rows at and below `write_row` are already settled.
            let mut write_row = BOARD_SIZE;
            for r in (0..BOARD_SIZE).rev() {
                if let Some(tile) = self.grid[r][c] {
                    write_row -= 1;
                    if r != write_row {
                        let from = GridPosition::new(r, c);
                        let to = GridPosition::new(write_row, c);
                        self.grid[r][c] = None;
                        self.set(to, Some(tile));
                        movements.push(TileMovement {
                            tile_id: tile.id,
                            from,
                            to,
                        });
                    }
                }
            }
        }
        movements
    }

    /// Fills every empty cell, in row-major order, with a new tile of a uniformly random
    /// colour drawn from the first `type_count` catalogue colours.
    ///
    /// # Returns
    /// The tiles created, in the order they were placed.
    pub fn refill<R: Rng + ?Sized>(&mut self, rng: &mut R, type_count: usize) -> Vec<Tile> {
        let mut created = Vec::new();
        for pos in all_positions() {
            if self.get(pos).is_none() {
                created.push(self.spawn(pos, TileType::random(rng, type_count)));
            }
        }
        created
    }

    /// Recolours every sphere that completes a match with the cells already visited.
    /// Returns how many spheres were recoloured.
    fn repair_pass<R: Rng + ?Sized>(&mut self, rng: &mut R, type_count: usize) -> usize {
        let palette = &TileType::ALL[..clamp_type_count(type_count)];
        let mut repaired = 0;
        for pos in all_positions() {
            let Some(current) = self.tile_type(pos) else {
                continue;
            };
            if !self.completes_match_behind(pos, current) {
                continue;
            }
            let allowed: Vec<TileType> = palette
                .iter()
                .copied()
                .filter(|&t| !self.completes_match_behind(pos, t))
                .collect();
            if let Some(&replacement) = allowed.choose(rng) {
                if let Some(tile) = self.grid[pos.row][pos.column].as_mut() {
                    tile.tile_type = replacement;
                }
                repaired += 1;
            }
        }
        repaired
    }

    /// Whether colour `t` at `pos` would finish a three-run to the left, a three-run above,
    /// or a square with the up-left block.
    fn completes_match_behind(&self, pos: GridPosition, t: TileType) -> bool {
        let same = |row: Option<usize>, col: Option<usize>| match (row, col) {
            (Some(r), Some(c)) => self.tile_type(GridPosition::new(r, c)) == Some(t),
            _ => false,
        };
        let (r, c) = (pos.row, pos.column);
        let left_run = same(Some(r), c.checked_sub(1)) && same(Some(r), c.checked_sub(2));
        let up_run = same(r.checked_sub(1), Some(c)) && same(r.checked_sub(2), Some(c));
        let square = same(r.checked_sub(1), Some(c))
            && same(Some(r), c.checked_sub(1))
            && same(r.checked_sub(1), c.checked_sub(1));
        left_run || up_run || square
    }

    /// Generates a string representation of the board with an optional highlighted position.
    ///
    /// The output includes row and column numbers and uses ANSI escape codes for tile colours.
    /// Each sphere shows its colour letter; the highlighted sphere is marked with `*`.
    pub fn to_string_with_highlight(&self, highlight: Option<GridPosition>) -> String {
        let mut output = String::new();

        output.push_str("  ");
        for c_idx in 0..BOARD_SIZE {
            output.push_str(&format!("{:<2}", c_idx));
        }
        output.push('\n');

        for r_idx in 0..BOARD_SIZE {
            output.push_str(&format!("{:<2}", r_idx));

            for c_idx in 0..BOARD_SIZE {
                let pos = GridPosition::new(r_idx, c_idx);
                match self.get(pos) {
                    Some(tile) => {
                        let marker = if highlight == Some(pos) { '*' } else { ' ' };
                        output.push_str(&format!(
                            "\x1b[1;{}m{}{}\x1b[m",
                            tile.tile_type.to_ansi_color_code(),
                            tile.tile_type.to_char(),
                            marker
                        ));
                    }
                    None => output.push_str("\x1b[1;40m  \x1b[m"),
                }
            }
            if r_idx < BOARD_SIZE - 1 {
                output.push('\n');
            }
        }

        output
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new_empty()
    }
}

impl fmt::Display for Board {
    /// Formats the board for display using `to_string_with_highlight(None)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_highlight(None))
    }
}

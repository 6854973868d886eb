//! Match detection: straight runs and geometric shape templates.
//!
//! A detection pass scans rows, then columns, then every cell as the anchor of the shape
//! templates, and finally drops groups whose position sets duplicate an earlier group.

use crate::engine::{all_positions, Board, GridPosition, TileType, BOARD_SIZE};
use crate::scoring::group_score;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Shortest straight run that counts as a match.
pub const MIN_RUN_LENGTH: usize = 3;

/// Row/column offsets from the top-left corner of a 3x3 box.
type Template = [(usize, usize); 5];

/// The four rotations of a corner made of two three-long arms.
const L_SHAPES: [Template; 4] = [
    [(0, 0), (0, 1), (0, 2), (1, 0), (2, 0)],
    [(0, 0), (0, 1), (0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 0), (2, 0), (2, 1), (2, 2)],
    [(0, 2), (1, 2), (2, 2), (2, 1), (2, 0)],
];

/// A three-long bar with a two-long stem from its middle: bar on top, then bar on bottom.
const T_SHAPES: [Template; 2] = [
    [(0, 0), (0, 1), (0, 2), (1, 1), (2, 1)],
    [(2, 0), (2, 1), (2, 2), (1, 1), (0, 1)],
];

const CROSS: Template = [(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)];

const SQUARE: [(usize, usize); 4] = [(0, 0), (0, 1), (1, 0), (1, 1)];

/// The shape category of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPattern {
    Horizontal,
    Vertical,
    LShape,
    TShape,
    Square,
    Cross,
}

impl MatchPattern {
    /// Multiplier applied to `positions * score unit` for a group of this shape.
    pub fn score_multiplier(self) -> f64 {
        match self {
            MatchPattern::Horizontal | MatchPattern::Vertical => 1.0,
            MatchPattern::LShape | MatchPattern::TShape => 1.5,
            MatchPattern::Square => 2.0,
            MatchPattern::Cross => 2.5,
        }
    }

    /// Flat bonus for matching this named pattern, added once per group in a wave.
    pub fn bonus_points(self) -> u32 {
        match self {
            MatchPattern::Horizontal | MatchPattern::Vertical => 150,
            MatchPattern::LShape | MatchPattern::TShape => 200,
            MatchPattern::Square => 250,
            MatchPattern::Cross => 300,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MatchPattern::Horizontal => "Horizontal Line",
            MatchPattern::Vertical => "Vertical Line",
            MatchPattern::LShape => "L-Shape",
            MatchPattern::TShape => "T-Shape",
            MatchPattern::Square => "Square",
            MatchPattern::Cross => "Cross",
        }
    }

    pub fn is_line(self) -> bool {
        matches!(self, MatchPattern::Horizontal | MatchPattern::Vertical)
    }
}

/// One matched group. Produced fresh by every detection pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatchGroup {
    pub positions: Vec<GridPosition>,
    pub tile_type: TileType,
    pub pattern: MatchPattern,
    pub score: u32,
}

impl MatchGroup {
    pub fn new(positions: Vec<GridPosition>, tile_type: TileType, pattern: MatchPattern) -> Self {
        let score = group_score(positions.len(), pattern);
        MatchGroup {
            positions,
            tile_type,
            pattern,
            score,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn contains(&self, pos: GridPosition) -> bool {
        self.positions.contains(&pos)
    }

    /// The group's positions as an unordered set.
    pub fn position_set(&self) -> BTreeSet<GridPosition> {
        self.positions.iter().copied().collect()
    }
}

/// Finds every match on the board.
///
/// Runs come first (rows left to right, then columns top to bottom), followed by shapes in
/// the order L, T, cross, square, each scanned with anchors in row-major order. Only the
/// first L and the first T template that fits an anchor are reported for it. Groups with
/// the same position set as an earlier group are dropped, so a shape never double-scores a
/// run with the same cells; overlapping groups with different cells are all kept.
///
/// # Examples
/// ```
/// use sphere_match::matching::{find_all_matches, MatchPattern};
/// use sphere_match::utils::board_from_str_array;
///
/// let board = board_from_str_array(&["CCCP"]).unwrap();
/// let groups = find_all_matches(&board);
/// assert_eq!(groups.len(), 1);
/// assert_eq!(groups[0].pattern, MatchPattern::Horizontal);
/// assert_eq!(groups[0].score, 300);
/// ```
pub fn find_all_matches(board: &Board) -> Vec<MatchGroup> {
    let mut groups = Vec::new();

    for r in 0..BOARD_SIZE {
        let line: Vec<GridPosition> = (0..BOARD_SIZE).map(|c| GridPosition::new(r, c)).collect();
        collect_runs(board, &line, MatchPattern::Horizontal, &mut groups);
    }
    for c in 0..BOARD_SIZE {
        let line: Vec<GridPosition> = (0..BOARD_SIZE).map(|r| GridPosition::new(r, c)).collect();
        collect_runs(board, &line, MatchPattern::Vertical, &mut groups);
    }

    for anchor in all_positions() {
        if let Some(group) = L_SHAPES
            .iter()
            .find_map(|t| match_template(board, anchor, t, MatchPattern::LShape))
        {
            groups.push(group);
        }
    }
    for anchor in all_positions() {
        if let Some(group) = T_SHAPES
            .iter()
            .find_map(|t| match_template(board, anchor, t, MatchPattern::TShape))
        {
            groups.push(group);
        }
    }
    for anchor in all_positions() {
        if let Some(group) = match_template(board, anchor, &CROSS, MatchPattern::Cross) {
            groups.push(group);
        }
    }
    for anchor in all_positions() {
        if let Some(group) = match_template(board, anchor, &SQUARE, MatchPattern::Square) {
            groups.push(group);
        }
    }

    remove_duplicate_groups(groups)
}

/// Union of every position in `groups`, sorted row-major.
pub fn matched_positions(groups: &[MatchGroup]) -> Vec<GridPosition> {
    groups
        .iter()
        .flat_map(|g| g.positions.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Emits a group for every run of at least `MIN_RUN_LENGTH` equal colours along `line`.
fn collect_runs(
    board: &Board,
    line: &[GridPosition],
    pattern: MatchPattern,
    groups: &mut Vec<MatchGroup>,
) {
    let mut run: Vec<GridPosition> = Vec::new();
    let mut run_type: Option<TileType> = None;

    for &pos in line {
        let tile_type = board.tile_type(pos);
        if tile_type.is_some() && tile_type == run_type {
            run.push(pos);
            continue;
        }
        flush_run(&run, run_type, pattern, groups);
        run.clear();
        run_type = tile_type;
        if tile_type.is_some() {
            run.push(pos);
        }
    }
    flush_run(&run, run_type, pattern, groups);
}

fn flush_run(
    run: &[GridPosition],
    run_type: Option<TileType>,
    pattern: MatchPattern,
    groups: &mut Vec<MatchGroup>,
) {
    if run.len() < MIN_RUN_LENGTH {
        return;
    }
    if let Some(tile_type) = run_type {
        groups.push(MatchGroup::new(run.to_vec(), tile_type, pattern));
    }
}

/// Tests one template at `anchor`: every offset cell must be on the board, occupied, and
/// share the colour of the template's first cell.
///
/// The anchor cell itself is only checked when it is part of the template, so a shape is
/// matched by its own cells rather than by the anchor's colour.
fn match_template(
    board: &Board,
    anchor: GridPosition,
    offsets: &[(usize, usize)],
    pattern: MatchPattern,
) -> Option<MatchGroup> {
    let mut positions = Vec::with_capacity(offsets.len());
    let mut shared: Option<TileType> = None;

    for &(dr, dc) in offsets {
        let pos = GridPosition::new(anchor.row + dr, anchor.column + dc);
        if !pos.is_valid() {
            return None;
        }
        let tile_type = board.tile_type(pos)?;
        match shared {
            None => shared = Some(tile_type),
            Some(t) if t != tile_type => return None,
            Some(_) => {}
        }
        positions.push(pos);
    }

    shared.map(|t| MatchGroup::new(positions, t, pattern))
}

fn remove_duplicate_groups(groups: Vec<MatchGroup>) -> Vec<MatchGroup> {
    let mut seen: HashSet<BTreeSet<GridPosition>> = HashSet::new();
    groups
        .into_iter()
        .filter(|g| seen.insert(g.position_set()))
        .collect()
}

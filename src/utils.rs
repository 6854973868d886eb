use crate::engine::{Board, GridPosition, TileType, BOARD_SIZE};
use crate::error::ParseError;

/// Colour index `(2r + c) % 6`: contains no match and no swap can create one.
#[cfg(test)]
pub(crate) const STABLE_ROWS: [&str; BOARD_SIZE] = [
    "CGPOYKCG", //
    "POYKCGPO", //
    "YKCGPOYK", //
    "CGPOYKCG", //
    "POYKCGPO", //
    "YKCGPOYK", //
    "CGPOYKCG", //
    "POYKCGPO", //
];

/// Checks that every tile records the cell that holds it.
#[cfg(test)]
pub(crate) fn assert_positions_consistent(board: &Board) {
    for pos in crate::engine::all_positions() {
        if let Some(tile) = board.get(pos) {
            assert_eq!(tile.position, pos, "tile {} is out of sync", tile.id);
        }
    }
}

/// Parses an array of string slices into a `Board`.
///
/// Each string slice is a row, starting from row 0 at the top. Missing rows and the missing
/// tail of a short row are empty cells. Tile ids are assigned in row-major order.
///
/// Valid characters:
/// - 'C': `TileType::Cyan`
/// - 'G': `TileType::NeonGreen`
/// - 'P': `TileType::Purple`
/// - 'O': `TileType::Orange`
/// - 'Y': `TileType::Yellow`
/// - 'K': `TileType::Pink`
/// - '.': empty cell
///
/// # Arguments
/// * `s`: The rows of the board, top first.
///
/// # Returns
/// * `Ok(Board)` if parsing succeeds.
/// * `Err(ParseError)` if there are more than `BOARD_SIZE` rows, a row is longer than
///   `BOARD_SIZE` characters, or a character is not one of the above.
///
/// # Examples
/// ```
/// use sphere_match::engine::{GridPosition, TileType, BOARD_SIZE};
/// use sphere_match::utils::board_from_str_array;
///
/// let board = board_from_str_array(&["CGY", "K.P"]).unwrap();
/// assert_eq!(board.tile_type(GridPosition::new(0, 0)), Some(TileType::Cyan));
/// assert_eq!(board.tile_type(GridPosition::new(0, 2)), Some(TileType::Yellow));
/// assert_eq!(board.tile_type(GridPosition::new(1, 1)), None);
/// assert_eq!(board.tile_type(GridPosition::new(2, 0)), None);
///
/// assert!(board_from_str_array(&["CXG"]).is_err());
/// let too_many_rows = vec!["C"; BOARD_SIZE + 1];
/// assert!(board_from_str_array(&too_many_rows).is_err());
/// ```
pub fn board_from_str_array(s: &[&str]) -> Result<Board, ParseError> {
    if s.len() > BOARD_SIZE {
        return Err(ParseError::TooManyRows {
            expected: BOARD_SIZE,
            found: s.len(),
        });
    }

    let mut grid = [[None; BOARD_SIZE]; BOARD_SIZE];

    for (r, row_str) in s.iter().enumerate() {
        let len = row_str.chars().count();
        if len > BOARD_SIZE {
            return Err(ParseError::RowTooLong {
                row: r,
                expected: BOARD_SIZE,
                found: len,
            });
        }

        for (c, ch) in row_str.chars().enumerate() {
            grid[r][c] = match ch {
                '.' => None,
                _ => Some(
                    TileType::from_char(ch).ok_or(ParseError::UnknownTile { ch, row: r, col: c })?,
                ),
            };
        }
    }
    Ok(Board::from_types(grid))
}

/// Parses a board from text with one row per line.
///
/// Surrounding whitespace on each line is ignored, as are blank lines and lines starting with
/// `#`.
pub fn board_from_text(text: &str) -> Result<Board, ParseError> {
    let rows: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect();
    board_from_str_array(&rows)
}

/// Writes a board in the format read by [`board_from_text`].
pub fn board_to_text(board: &Board) -> String {
    (0..BOARD_SIZE)
        .map(|r| {
            (0..BOARD_SIZE)
                .map(|c| {
                    board
                        .tile_type(GridPosition::new(r, c))
                        .map_or('.', TileType::to_char)
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

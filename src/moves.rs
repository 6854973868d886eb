//! Swap legality.
//!
//! A swap is legal when both cells are on the board, adjacent, occupied, and exchanging them
//! produces at least one match. Validation works on a scratch copy; the caller's board is
//! never modified.

use crate::engine::{Board, GridPosition};
use crate::error::MoveRejection;
use crate::matching::{find_all_matches, MatchGroup};

/// Checks a swap and reports why it is refused.
///
/// # Arguments
/// * `board`: The board to check against. It is not modified.
/// * `from`, `to`: The two cells to exchange.
///
/// # Returns
/// `Ok(())` for a legal swap, otherwise the first failed condition in the order bounds,
/// adjacency, occupancy, match.
///
/// # Examples
/// ```
/// use sphere_match::engine::GridPosition;
/// use sphere_match::error::MoveRejection;
/// use sphere_match::moves::check_move;
/// use sphere_match::utils::board_from_str_array;
///
/// let board = board_from_str_array(&["CCGC", "PYOK"]).unwrap();
/// let (a, b) = (GridPosition::new(0, 2), GridPosition::new(0, 3));
/// assert_eq!(check_move(&board, a, b), Ok(()));
/// assert_eq!(
///     check_move(&board, a, GridPosition::new(1, 3)),
///     Err(MoveRejection::NotAdjacent { from: a, to: GridPosition::new(1, 3) })
/// );
/// ```
pub fn check_move(
    board: &Board,
    from: GridPosition,
    to: GridPosition,
) -> Result<(), MoveRejection> {
    for pos in [from, to] {
        if !board.is_valid(pos) {
            return Err(MoveRejection::OutOfBounds(pos));
        }
    }
    if !from.is_adjacent(to) {
        return Err(MoveRejection::NotAdjacent { from, to });
    }
    for pos in [from, to] {
        if board.get(pos).is_none() {
            return Err(MoveRejection::EmptyCell(pos));
        }
    }
    if matches_after_swap(board, from, to).is_empty() {
        return Err(MoveRejection::NoMatch { from, to });
    }
    Ok(())
}

/// Whether swapping `from` and `to` is legal.
pub fn is_legal(board: &Board, from: GridPosition, to: GridPosition) -> bool {
    check_move(board, from, to).is_ok()
}

/// A copy of `board` with the two cells exchanged.
///
/// # Panics
/// Panics if either position is outside the board.
pub fn swapped_copy(board: &Board, from: GridPosition, to: GridPosition) -> Board {
    let mut scratch = board.clone();
    scratch.swap(from, to);
    scratch
}

/// The groups that would exist after swapping `from` and `to`.
///
/// # Panics
/// Panics if either position is outside the board.
pub fn matches_after_swap(
    board: &Board,
    from: GridPosition,
    to: GridPosition,
) -> Vec<MatchGroup> {
    find_all_matches(&swapped_copy(board, from, to))
}

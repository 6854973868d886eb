//! Hint search over every legal swap.

use crate::engine::{all_positions, Board, GridPosition};
use crate::matching::find_all_matches;
use crate::moves::swapped_copy;
use crate::scoring::potential_score;
use serde::Serialize;
use std::collections::HashSet;

/// A legal swap together with what it would immediately match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PossibleMove {
    pub from: GridPosition,
    pub to: GridPosition,
    /// Base plus combo points at combo 1 (no pattern bonus).
    pub potential_score: u32,
    /// Number of groups the swap would form.
    pub match_count: usize,
}

/// Lists every legal swap, best first.
///
/// Occupied cells are visited in row-major order and each is paired with its neighbours in
/// up, down, left, right order. A swap and its mirror are one move, recorded at the first
/// encounter. The result is stably sorted by `potential_score`, highest first, so ties keep
/// scan order.
///
/// # Arguments
/// * `board`: The board to search. It is not modified.
///
/// # Returns
/// The candidate moves; empty when the board has no legal swap.
pub fn find_possible_moves(board: &Board) -> Vec<PossibleMove> {
    let mut seen: HashSet<(GridPosition, GridPosition)> = HashSet::new();
    let mut moves = Vec::new();

    for from in all_positions() {
        if board.get(from).is_none() {
            continue;
        }
        for to in from.neighbors() {
            if board.get(to).is_none() {
                continue;
            }
            let key = if from < to { (from, to) } else { (to, from) };
            if !seen.insert(key) {
                continue;
            }
            let groups = find_all_matches(&swapped_copy(board, from, to));
            if groups.is_empty() {
                continue;
            }
            moves.push(PossibleMove {
                from,
                to,
                potential_score: potential_score(&groups, 1),
                match_count: groups.len(),
            });
        }
    }

    moves.sort_by(|a, b| b.potential_score.cmp(&a.potential_score));
    moves
}

/// The highest-ranked move, or `None` when no swap produces a match.
///
/// # Examples
/// ```
/// use sphere_match::engine::GridPosition;
/// use sphere_match::hints::best_move;
/// use sphere_match::utils::board_from_str_array;
///
/// let board = board_from_str_array(&["CCGC", "PYOK"]).unwrap();
/// let hint = best_move(&board).unwrap();
/// assert_eq!((hint.from, hint.to), (GridPosition::new(0, 2), GridPosition::new(0, 3)));
/// assert_eq!(hint.potential_score, 300);
/// ```
pub fn best_move(board: &Board) -> Option<PossibleMove> {
    find_possible_moves(board).into_iter().next()
}

/// Whether any swap on the board produces a match.
pub fn has_legal_moves(board: &Board) -> bool {
    !find_possible_moves(board).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::is_legal;
    use crate::utils::{board_from_str_array, STABLE_ROWS};

    fn pos(r: usize, c: usize) -> GridPosition {
        GridPosition::new(r, c)
    }

    #[test]
    fn test_single_legal_move_is_best() {
        let mut rows = STABLE_ROWS;
        rows[0] = "CCGCYKCG";
        let board = board_from_str_array(&rows).unwrap();

        let moves = find_possible_moves(&board);
        assert_eq!(
            moves,
            vec![PossibleMove {
                from: pos(0, 2),
                to: pos(0, 3),
                potential_score: 300,
                match_count: 1,
            }]
        );
        assert_eq!(best_move(&board), Some(moves[0]));
        assert!(has_legal_moves(&board));
    }

    #[test]
    fn test_exhausted_board_has_no_hint() {
        let board = board_from_str_array(&STABLE_ROWS).unwrap();
        assert!(find_possible_moves(&board).is_empty());
        assert_eq!(best_move(&board), None);
        assert!(!has_legal_moves(&board));
    }

    #[test]
    fn test_mirror_swaps_recorded_once() {
        let board = board_from_str_array(&["CCGC", "PYOK"]).unwrap();
        let moves = find_possible_moves(&board);
        let pairs: HashSet<(GridPosition, GridPosition)> = moves
            .iter()
            .map(|m| if m.from < m.to { (m.from, m.to) } else { (m.to, m.from) })
            .collect();
        assert_eq!(pairs.len(), moves.len());
    }

    #[test]
    fn test_moves_sorted_by_score_and_all_legal() {
        let board = board_from_str_array(&[
            "CCGCPPKP", //
            "YOKYOYGO", //
            "GKOGKGOK", //
        ])
        .unwrap();
        let moves = find_possible_moves(&board);
        assert!(moves.len() >= 2);
        assert!(moves
            .windows(2)
            .all(|w| w[0].potential_score >= w[1].potential_score));
        assert!(moves.iter().all(|m| is_legal(&board, m.from, m.to)));
        assert!(moves.iter().all(|m| m.match_count >= 1));
    }

    #[test]
    fn test_ties_keep_scan_order() {
        let board = board_from_str_array(&["CCGC....", "........", "........", "PPKP"]).unwrap();
        let moves = find_possible_moves(&board);
        assert_eq!(moves.len(), 2);
        assert_eq!(moves[0].from, pos(0, 2));
        assert_eq!(moves[1].from, pos(3, 2));
    }
}

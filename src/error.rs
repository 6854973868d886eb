//! Error types shared across the engine.
//!
//! Nothing in the board simulation is fatal: illegal input is reported as a
//! [`MoveRejection`] value rather than a panic, and only the text board
//! parser returns a hard [`ParseError`].

use crate::engine::GridPosition;
use crate::session::SessionState;
use serde::Serialize;
use thiserror::Error;

/// Failure to read a board from its text representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid number of rows: expected at most {expected}, found {found}")]
    TooManyRows { expected: usize, found: usize },
    #[error("row {row} is too long: expected at most {expected} characters, found {found}")]
    RowTooLong {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unrecognized character '{ch}' in row {row} col {col}")]
    UnknownTile { ch: char, row: usize, col: usize },
}

/// Why a swap was refused. The board is untouched whenever one of these is
/// returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveRejection {
    #[error("session is {0:?}, moves are only accepted while playing")]
    NotPlaying(SessionState),
    #[error("no moves left")]
    NoMovesLeft,
    #[error("out of time")]
    OutOfTime,
    #[error("position {0} is outside the board")]
    OutOfBounds(GridPosition),
    #[error("{from} and {to} are not adjacent")]
    NotAdjacent { from: GridPosition, to: GridPosition },
    #[error("no sphere at {0}")]
    EmptyCell(GridPosition),
    #[error("swapping {from} and {to} does not form a match")]
    NoMatch { from: GridPosition, to: GridPosition },
}

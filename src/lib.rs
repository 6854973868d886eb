//! # Sphere Match Library
//!
//! This library provides a deterministic engine for a match-3 puzzle played on an 8x8 grid
//! of coloured spheres. Players swap adjacent spheres to form lines or shapes, which are
//! cleared, scored and replaced by gravity and refill, possibly setting off cascades.
//!
//! It is used by three binaries:
//! - `human_player`: Plays a level interactively on the command line.
//! - `hint_solver`: Reads a board file and ranks every legal swap.
//! - `heuristic_evaluator`: Plays seeded sessions with each autoplay policy and compares
//!   their average scores and win rates.
//!
//! ## Modules
//! - `engine`: Sphere colours, grid positions, and the `Board` with gravity and refill.
//! - `matching`: Detection of runs and of L, T, cross and square shapes.
//! - `scoring`: Group, wave and combo scoring.
//! - `powerups`: The power-up catalogue and how each one changes the board.
//! - `moves`: Swap legality.
//! - `hints`: Enumeration and ranking of legal swaps.
//! - `levels`: Difficulty bands and per-level configuration.
//! - `session`: The `SessionController` state machine and the cascade loop.
//! - `heuristics`: Autoplay policies built on the hint search.
//! - `utils`: Board text parsing and formatting.
//! - `error`: Error types.

pub mod engine;
pub mod error;
pub mod heuristics;
pub mod hints;
pub mod levels;
pub mod matching;
pub mod moves;
pub mod powerups;
pub mod scoring;
pub mod session;
pub mod utils;

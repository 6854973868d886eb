//! Level parameters, derived purely from the level number.

use crate::engine::clamp_type_count;
use crate::powerups::PowerUpKind;
use serde::{Deserialize, Serialize};

const POINTS_PER_LEVEL: f64 = 1000.0;
const BASE_TIME_LIMIT: f64 = 60.0;
const MIN_TIME_LIMIT: f64 = 30.0;
const BASE_MOVES: u32 = 30;
const MIN_MOVES: u32 = 15;

/// Difficulty band of a level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// The band a level belongs to: 1-10 easy, 11-25 medium, 26-40 hard, beyond that expert.
    /// Level 0 counts as level 1.
    pub fn for_level(level: u32) -> Difficulty {
        match level.max(1) {
            1..=10 => Difficulty::Easy,
            11..=25 => Difficulty::Medium,
            26..=40 => Difficulty::Hard,
            _ => Difficulty::Expert,
        }
    }

    /// Target-score multiplier of the band.
    pub fn multiplier(self) -> f64 {
        match self {
            Difficulty::Easy => 1.0,
            Difficulty::Medium => 1.5,
            Difficulty::Hard => 2.0,
            Difficulty::Expert => 3.0,
        }
    }
}

/// Board and pacing knobs for a difficulty band.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultySettings {
    /// Number of catalogue colours in play, always within `3..=6`.
    pub tile_types: usize,
    /// Nominal time limit in seconds for the band.
    pub time_limit: f64,
    pub target_score_multiplier: f64,
    /// Scales every power-up's spawn chance.
    pub power_up_spawn_multiplier: f64,
}

impl DifficultySettings {
    pub fn for_level(level: u32) -> DifficultySettings {
        let (tile_types, time_limit, target_score_multiplier, power_up_spawn_multiplier) =
            match Difficulty::for_level(level) {
                Difficulty::Easy => (4, 60.0, 1.0, 1.0),
                Difficulty::Medium => (5, 55.0, 1.2, 0.8),
                Difficulty::Hard => (6, 50.0, 1.5, 0.6),
                Difficulty::Expert => (6, 45.0, 2.0, 0.4),
            };
        DifficultySettings {
            tile_types: clamp_type_count(tile_types),
            time_limit,
            target_score_multiplier,
            power_up_spawn_multiplier,
        }
    }
}

/// Everything a session needs to run one level.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelConfig {
    pub number: u32,
    pub difficulty: Difficulty,
    pub target_score: u32,
    /// Seconds on the clock at level start.
    pub time_limit: f64,
    pub max_moves: u32,
    pub enabled_power_ups: Vec<PowerUpKind>,
    pub settings: DifficultySettings,
}

impl LevelConfig {
    /// Builds the configuration of level `level` (clamped to at least 1).
    ///
    /// # Examples
    /// ```
    /// use sphere_match::levels::{Difficulty, LevelConfig};
    ///
    /// let level = LevelConfig::for_level(12);
    /// assert_eq!(level.difficulty, Difficulty::Medium);
    /// assert_eq!(level.target_score, 18_000);
    /// assert_eq!(level.time_limit, 36.0);
    /// assert_eq!(level.max_moves, 24);
    /// ```
    pub fn for_level(level: u32) -> LevelConfig {
        let number = level.max(1);
        let difficulty = Difficulty::for_level(number);
        let target_score = (number as f64 * POINTS_PER_LEVEL * difficulty.multiplier()).round() as u32;
        let time_limit = (BASE_TIME_LIMIT - 2.0 * number as f64).max(MIN_TIME_LIMIT);
        let max_moves = BASE_MOVES.saturating_sub(number / 2).max(MIN_MOVES);
        LevelConfig {
            number,
            difficulty,
            target_score,
            time_limit,
            max_moves,
            enabled_power_ups: PowerUpKind::ALL.to_vec(),
            settings: DifficultySettings::for_level(number),
        }
    }

    pub fn name(&self) -> String {
        format!("Level {}", self.number)
    }
}

impl Default for LevelConfig {
    fn default() -> Self {
        LevelConfig::for_level(1)
    }
}

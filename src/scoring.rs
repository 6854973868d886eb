//! Points for matched groups and cascade waves.
//!
//! A group is worth `positions * SCORE_UNIT * pattern multiplier`. A wave adds the flat
//! bonus of every named pattern it contains and a combo bonus that grows with the number of
//! consecutive matching waves inside one player action.

use crate::matching::{MatchGroup, MatchPattern};
use serde::Serialize;

/// Points per cleared position before pattern multipliers.
pub const SCORE_UNIT: u32 = 100;

/// Raw score of a single group.
///
/// # Examples
/// ```
/// use sphere_match::matching::MatchPattern;
/// use sphere_match::scoring::group_score;
///
/// assert_eq!(group_score(3, MatchPattern::Horizontal), 300);
/// assert_eq!(group_score(5, MatchPattern::LShape), 750);
/// assert_eq!(group_score(4, MatchPattern::Square), 800);
/// ```
pub fn group_score(len: usize, pattern: MatchPattern) -> u32 {
    let raw = len as u32 * SCORE_UNIT;
    (raw as f64 * pattern.score_multiplier()).round() as u32
}

/// Bonus for the `combo`-th consecutive matching wave: the base score once for every wave
/// beyond the first.
pub fn combo_bonus(base: u32, combo: u32) -> u32 {
    base.saturating_mul(combo.saturating_sub(1))
}

/// Breakdown of the points awarded for one cascade wave.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WaveScore {
    /// Sum of the raw group scores.
    pub base: u32,
    /// Sum of the named-pattern bonuses.
    pub pattern_points: u32,
    pub combo_bonus: u32,
    pub total: u32,
}

/// Scores one wave of groups detected together at combo level `combo` (1 for the first wave
/// of an action).
///
/// # Arguments
/// * `groups`: Every group found by one detection pass.
/// * `combo`: The combo level of this wave; values below 1 are treated as 1.
///
/// # Returns
/// The `WaveScore` breakdown. An empty slice scores zero.
pub fn score_wave(groups: &[MatchGroup], combo: u32) -> WaveScore {
    let base: u32 = groups.iter().map(|g| g.score).sum();
    let pattern_points: u32 = groups.iter().map(|g| g.pattern.bonus_points()).sum();
    let combo_bonus = combo_bonus(base, combo);
    WaveScore {
        base,
        pattern_points,
        combo_bonus,
        total: base + pattern_points + combo_bonus,
    }
}

/// Points used to rank candidate moves: base plus combo bonus, without pattern bonuses.
pub fn potential_score(groups: &[MatchGroup], combo: u32) -> u32 {
    let base: u32 = groups.iter().map(|g| g.score).sum();
    base + combo_bonus(base, combo)
}

/// Scales awarded points by an active score multiplier, rounding to the nearest point.
pub fn apply_multiplier(points: u32, multiplier: f64) -> u32 {
    if multiplier <= 0.0 {
        return 0;
    }
    (points as f64 * multiplier).round() as u32
}

//! Power-up catalogue and resolution.
//!
//! Board-mutating kinds (lightning, transform, bomb) are resolved here against a board and
//! an injected random source. Timed kinds (multiplier, freeze) only produce an
//! [`ActivePowerUp`] for the session to track, and the time boost is applied by the session
//! clock.

use crate::engine::{
    clamp_type_count, Board, GridPosition, Tile, TileMovement, TileState, TileType, BOARD_SIZE,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const LIGHTNING_POINTS_PER_TILE: u32 = 50;
pub const TRANSFORM_POINTS_PER_TILE: u32 = 25;
pub const BOMB_POINTS_PER_TILE: u32 = 75;
pub const BOMB_RADIUS: usize = 1;

/// Seconds added to the clock by a time boost, capped at the level's time limit.
pub const TIME_BOOST_SECONDS: f64 = 15.0;
pub const MULTIPLIER_DURATION: f64 = 30.0;
pub const MULTIPLIER_FACTOR: f64 = 2.0;
pub const FREEZE_DURATION: f64 = 10.0;

/// How often a power-up shows up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpRarity {
    Common,
    Uncommon,
    Rare,
}

impl PowerUpRarity {
    /// Probability of spawning after a matching wave, before difficulty scaling.
    pub fn spawn_chance(self) -> f64 {
        match self {
            PowerUpRarity::Common => 0.15,
            PowerUpRarity::Uncommon => 0.08,
            PowerUpRarity::Rare => 0.03,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    Lightning,
    Transform,
    TimeBoost,
    Multiplier,
    Bomb,
    Freeze,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 6] = [
        PowerUpKind::Lightning,
        PowerUpKind::Transform,
        PowerUpKind::TimeBoost,
        PowerUpKind::Multiplier,
        PowerUpKind::Bomb,
        PowerUpKind::Freeze,
    ];

    pub fn rarity(self) -> PowerUpRarity {
        match self {
            PowerUpKind::Lightning | PowerUpKind::Bomb => PowerUpRarity::Common,
            PowerUpKind::Transform | PowerUpKind::TimeBoost => PowerUpRarity::Uncommon,
            PowerUpKind::Multiplier | PowerUpKind::Freeze => PowerUpRarity::Rare,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PowerUpKind::Lightning => "Lightning",
            PowerUpKind::Transform => "Transform",
            PowerUpKind::TimeBoost => "Time Boost",
            PowerUpKind::Multiplier => "Multiplier",
            PowerUpKind::Bomb => "Bomb",
            PowerUpKind::Freeze => "Freeze",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            PowerUpKind::Lightning => "Clears an entire row",
            PowerUpKind::Transform => "Changes every sphere of one colour into another",
            PowerUpKind::TimeBoost => "Adds 15 seconds to the clock",
            PowerUpKind::Multiplier => "Doubles points for 30 seconds",
            PowerUpKind::Bomb => "Clears a 3x3 area",
            PowerUpKind::Freeze => "Stops the clock for 10 seconds",
        }
    }

    /// Whether resolving this kind changes the board.
    pub fn mutates_board(self) -> bool {
        matches!(
            self,
            PowerUpKind::Lightning | PowerUpKind::Transform | PowerUpKind::Bomb
        )
    }

    /// Whether this kind needs a target cell. Lightning falls back to a random row without one.
    pub fn needs_target(self) -> bool {
        matches!(self, PowerUpKind::Bomb)
    }
}

/// A timed power-up currently in effect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ActivePowerUp {
    pub kind: PowerUpKind,
    /// Seconds left before the effect expires.
    pub remaining: f64,
    /// Score multiplier while active; 1.0 for kinds that do not scale points.
    pub multiplier: f64,
}

impl ActivePowerUp {
    /// The timed effect of `kind`, or `None` for instant kinds.
    pub fn for_kind(kind: PowerUpKind) -> Option<ActivePowerUp> {
        match kind {
            PowerUpKind::Multiplier => Some(ActivePowerUp {
                kind,
                remaining: MULTIPLIER_DURATION,
                multiplier: MULTIPLIER_FACTOR,
            }),
            PowerUpKind::Freeze => Some(ActivePowerUp {
                kind,
                remaining: FREEZE_DURATION,
                multiplier: 1.0,
            }),
            _ => None,
        }
    }

    /// Advances the timer by `dt` seconds. Returns `true` once the effect has run out.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.remaining = (self.remaining - dt).max(0.0);
        self.is_expired()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// Outcome of resolving one power-up.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PowerUpResult {
    /// Cells cleared or recoloured, row-major.
    pub affected: Vec<GridPosition>,
    /// Tiles created by the refill that followed a clear.
    pub new_tiles: Vec<Tile>,
    pub movements: Vec<TileMovement>,
    pub score_bonus: u32,
    /// Timed effect to register with the session.
    pub activated: Option<ActivePowerUp>,
}

impl PowerUpResult {
    /// A result with no effect.
    pub fn none() -> Self {
        PowerUpResult::default()
    }
}

/// Applies `kind` to `board`.
///
/// # Arguments
/// * `board`: The board to mutate.
/// * `kind`: The power-up to resolve.
/// * `target`: The cell the player aimed at. Lightning uses its row (a random row when
///   `None`), bomb uses it as the blast centre, other kinds ignore it.
/// * `rng`: Random source for the lightning row, transform colours and refill.
/// * `type_count`: Number of colours in play; refill and transform draw from this prefix of
///   the catalogue.
///
/// # Returns
/// The `PowerUpResult`. A missing or off-board target for a targeted kind yields
/// [`PowerUpResult::none`] and leaves the board untouched.
///
/// # Examples
/// ```
/// use rand::rngs::SmallRng;
/// use rand::SeedableRng;
/// use sphere_match::engine::{Board, GridPosition};
/// use sphere_match::powerups::{resolve_power_up, PowerUpKind};
///
/// let mut rng = SmallRng::seed_from_u64(1);
/// let mut board = Board::new_populated(&mut rng, 6);
/// let result = resolve_power_up(&mut board, PowerUpKind::Bomb, Some(GridPosition::new(0, 0)), &mut rng, 6);
/// assert_eq!(result.affected.len(), 4);
/// assert_eq!(result.score_bonus, 300);
/// assert!(board.is_full());
/// ```
pub fn resolve_power_up<R: Rng + ?Sized>(
    board: &mut Board,
    kind: PowerUpKind,
    target: Option<GridPosition>,
    rng: &mut R,
    type_count: usize,
) -> PowerUpResult {
    let result = match kind {
        PowerUpKind::Lightning => lightning(board, target, rng, type_count),
        PowerUpKind::Transform => transform(board, rng, type_count),
        PowerUpKind::Bomb => bomb(board, target, rng, type_count),
        PowerUpKind::TimeBoost => PowerUpResult::none(),
        PowerUpKind::Multiplier | PowerUpKind::Freeze => PowerUpResult {
            activated: ActivePowerUp::for_kind(kind),
            ..PowerUpResult::none()
        },
    };
    debug!(
        kind = kind.name(),
        affected = result.affected.len(),
        bonus = result.score_bonus,
        "resolved power-up"
    );
    result
}

/// Rolls every enabled kind against its spawn chance scaled by `spawn_multiplier`.
///
/// Returns the kinds that spawned, in catalogue order.
pub fn roll_spawns<R: Rng + ?Sized>(
    rng: &mut R,
    spawn_multiplier: f64,
    enabled: &[PowerUpKind],
) -> Vec<PowerUpKind> {
    PowerUpKind::ALL
        .into_iter()
        .filter(|kind| enabled.contains(kind))
        .filter(|kind| {
            let chance = (kind.rarity().spawn_chance() * spawn_multiplier).clamp(0.0, 1.0);
            rng.gen_bool(chance)
        })
        .collect()
}

fn lightning<R: Rng + ?Sized>(
    board: &mut Board,
    target: Option<GridPosition>,
    rng: &mut R,
    type_count: usize,
) -> PowerUpResult {
    let row = match target {
        Some(pos) if pos.is_valid() => pos.row,
        Some(_) => return PowerUpResult::none(),
        None => rng.gen_range(0..BOARD_SIZE),
    };
    let cleared: Vec<GridPosition> = (0..BOARD_SIZE)
        .map(|c| GridPosition::new(row, c))
        .filter(|&p| board.get(p).is_some())
        .collect();
    clear_and_settle(board, cleared, LIGHTNING_POINTS_PER_TILE, rng, type_count)
}

fn bomb<R: Rng + ?Sized>(
    board: &mut Board,
    target: Option<GridPosition>,
    rng: &mut R,
    type_count: usize,
) -> PowerUpResult {
    let Some(center) = target.filter(|p| p.is_valid()) else {
        return PowerUpResult::none();
    };
    let cleared = board.find_in_range(center, BOMB_RADIUS);
    clear_and_settle(board, cleared, BOMB_POINTS_PER_TILE, rng, type_count)
}

/// Recolours every sphere of one random colour to a different random colour.
fn transform<R: Rng + ?Sized>(board: &mut Board, rng: &mut R, type_count: usize) -> PowerUpResult {
    let count = clamp_type_count(type_count);
    let source_idx = rng.gen_range(0..count);
    let mut target_idx = rng.gen_range(0..count - 1);
    if target_idx >= source_idx {
        target_idx += 1;
    }
    let (source, target) = (TileType::ALL[source_idx], TileType::ALL[target_idx]);

    let affected: Vec<GridPosition> = board
        .tiles()
        .filter(|t| t.tile_type == source)
        .map(|t| t.position)
        .collect();
    for &pos in &affected {
        if let Some(mut tile) = board.get(pos) {
            tile.tile_type = target;
            tile.state = TileState::Transforming;
            board.set(pos, Some(tile));
        }
    }
    debug!(from = source.name(), to = target.name(), "transform");

    PowerUpResult {
        score_bonus: affected.len() as u32 * TRANSFORM_POINTS_PER_TILE,
        affected,
        ..PowerUpResult::none()
    }
}

fn clear_and_settle<R: Rng + ?Sized>(
    board: &mut Board,
    cleared: Vec<GridPosition>,
    points_per_tile: u32,
    rng: &mut R,
    type_count: usize,
) -> PowerUpResult {
    for &pos in &cleared {
        board.remove(pos);
    }
    let movements = board.apply_gravity();
    let new_tiles = board.refill(rng, type_count);
    PowerUpResult {
        score_bonus: cleared.len() as u32 * points_per_tile,
        affected: cleared,
        new_tiles,
        movements,
        activated: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::all_positions;
    use crate::utils::{board_from_str_array, STABLE_ROWS};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn stable_board() -> Board {
        board_from_str_array(&STABLE_ROWS).unwrap()
    }

    #[test]
    fn test_rarity_and_catalogue() {
        assert_eq!(PowerUpKind::Lightning.rarity(), PowerUpRarity::Common);
        assert_eq!(PowerUpKind::TimeBoost.rarity(), PowerUpRarity::Uncommon);
        assert_eq!(PowerUpKind::Freeze.rarity(), PowerUpRarity::Rare);
        assert_eq!(PowerUpRarity::Common.spawn_chance(), 0.15);
        assert!(PowerUpKind::ALL.iter().all(|k| !k.description().is_empty()));
    }

    #[test]
    fn test_lightning_clears_target_row() {
        let mut board = stable_board();
        let before = board.clone();
        let mut rng = SmallRng::seed_from_u64(11);

        let result = resolve_power_up(
            &mut board,
            PowerUpKind::Lightning,
            Some(GridPosition::new(3, 5)),
            &mut rng,
            6,
        );

        assert_eq!(result.affected.len(), BOARD_SIZE);
        assert!(result.affected.iter().all(|p| p.row == 3));
        assert_eq!(result.score_bonus, 400);
        assert_eq!(result.new_tiles.len(), BOARD_SIZE);
        assert!(result.new_tiles.iter().all(|t| t.position.row == 0));
        assert_eq!(result.movements.len(), 3 * BOARD_SIZE);
        assert!(board.is_full());
        for r in 4..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                let pos = GridPosition::new(r, c);
                assert_eq!(board.get(pos), before.get(pos));
            }
        }
        for r in 0..3 {
            for c in 0..BOARD_SIZE {
                let above = before.get(GridPosition::new(r, c)).unwrap();
                let now = board.get(GridPosition::new(r + 1, c)).unwrap();
                assert_eq!(now.id, above.id);
            }
        }
    }

    #[test]
    fn test_lightning_without_target_picks_a_row() {
        let mut board = stable_board();
        let mut rng = SmallRng::seed_from_u64(5);
        let result = resolve_power_up(&mut board, PowerUpKind::Lightning, None, &mut rng, 6);
        assert_eq!(result.affected.len(), BOARD_SIZE);
        let row = result.affected[0].row;
        assert!(result.affected.iter().all(|p| p.row == row));
        assert!(board.is_full());
    }

    #[test]
    fn test_bomb_clips_at_corner() {
        let mut board = stable_board();
        let mut rng = SmallRng::seed_from_u64(2);
        let corner = GridPosition::new(BOARD_SIZE - 1, BOARD_SIZE - 1);
        let result = resolve_power_up(&mut board, PowerUpKind::Bomb, Some(corner), &mut rng, 6);
        assert_eq!(result.affected.len(), 4);
        assert_eq!(result.score_bonus, 4 * BOMB_POINTS_PER_TILE);
        assert_eq!(result.new_tiles.len(), 4);
        assert!(board.is_full());
    }

    #[test]
    fn test_bomb_centre_clears_nine() {
        let mut board = stable_board();
        let mut rng = SmallRng::seed_from_u64(2);
        let result = resolve_power_up(
            &mut board,
            PowerUpKind::Bomb,
            Some(GridPosition::new(4, 4)),
            &mut rng,
            6,
        );
        assert_eq!(result.affected.len(), 9);
        assert_eq!(result.score_bonus, 675);
    }

    #[test]
    fn test_targeted_power_up_with_invalid_target_is_noop() {
        let mut board = stable_board();
        let before = board.clone();
        let mut rng = SmallRng::seed_from_u64(2);

        let result = resolve_power_up(&mut board, PowerUpKind::Bomb, None, &mut rng, 6);
        assert_eq!(result, PowerUpResult::none());

        let off_board = GridPosition::new(BOARD_SIZE, 0);
        let result =
            resolve_power_up(&mut board, PowerUpKind::Lightning, Some(off_board), &mut rng, 6);
        assert_eq!(result, PowerUpResult::none());
        assert_eq!(board, before);
    }

    #[test]
    fn test_only_bomb_needs_a_target() {
        for kind in PowerUpKind::ALL {
            let mut board = stable_board();
            let mut rng = SmallRng::seed_from_u64(4);
            let result = resolve_power_up(&mut board, kind, None, &mut rng, 6);
            let did_something = !result.affected.is_empty() || result.activated.is_some();
            match kind {
                PowerUpKind::Bomb => {
                    assert!(kind.needs_target());
                    assert!(!did_something);
                }
                PowerUpKind::TimeBoost => assert!(!kind.needs_target()),
                _ => {
                    assert!(!kind.needs_target(), "{}", kind.name());
                    assert!(did_something, "{}", kind.name());
                }
            }
        }
    }

    #[test]
    fn test_transform_recolours_one_type() {
        let mut board = stable_board();
        let before = board.clone();
        let mut rng = SmallRng::seed_from_u64(9);

        let result = resolve_power_up(&mut board, PowerUpKind::Transform, None, &mut rng, 6);

        assert!(!result.affected.is_empty());
        assert!(result.new_tiles.is_empty() && result.movements.is_empty());
        assert_eq!(
            result.score_bonus,
            result.affected.len() as u32 * TRANSFORM_POINTS_PER_TILE
        );
        let source = before.tile_type(result.affected[0]).unwrap();
        let target = board.tile_type(result.affected[0]).unwrap();
        assert_ne!(source, target);
        for pos in all_positions() {
            let old = before.get(pos).unwrap();
            let new = board.get(pos).unwrap();
            assert_eq!(old.id, new.id);
            if result.affected.contains(&pos) {
                assert_eq!(new.tile_type, target);
                assert_eq!(new.state, TileState::Transforming);
            } else {
                assert_ne!(old.tile_type, source);
                assert_eq!(new, old);
            }
        }
    }

    #[test]
    fn test_transform_stays_in_palette() {
        for seed in 0..20 {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut board = Board::new_populated(&mut rng, 3);
            resolve_power_up(&mut board, PowerUpKind::Transform, None, &mut rng, 3);
            assert!(board
                .tiles()
                .all(|t| TileType::ALL[..3].contains(&t.tile_type)));
        }
    }

    #[test]
    fn test_timed_power_ups_do_not_touch_board() {
        let mut board = stable_board();
        let before = board.clone();
        let mut rng = SmallRng::seed_from_u64(4);

        let multiplier = resolve_power_up(&mut board, PowerUpKind::Multiplier, None, &mut rng, 6);
        assert_eq!(
            multiplier.activated,
            Some(ActivePowerUp {
                kind: PowerUpKind::Multiplier,
                remaining: MULTIPLIER_DURATION,
                multiplier: MULTIPLIER_FACTOR,
            })
        );
        let freeze = resolve_power_up(&mut board, PowerUpKind::Freeze, None, &mut rng, 6);
        assert_eq!(freeze.activated.map(|a| a.remaining), Some(FREEZE_DURATION));
        let boost = resolve_power_up(&mut board, PowerUpKind::TimeBoost, None, &mut rng, 6);
        assert_eq!(boost, PowerUpResult::none());
        assert_eq!(board, before);
    }

    #[test]
    fn test_active_power_up_tick_expires() {
        let mut active = ActivePowerUp::for_kind(PowerUpKind::Freeze).unwrap();
        assert!(!active.tick(4.0));
        assert!(!active.tick(5.5));
        assert!(active.tick(1.0));
        assert_eq!(active.remaining, 0.0);
        assert!(ActivePowerUp::for_kind(PowerUpKind::Bomb).is_none());
    }

    #[test]
    fn test_roll_spawns_respects_enabled_and_multiplier() {
        let mut rng = SmallRng::seed_from_u64(0);
        for _ in 0..50 {
            assert!(roll_spawns(&mut rng, 0.0, &PowerUpKind::ALL).is_empty());
            assert!(roll_spawns(&mut rng, 1.0, &[]).is_empty());
        }
        let all = roll_spawns(&mut rng, 100.0, &PowerUpKind::ALL);
        assert_eq!(all, PowerUpKind::ALL.to_vec());

        let only_bomb = roll_spawns(&mut rng, 100.0, &[PowerUpKind::Bomb]);
        assert_eq!(only_bomb, vec![PowerUpKind::Bomb]);
    }
}

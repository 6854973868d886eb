//! The game session: state machine, clock, power-up inventory and the cascade loop.
//!
//! A `SessionController` exclusively owns its board and a seeded `SmallRng`, so a session
//! created with the same seed and driven with the same inputs replays identically. The host
//! drives time through [`SessionController::tick`]; every other operation settles
//! synchronously, cascades included, and returns a report describing what happened.

use crate::engine::{Board, GridPosition, Tile, TileMovement, TileState};
use crate::error::MoveRejection;
use crate::hints::has_legal_moves;
use crate::levels::{DifficultySettings, LevelConfig};
use crate::matching::{find_all_matches, matched_positions, MatchGroup};
use crate::moves::check_move;
use crate::powerups::{
    resolve_power_up, roll_spawns, ActivePowerUp, PowerUpKind, PowerUpResult, TIME_BOOST_SECONDS,
};
use crate::scoring::{apply_multiplier, score_wave, WaveScore};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, instrument, trace, warn};

/// The inventory keeps only this many of the most recently gained power-ups.
pub const MAX_POWER_UP_INVENTORY: usize = 3;

/// Termination guard for the cascade loop.
pub const MAX_CASCADE_WAVES: usize = 64;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Menu,
    Playing,
    Paused,
    LevelComplete,
    GameOver,
}

/// One detection-clear-gravity-refill step of a cascade.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CascadeWave {
    /// Union of all matched positions, row-major.
    pub cleared: Vec<GridPosition>,
    pub groups: Vec<MatchGroup>,
    /// Display names of the matched patterns, one per group.
    pub patterns: Vec<&'static str>,
    pub score: WaveScore,
    /// Points actually awarded, after any active score multiplier.
    pub points: u32,
    /// Combo level this wave was scored at.
    pub combo_multiplier: u32,
    pub movements: Vec<TileMovement>,
    pub new_tiles: Vec<Tile>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    pub waves: Vec<CascadeWave>,
    /// Combo level after the loop; back to 1 once a wave finds nothing.
    pub final_combo: u32,
    pub points: u32,
}

/// Emitted once when a session leaves `Playing` for good.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SessionEnd {
    pub won: bool,
    pub final_score: u32,
    pub level: u32,
    pub elapsed_time: f64,
}

/// Everything that followed an accepted swap.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnReport {
    pub from: GridPosition,
    pub to: GridPosition,
    pub waves: Vec<CascadeWave>,
    pub points: u32,
    pub spawned_power_ups: Vec<PowerUpKind>,
    /// The settled board has no legal swap left.
    pub board_exhausted: bool,
    pub session_end: Option<SessionEnd>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    Rejected(MoveRejection),
    Applied(TurnReport),
}

impl MoveOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MoveOutcome::Applied(_))
    }
}

/// Result of tapping a cell.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    /// The tap was ignored (no sphere there, or the session cannot accept moves).
    Ignored,
    Selected(GridPosition),
    Deselected(GridPosition),
    /// The tap was adjacent to the selection, so a swap was attempted.
    Attempted(MoveOutcome),
}

/// Everything that followed using a power-up.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PowerUpActivation {
    pub kind: PowerUpKind,
    pub result: PowerUpResult,
    /// Cascade run on the board after a board-changing power-up; empty otherwise.
    pub cascade: CascadeReport,
    pub points: u32,
    pub board_exhausted: bool,
    pub session_end: Option<SessionEnd>,
}

/// Clears matches until the board settles.
///
/// Each wave detects all groups, scores them at the current combo level, clears the union of
/// their positions, applies gravity and refills. The combo level rises by one per matching
/// wave and drops back to 1 when a wave finds nothing. The loop stops after
/// `MAX_CASCADE_WAVES` waves even if matches remain.
///
/// # Arguments
/// * `board`: The board to settle.
/// * `rng`: Random source for the refill.
/// * `type_count`: Number of colours the refill draws from.
/// * `combo`: Combo level of the first wave (values below 1 count as 1).
/// * `score_multiplier`: Active score multiplier applied to each wave's total.
pub fn resolve_cascades<R: Rng + ?Sized>(
    board: &mut Board,
    rng: &mut R,
    type_count: usize,
    combo: u32,
    score_multiplier: f64,
) -> CascadeReport {
    let mut combo = combo.max(1);
    let mut waves = Vec::new();
    let mut points = 0;

    loop {
        if waves.len() >= MAX_CASCADE_WAVES {
            warn!(waves = waves.len(), "cascade stopped at wave limit");
            break;
        }
        let groups = find_all_matches(board);
        if groups.is_empty() {
            combo = 1;
            break;
        }

        let score = score_wave(&groups, combo);
        let wave_points = apply_multiplier(score.total, score_multiplier);
        let cleared = matched_positions(&groups);
        for &pos in &cleared {
            board.remove(pos);
        }
        let movements = board.apply_gravity();
        let new_tiles = board.refill(rng, type_count);
        trace!(
            wave = waves.len(),
            combo,
            cleared = cleared.len(),
            points = wave_points,
            "cascade wave"
        );

        points += wave_points;
        waves.push(CascadeWave {
            cleared,
            patterns: groups.iter().map(|g| g.pattern.name()).collect(),
            groups,
            score,
            points: wave_points,
            combo_multiplier: combo,
            movements,
            new_tiles,
        });
        combo += 1;
    }

    CascadeReport {
        waves,
        final_combo: combo,
        points,
    }
}

/// An owned game session.
#[derive(Clone, Debug)]
pub struct SessionController {
    state: SessionState,
    board: Board,
    level: LevelConfig,
    score: u32,
    combo: u32,
    moves_left: u32,
    time_remaining: f64,
    elapsed_time: f64,
    selected: Option<GridPosition>,
    active_power_ups: Vec<ActivePowerUp>,
    inventory: Vec<PowerUpKind>,
    rng: SmallRng,
}

impl SessionController {
    /// Creates a session in the menu with an empty board. All randomness derives from `seed`.
    pub fn new(seed: u64) -> Self {
        let level = LevelConfig::default();
        SessionController {
            state: SessionState::Menu,
            board: Board::new_empty(),
            score: 0,
            combo: 1,
            moves_left: level.max_moves,
            time_remaining: level.time_limit,
            elapsed_time: 0.0,
            selected: None,
            active_power_ups: Vec::new(),
            inventory: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
            level,
        }
    }

    /// Starts a session already playing `level` on a given board, for replays and fixtures.
    pub fn with_board(board: Board, level: LevelConfig, seed: u64) -> Self {
        let mut session = SessionController::new(seed);
        session.moves_left = level.max_moves;
        session.time_remaining = level.time_limit;
        session.level = level;
        session.board = board;
        session.state = SessionState::Playing;
        session
    }

    /// Resets all progress, builds the configuration of `level`, populates a fresh board with
    /// no matches and enters `Playing`.
    ///
    /// # Returns
    /// A copy of the new board and the level's difficulty settings.
    ///
    /// # Examples
    /// ```
    /// use sphere_match::matching::find_all_matches;
    /// use sphere_match::session::{SessionController, SessionState};
    ///
    /// let mut session = SessionController::new(42);
    /// let (board, settings) = session.start_new_game(1);
    /// assert_eq!(session.state(), SessionState::Playing);
    /// assert_eq!(settings.tile_types, 4);
    /// assert!(board.is_full());
    /// assert!(find_all_matches(&board).is_empty());
    /// ```
    #[instrument(skip(self))]
    pub fn start_new_game(&mut self, level: u32) -> (Board, DifficultySettings) {
        self.reset_progress();
        self.level = LevelConfig::for_level(level);
        self.moves_left = self.level.max_moves;
        self.time_remaining = self.level.time_limit;
        let settings = self.level.settings;
        self.board = Board::new_populated(&mut self.rng, settings.tile_types);
        self.state = SessionState::Playing;
        info!(
            level = self.level.number,
            target = self.level.target_score,
            moves = self.moves_left,
            time = self.time_remaining,
            "level started"
        );
        (self.board.clone(), settings)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn level(&self) -> &LevelConfig {
        &self.level
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn moves_left(&self) -> u32 {
        self.moves_left
    }

    pub fn time_remaining(&self) -> f64 {
        self.time_remaining
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn selected(&self) -> Option<GridPosition> {
        self.selected
    }

    pub fn active_power_ups(&self) -> &[ActivePowerUp] {
        &self.active_power_ups
    }

    /// Power-ups the player holds, oldest first.
    pub fn available_power_ups(&self) -> &[PowerUpKind] {
        &self.inventory
    }

    /// Product of all active score multipliers.
    pub fn score_multiplier(&self) -> f64 {
        self.active_power_ups
            .iter()
            .fold(1.0, |acc, p| acc * p.multiplier)
    }

    pub fn is_frozen(&self) -> bool {
        self.active_power_ups
            .iter()
            .any(|p| p.kind == PowerUpKind::Freeze)
    }

    /// Score as a fraction of the level target. Not clamped.
    pub fn level_progress(&self) -> f64 {
        if self.level.target_score == 0 {
            return 1.0;
        }
        self.score as f64 / self.level.target_score as f64
    }

    /// Remaining time as a fraction of the level time limit.
    pub fn time_progress(&self) -> f64 {
        if self.level.time_limit <= 0.0 {
            return 0.0;
        }
        self.time_remaining / self.level.time_limit
    }

    pub fn can_move(&self) -> bool {
        self.state == SessionState::Playing && self.moves_left > 0 && self.time_remaining > 0.0
    }

    /// Handles a tap on `pos`.
    ///
    /// The first tap selects a sphere, tapping it again deselects it, tapping an adjacent
    /// sphere attempts the swap and tapping anything else moves the selection there.
    #[instrument(skip(self))]
    pub fn select(&mut self, pos: GridPosition) -> SelectionOutcome {
        if !self.can_move() || !pos.is_valid() || self.board.get(pos).is_none() {
            return SelectionOutcome::Ignored;
        }
        match self.selected {
            Some(current) if current == pos => {
                self.clear_selection();
                SelectionOutcome::Deselected(pos)
            }
            Some(current) if current.is_adjacent(pos) => {
                self.clear_selection();
                SelectionOutcome::Attempted(self.attempt_move(current, pos))
            }
            _ => {
                self.clear_selection();
                self.selected = Some(pos);
                self.board.set_state(pos, TileState::Highlighted);
                SelectionOutcome::Selected(pos)
            }
        }
    }

    /// Swaps two spheres if the swap is legal, then settles the board.
    ///
    /// A rejected swap leaves the session and its board exactly as they were. An accepted
    /// swap costs one move, runs the cascade loop starting at the current combo, adds the
    /// points, rolls power-up spawns once per matching wave and checks the end conditions.
    #[instrument(skip(self))]
    pub fn attempt_move(&mut self, from: GridPosition, to: GridPosition) -> MoveOutcome {
        if let Err(reason) = self.check_session_accepts_moves() {
            debug!(%reason, "move rejected");
            return MoveOutcome::Rejected(reason);
        }
        if let Err(reason) = check_move(&self.board, from, to) {
            debug!(%reason, "move rejected");
            return MoveOutcome::Rejected(reason);
        }

        self.clear_selection();
        self.board.swap(from, to);
        self.moves_left -= 1;

        let cascade = self.settle(self.combo);
        let spawned_power_ups = self.spawn_power_ups(cascade.waves.len());
        let board_exhausted = !has_legal_moves(&self.board);
        if board_exhausted {
            debug!("board has no legal moves left");
        }
        let session_end = self.check_end_conditions();

        debug!(
            waves = cascade.waves.len(),
            points = cascade.points,
            score = self.score,
            moves_left = self.moves_left,
            "move applied"
        );
        MoveOutcome::Applied(TurnReport {
            from,
            to,
            points: cascade.points,
            waves: cascade.waves,
            spawned_power_ups,
            board_exhausted,
            session_end,
        })
    }

    /// Uses one held power-up of `kind`.
    ///
    /// # Returns
    /// `None` when the session is not playing or no power-up of that kind is held; the
    /// session is unchanged in that case.
    #[instrument(skip(self))]
    pub fn activate_power_up(
        &mut self,
        kind: PowerUpKind,
        target: Option<GridPosition>,
    ) -> Option<PowerUpActivation> {
        if self.state != SessionState::Playing {
            return None;
        }
        let index = self.inventory.iter().position(|&k| k == kind)?;
        self.inventory.remove(index);
        self.clear_selection();

        let type_count = self.level.settings.tile_types;
        let result = resolve_power_up(&mut self.board, kind, target, &mut self.rng, type_count);
        self.score += result.score_bonus;

        if kind == PowerUpKind::TimeBoost {
            self.time_remaining =
                (self.time_remaining + TIME_BOOST_SECONDS).min(self.level.time_limit);
        }
        if let Some(active) = result.activated {
            self.register_active(active);
        }

        let cascade = if kind.mutates_board() {
            self.settle(self.combo)
        } else {
            CascadeReport {
                final_combo: self.combo,
                ..CascadeReport::default()
            }
        };
        let board_exhausted = !has_legal_moves(&self.board);
        let session_end = self.check_end_conditions();
        info!(kind = kind.name(), bonus = result.score_bonus, "power-up used");

        Some(PowerUpActivation {
            kind,
            points: result.score_bonus + cascade.points,
            result,
            cascade,
            board_exhausted,
            session_end,
        })
    }

    /// Adds a power-up to the inventory, dropping the oldest beyond `MAX_POWER_UP_INVENTORY`.
    pub fn grant_power_up(&mut self, kind: PowerUpKind) {
        self.inventory.push(kind);
        if self.inventory.len() > MAX_POWER_UP_INVENTORY {
            let excess = self.inventory.len() - MAX_POWER_UP_INVENTORY;
            self.inventory.drain(..excess);
        }
    }

    /// Advances the session clock by `dt` seconds.
    ///
    /// Only a playing session ticks. Active power-ups count down and expire; the level clock
    /// counts down unless a freeze was active at the start of the tick. Running out of time
    /// ends the session as lost.
    pub fn tick(&mut self, dt: f64) -> Option<SessionEnd> {
        if self.state != SessionState::Playing || dt <= 0.0 {
            return None;
        }
        self.elapsed_time += dt;
        let frozen = self.is_frozen();

        self.active_power_ups.retain_mut(|p| {
            let expired = p.tick(dt);
            if expired {
                debug!(kind = p.kind.name(), "power-up expired");
            }
            !expired
        });

        if !frozen {
            self.time_remaining = (self.time_remaining - dt).max(0.0);
        }
        if self.time_remaining <= 0.0 {
            return Some(self.end_session(false));
        }
        None
    }

    /// Ends an active timed power-up early. Returns whether one was active.
    pub fn expire_power_up(&mut self, kind: PowerUpKind) -> bool {
        let before = self.active_power_ups.len();
        self.active_power_ups.retain(|p| p.kind != kind);
        before != self.active_power_ups.len()
    }

    /// `Playing` to `Paused`. Returns whether the state changed.
    pub fn pause(&mut self) -> bool {
        if self.state != SessionState::Playing {
            return false;
        }
        self.state = SessionState::Paused;
        true
    }

    /// `Paused` to `Playing`. Returns whether the state changed.
    pub fn resume(&mut self) -> bool {
        if self.state != SessionState::Paused {
            return false;
        }
        self.state = SessionState::Playing;
        true
    }

    /// Abandons the session and returns to the menu.
    pub fn reset(&mut self) {
        self.reset_progress();
        self.moves_left = self.level.max_moves;
        self.time_remaining = self.level.time_limit;
        self.state = SessionState::Menu;
    }

    fn reset_progress(&mut self) {
        self.score = 0;
        self.combo = 1;
        self.elapsed_time = 0.0;
        self.selected = None;
        self.active_power_ups.clear();
        self.inventory.clear();
    }

    fn check_session_accepts_moves(&self) -> Result<(), MoveRejection> {
        if self.state != SessionState::Playing {
            return Err(MoveRejection::NotPlaying(self.state));
        }
        if self.moves_left == 0 {
            return Err(MoveRejection::NoMovesLeft);
        }
        if self.time_remaining <= 0.0 {
            return Err(MoveRejection::OutOfTime);
        }
        Ok(())
    }

    fn settle(&mut self, combo: u32) -> CascadeReport {
        let multiplier = self.score_multiplier();
        let report = resolve_cascades(
            &mut self.board,
            &mut self.rng,
            self.level.settings.tile_types,
            combo,
            multiplier,
        );
        self.score += report.points;
        self.combo = report.final_combo;
        report
    }

    fn spawn_power_ups(&mut self, matching_waves: usize) -> Vec<PowerUpKind> {
        let mut spawned = Vec::new();
        for _ in 0..matching_waves {
            spawned.extend(roll_spawns(
                &mut self.rng,
                self.level.settings.power_up_spawn_multiplier,
                &self.level.enabled_power_ups,
            ));
        }
        for &kind in &spawned {
            self.grant_power_up(kind);
        }
        if !spawned.is_empty() {
            debug!(?spawned, "power-ups spawned");
        }
        spawned
    }

    fn register_active(&mut self, active: ActivePowerUp) {
        match self.active_power_ups.iter_mut().find(|p| p.kind == active.kind) {
            Some(existing) => *existing = active,
            None => self.active_power_ups.push(active),
        }
    }

    fn clear_selection(&mut self) {
        if let Some(pos) = self.selected.take() {
            self.board.set_state(pos, TileState::Normal);
        }
    }

    fn check_end_conditions(&mut self) -> Option<SessionEnd> {
        if self.state != SessionState::Playing {
            return None;
        }
        if self.score >= self.level.target_score {
            return Some(self.end_session(true));
        }
        if self.moves_left == 0 || self.time_remaining <= 0.0 {
            return Some(self.end_session(false));
        }
        None
    }

    fn end_session(&mut self, won: bool) -> SessionEnd {
        self.clear_selection();
        self.state = if won {
            SessionState::LevelComplete
        } else {
            SessionState::GameOver
        };
        let end = SessionEnd {
            won,
            final_score: self.score,
            level: self.level.number,
            elapsed_time: self.elapsed_time,
        };
        info!(
            won,
            score = end.final_score,
            level = end.level,
            elapsed = end.elapsed_time,
            "session ended"
        );
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::BOARD_SIZE;
    use crate::utils::{assert_positions_consistent, board_from_str_array, STABLE_ROWS};

    fn pos(r: usize, c: usize) -> GridPosition {
        GridPosition::new(r, c)
    }

    /// The stable board with a single legal swap: (0, 2) with (0, 3).
    fn one_move_board() -> Board {
        let mut rows = STABLE_ROWS;
        rows[0] = "CCGCYKCG";
        board_from_str_array(&rows).unwrap()
    }

    fn stable_board() -> Board {
        board_from_str_array(&STABLE_ROWS).unwrap()
    }

    fn level_with(target_score: u32, max_moves: u32) -> LevelConfig {
        let mut level = LevelConfig::for_level(1);
        level.target_score = target_score;
        level.max_moves = max_moves;
        level
    }

    fn playing(board: Board) -> SessionController {
        SessionController::with_board(board, level_with(1_000_000, 30), 7)
    }

    #[test]
    fn test_new_session_starts_in_menu() {
        let session = SessionController::new(1);
        assert_eq!(session.state(), SessionState::Menu);
        assert!(!session.can_move());
        assert_eq!(session.board().occupied_count(), 0);
    }

    #[test]
    fn test_start_new_game_sets_up_level() {
        let mut session = SessionController::new(3);
        let (board, settings) = session.start_new_game(12);
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(settings, DifficultySettings::for_level(12));
        assert_eq!(session.level().number, 12);
        assert_eq!(session.moves_left(), session.level().max_moves);
        assert_eq!(session.time_remaining(), session.level().time_limit);
        assert_eq!(session.score(), 0);
        assert_eq!(&board, session.board());
        assert!(find_all_matches(&board).is_empty());
        assert!(board
            .tiles()
            .all(|t| crate::engine::TileType::ALL[..settings.tile_types].contains(&t.tile_type)));
    }

    #[test]
    fn test_same_seed_same_board() {
        let (a, _) = SessionController::new(99).start_new_game(1);
        let (b, _) = SessionController::new(99).start_new_game(1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_illegal_move_leaves_session_untouched() {
        let mut session = playing(stable_board());
        let before = session.board().clone();
        let outcome = session.attempt_move(pos(0, 0), pos(0, 1));
        assert_eq!(
            outcome,
            MoveOutcome::Rejected(MoveRejection::NoMatch {
                from: pos(0, 0),
                to: pos(0, 1)
            })
        );
        assert_eq!(session.board(), &before);
        assert_eq!(session.moves_left(), 30);
        assert_eq!(session.score(), 0);

        let outcome = session.attempt_move(pos(0, 0), pos(2, 0));
        assert!(!outcome.is_applied());
        assert_eq!(session.board(), &before);
    }

    #[test]
    fn test_moves_rejected_outside_playing() {
        let mut session = SessionController::new(0);
        assert_eq!(
            session.attempt_move(pos(0, 0), pos(0, 1)),
            MoveOutcome::Rejected(MoveRejection::NotPlaying(SessionState::Menu))
        );

        let mut session = playing(one_move_board());
        assert!(session.pause());
        assert_eq!(
            session.attempt_move(pos(0, 2), pos(0, 3)),
            MoveOutcome::Rejected(MoveRejection::NotPlaying(SessionState::Paused))
        );
        assert!(session.resume());
        assert!(session.attempt_move(pos(0, 2), pos(0, 3)).is_applied());
    }

    #[test]
    fn test_legal_move_scores_and_spends_a_move() {
        let mut session = playing(one_move_board());
        let outcome = session.attempt_move(pos(0, 2), pos(0, 3));
        let MoveOutcome::Applied(report) = outcome else {
            panic!("expected the swap to be applied");
        };
        assert_eq!(session.moves_left(), 29);
        assert!(!report.waves.is_empty());
        let first = &report.waves[0];
        assert_eq!(first.cleared, vec![pos(0, 0), pos(0, 1), pos(0, 2)]);
        assert_eq!(first.patterns, vec!["Horizontal Line"]);
        assert_eq!(first.score.total, 450);
        assert_eq!(first.combo_multiplier, 1);
        assert_eq!(report.points, report.waves.iter().map(|w| w.points).sum::<u32>());
        assert_eq!(session.score(), report.points);
        assert_eq!(session.combo(), 1);
        assert!(session.board().is_full());
        assert!(find_all_matches(session.board()).is_empty());
        assert_eq!(report.board_exhausted, !has_legal_moves(session.board()));
        assert_eq!(report.session_end, None);
    }

    #[test]
    fn test_reaching_target_completes_level() {
        let mut session = SessionController::with_board(one_move_board(), level_with(300, 30), 1);
        let MoveOutcome::Applied(report) = session.attempt_move(pos(0, 2), pos(0, 3)) else {
            panic!("expected the swap to be applied");
        };
        let end = report.session_end.unwrap();
        assert!(end.won);
        assert_eq!(end.final_score, session.score());
        assert_eq!(end.level, 1);
        assert_eq!(session.state(), SessionState::LevelComplete);
        assert!(!session.can_move());
    }

    #[test]
    fn test_last_move_without_target_is_game_over() {
        let mut session =
            SessionController::with_board(one_move_board(), level_with(1_000_000, 1), 1);
        let MoveOutcome::Applied(report) = session.attempt_move(pos(0, 2), pos(0, 3)) else {
            panic!("expected the swap to be applied");
        };
        assert_eq!(report.session_end.map(|e| e.won), Some(false));
        assert_eq!(session.state(), SessionState::GameOver);
        assert_eq!(session.moves_left(), 0);
        assert_eq!(
            session.attempt_move(pos(0, 2), pos(0, 3)),
            MoveOutcome::Rejected(MoveRejection::NotPlaying(SessionState::GameOver))
        );
    }

    #[test]
    fn test_two_wave_cascade_raises_combo() {
        let mut rows = STABLE_ROWS;
        rows[6] = "CYYOYKCG";
        rows[7] = "CCCYCGPO";
        let mut board = board_from_str_array(&rows).unwrap();
        let mut rng = SmallRng::seed_from_u64(5);

        let report = resolve_cascades(&mut board, &mut rng, 6, 1, 1.0);

        assert!(report.waves.len() >= 2);
        let first = &report.waves[0];
        assert_eq!(first.cleared, vec![pos(7, 0), pos(7, 1), pos(7, 2)]);
        assert_eq!(first.combo_multiplier, 1);
        assert_eq!(first.score.total, 450);

        let second = &report.waves[1];
        assert_eq!(second.combo_multiplier, 2);
        for c in 1..=3 {
            assert!(second.cleared.contains(&pos(7, c)));
        }
        assert_eq!(second.score.combo_bonus, second.score.base);
        assert!(report
            .waves
            .windows(2)
            .all(|w| w[1].combo_multiplier == w[0].combo_multiplier + 1));
        assert_eq!(report.final_combo, 1);
        assert_eq!(report.points, report.waves.iter().map(|w| w.points).sum::<u32>());
        assert!(board.is_full());
        assert!(find_all_matches(&board).is_empty());
        assert_positions_consistent(&board);
        assert!(board.tiles().all(|t| t.power_up.is_none()
            && !matches!(t.state, TileState::Matched | TileState::Exploding)));
    }

    #[test]
    fn test_cascade_on_settled_board_is_empty() {
        let mut board = stable_board();
        let before = board.clone();
        let mut rng = SmallRng::seed_from_u64(5);
        let report = resolve_cascades(&mut board, &mut rng, 6, 3, 1.0);
        assert!(report.waves.is_empty());
        assert_eq!(report.final_combo, 1);
        assert_eq!(report.points, 0);
        assert_eq!(board, before);
    }

    #[test]
    fn test_select_flow() {
        let mut session = playing(one_move_board());
        assert_eq!(session.select(pos(0, 2)), SelectionOutcome::Selected(pos(0, 2)));
        assert_eq!(
            session.board().get(pos(0, 2)).unwrap().state,
            TileState::Highlighted
        );

        assert_eq!(session.select(pos(0, 2)), SelectionOutcome::Deselected(pos(0, 2)));
        assert_eq!(session.selected(), None);
        assert_eq!(session.board().get(pos(0, 2)).unwrap().state, TileState::Normal);

        session.select(pos(0, 2));
        assert_eq!(session.select(pos(5, 5)), SelectionOutcome::Selected(pos(5, 5)));
        assert_eq!(session.board().get(pos(0, 2)).unwrap().state, TileState::Normal);

        session.select(pos(0, 2));
        let outcome = session.select(pos(0, 3));
        assert!(matches!(outcome, SelectionOutcome::Attempted(MoveOutcome::Applied(_))));
        assert_eq!(session.selected(), None);

        assert_eq!(
            session.select(pos(BOARD_SIZE, 0)),
            SelectionOutcome::Ignored
        );
    }

    #[test]
    fn test_pause_and_resume() {
        let mut session = playing(one_move_board());
        assert!(!session.resume());
        assert!(session.pause());
        assert_eq!(session.state(), SessionState::Paused);
        assert!(!session.pause());
        assert_eq!(session.tick(5.0), None);
        assert_eq!(session.time_remaining(), session.level().time_limit);
        assert!(session.resume());
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn test_tick_runs_clock_to_game_over() {
        let mut session = playing(one_move_board());
        let limit = session.level().time_limit;
        assert_eq!(session.tick(10.0), None);
        assert_eq!(session.time_remaining(), limit - 10.0);
        assert!((session.time_progress() - (limit - 10.0) / limit).abs() < 1e-9);

        let end = session.tick(limit).unwrap();
        assert!(!end.won);
        assert_eq!(end.elapsed_time, limit + 10.0);
        assert_eq!(session.time_remaining(), 0.0);
        assert_eq!(session.state(), SessionState::GameOver);
        assert_eq!(session.tick(1.0), None);
    }

    #[test]
    fn test_freeze_stops_the_clock() {
        let mut session = playing(one_move_board());
        let limit = session.level().time_limit;
        session.grant_power_up(PowerUpKind::Freeze);
        let activation = session.activate_power_up(PowerUpKind::Freeze, None).unwrap();
        assert!(activation.cascade.waves.is_empty());
        assert!(session.is_frozen());

        session.tick(5.0);
        assert_eq!(session.time_remaining(), limit);
        session.tick(5.0);
        assert_eq!(session.time_remaining(), limit);
        assert!(!session.is_frozen());
        session.tick(1.0);
        assert_eq!(session.time_remaining(), limit - 1.0);
        assert_eq!(session.elapsed_time(), 11.0);
    }

    #[test]
    fn test_multiplier_doubles_wave_points_until_expired() {
        let mut session = playing(one_move_board());
        session.grant_power_up(PowerUpKind::Multiplier);
        session.activate_power_up(PowerUpKind::Multiplier, None).unwrap();
        assert_eq!(session.score_multiplier(), 2.0);

        let MoveOutcome::Applied(report) = session.attempt_move(pos(0, 2), pos(0, 3)) else {
            panic!("expected the swap to be applied");
        };
        assert_eq!(report.waves[0].points, 900);

        assert!(session.expire_power_up(PowerUpKind::Multiplier));
        assert!(!session.expire_power_up(PowerUpKind::Multiplier));
        assert_eq!(session.score_multiplier(), 1.0);
    }

    #[test]
    fn test_lightning_from_inventory() {
        let mut session = playing(stable_board());
        assert!(session
            .activate_power_up(PowerUpKind::Lightning, Some(pos(3, 0)))
            .is_none());

        session.grant_power_up(PowerUpKind::Lightning);
        let activation = session
            .activate_power_up(PowerUpKind::Lightning, Some(pos(3, 0)))
            .unwrap();
        assert_eq!(activation.result.affected.len(), BOARD_SIZE);
        assert_eq!(activation.result.score_bonus, 400);
        assert_eq!(session.score(), activation.points);
        assert!(session.score() >= 400);
        assert!(session.available_power_ups().is_empty());
        assert!(session.board().is_full());
        assert!(find_all_matches(session.board()).is_empty());
        assert_eq!(session.moves_left(), 30);
        assert_positions_consistent(session.board());
    }

    #[test]
    fn test_time_boost_is_capped_at_limit() {
        let mut session = playing(one_move_board());
        let limit = session.level().time_limit;
        session.tick(5.0);
        session.grant_power_up(PowerUpKind::TimeBoost);
        session.activate_power_up(PowerUpKind::TimeBoost, None).unwrap();
        assert_eq!(session.time_remaining(), limit);

        session.tick(20.0);
        session.grant_power_up(PowerUpKind::TimeBoost);
        session.activate_power_up(PowerUpKind::TimeBoost, None).unwrap();
        assert_eq!(session.time_remaining(), limit - 5.0);
    }

    #[test]
    fn test_inventory_keeps_most_recent() {
        let mut session = playing(one_move_board());
        session.grant_power_up(PowerUpKind::Lightning);
        session.grant_power_up(PowerUpKind::Bomb);
        session.grant_power_up(PowerUpKind::Freeze);
        session.grant_power_up(PowerUpKind::Transform);
        assert_eq!(
            session.available_power_ups(),
            &[PowerUpKind::Bomb, PowerUpKind::Freeze, PowerUpKind::Transform]
        );
    }

    #[test]
    fn test_power_ups_need_playing_state() {
        let mut session = playing(one_move_board());
        session.grant_power_up(PowerUpKind::Bomb);
        session.pause();
        assert!(session
            .activate_power_up(PowerUpKind::Bomb, Some(pos(4, 4)))
            .is_none());
        assert_eq!(session.available_power_ups(), &[PowerUpKind::Bomb]);
    }

    #[test]
    fn test_reset_returns_to_menu() {
        let mut session = playing(one_move_board());
        session.attempt_move(pos(0, 2), pos(0, 3));
        session.grant_power_up(PowerUpKind::Bomb);
        session.reset();
        assert_eq!(session.state(), SessionState::Menu);
        assert_eq!(session.score(), 0);
        assert_eq!(session.combo(), 1);
        assert!(session.available_power_ups().is_empty());
        assert!(session.active_power_ups().is_empty());
        assert_eq!(session.level_progress(), 0.0);
    }

    #[test]
    fn test_level_progress() {
        let mut session = SessionController::with_board(one_move_board(), level_with(900, 30), 2);
        assert_eq!(session.level_progress(), 0.0);
        session.attempt_move(pos(0, 2), pos(0, 3));
        assert!(session.level_progress() >= 0.5);
    }
}

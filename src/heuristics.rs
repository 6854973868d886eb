use crate::engine::{all_positions, Board, GridPosition, BOARD_SIZE};
use crate::hints::{find_possible_moves, PossibleMove};
use crate::matching::find_all_matches;
use crate::moves::{is_legal, swapped_copy};
use crate::powerups::PowerUpKind;
use crate::scoring::potential_score;
use crate::session::{MoveOutcome, SessionController, SessionEnd};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

/// A rule for picking the next swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AutoplayPolicy {
    /// The top-ranked hint.
    BestHint,
    /// The swap that forms the most groups.
    MostMatches,
    /// The first legal swap in scan order.
    FirstLegal,
    /// A uniformly random legal swap.
    RandomLegal,
}

impl AutoplayPolicy {
    pub const ALL: [AutoplayPolicy; 4] = [
        AutoplayPolicy::BestHint,
        AutoplayPolicy::MostMatches,
        AutoplayPolicy::FirstLegal,
        AutoplayPolicy::RandomLegal,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AutoplayPolicy::BestHint => "BestHint",
            AutoplayPolicy::MostMatches => "MostMatches",
            AutoplayPolicy::FirstLegal => "FirstLegal",
            AutoplayPolicy::RandomLegal => "RandomLegal",
        }
    }

    /// Picks a swap on `board`, or `None` when there is no legal swap.
    pub fn choose<R: Rng + ?Sized>(self, board: &Board, rng: &mut R) -> Option<PossibleMove> {
        match self {
            AutoplayPolicy::BestHint => choose_move_best_hint(board),
            AutoplayPolicy::MostMatches => choose_move_most_matches(board),
            AutoplayPolicy::FirstLegal => choose_move_first_legal(board),
            AutoplayPolicy::RandomLegal => choose_move_random_legal(board, rng),
        }
    }
}

/// Counts the legal swaps on the board, each unordered pair once.
pub fn count_legal_moves(board: &Board) -> usize {
    find_possible_moves(board).len()
}

/// Chooses the swap with the highest potential score (the hint a player would be shown).
///
/// # Returns
/// The chosen move, or `None` if the board has no legal swap.
pub fn choose_move_best_hint(board: &Board) -> Option<PossibleMove> {
    find_possible_moves(board).into_iter().next()
}

/// Chooses the swap that forms the most groups at once.
///
/// Ties go to the higher potential score, then to the earlier move in hint order.
pub fn choose_move_most_matches(board: &Board) -> Option<PossibleMove> {
    let moves = find_possible_moves(board);
    let mut best: Option<PossibleMove> = None;
    for candidate in moves {
        let better = match best {
            None => true,
            Some(current) => {
                (candidate.match_count, candidate.potential_score)
                    > (current.match_count, current.potential_score)
            }
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

/// Chooses the first legal swap met while scanning cells row-major and neighbours in up,
/// down, left, right order.
pub fn choose_move_first_legal(board: &Board) -> Option<PossibleMove> {
    all_positions()
        .flat_map(|from| from.neighbors().into_iter().map(move |to| (from, to)))
        .find(|&(from, to)| is_legal(board, from, to))
        .map(|(from, to)| describe_move(board, from, to))
}

/// Chooses uniformly among all legal swaps.
pub fn choose_move_random_legal<R: Rng + ?Sized>(
    board: &Board,
    rng: &mut R,
) -> Option<PossibleMove> {
    find_possible_moves(board).choose(rng).copied()
}

/// Plays `session` with `policy` until it ends or the policy has no move left.
///
/// After every swap the session clock advances by `seconds_per_move`. When the board has no
/// legal swap, any held power-up is used (bombs aim at the board centre) before giving up.
///
/// # Returns
/// The `SessionEnd` if the session finished, or `None` if play stopped on an exhausted board.
pub fn play_out<R: Rng + ?Sized>(
    session: &mut SessionController,
    policy: AutoplayPolicy,
    rng: &mut R,
    seconds_per_move: f64,
) -> Option<SessionEnd> {
    while session.can_move() {
        let Some(choice) = policy.choose(session.board(), rng) else {
            let Some(&kind) = session.available_power_ups().first() else {
                debug!(policy = policy.name(), "no legal move left");
                return None;
            };
            let target = (kind == PowerUpKind::Bomb)
                .then_some(GridPosition::new(BOARD_SIZE / 2, BOARD_SIZE / 2));
            let activation = session.activate_power_up(kind, target)?;
            if activation.session_end.is_some() {
                return activation.session_end;
            }
            continue;
        };

        match session.attempt_move(choice.from, choice.to) {
            MoveOutcome::Applied(report) => {
                if report.session_end.is_some() {
                    return report.session_end;
                }
            }
            MoveOutcome::Rejected(reason) => {
                warn!(policy = policy.name(), %reason, "policy chose a rejected move");
                return None;
            }
        }
        if let Some(end) = session.tick(seconds_per_move) {
            return Some(end);
        }
    }
    None
}

fn describe_move(board: &Board, from: GridPosition, to: GridPosition) -> PossibleMove {
    let groups = find_all_matches(&swapped_copy(board, from, to));
    PossibleMove {
        from,
        to,
        potential_score: potential_score(&groups, 1),
        match_count: groups.len(),
    }
}

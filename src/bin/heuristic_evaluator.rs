use anyhow::Result;
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use sphere_match::heuristics::{play_out, AutoplayPolicy};
use sphere_match::session::SessionController;
use std::collections::HashMap;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Compare autoplay policies over seeded sessions", long_about = None)]
struct Args {
    /// Number of seeded sessions per policy
    #[clap(short, long, default_value_t = 20)]
    games: u64,

    /// Level to play
    #[clap(short, long, default_value_t = 1)]
    level: u32,

    /// First seed; session `i` uses `start_seed + i`
    #[clap(long, default_value_t = 0)]
    start_seed: u64,

    /// Simulated seconds spent on each move
    #[clap(long, default_value_t = 1.5)]
    seconds_per_move: f64,
}

#[derive(Default)]
struct PolicyStats {
    scores: Vec<u32>,
    wins: u32,
    exhausted: u32,
}

/// Seed of session `game_idx`, wrapping past `u64::MAX`.
fn session_seed(start_seed: u64, game_idx: u64) -> u64 {
    start_seed.wrapping_add(game_idx)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut stats: HashMap<&str, PolicyStats> = HashMap::new();

    println!(
        "Starting policy evaluation: {} sessions of level {}...",
        args.games, args.level
    );

    for game_idx in 0..args.games {
        let seed = session_seed(args.start_seed, game_idx);
        println!("\nEvaluating session {} (Seed: {})", game_idx, seed);

        for policy in AutoplayPolicy::ALL {
            // Same seed for every policy, so each one starts from the same board.
            let mut session = SessionController::new(seed);
            session.start_new_game(args.level);
            let mut policy_rng = SmallRng::seed_from_u64(seed);

            let end = play_out(&mut session, policy, &mut policy_rng, args.seconds_per_move);
            let entry = stats.entry(policy.name()).or_default();
            entry.scores.push(session.score());
            match end {
                Some(end) if end.won => entry.wins += 1,
                Some(_) => {}
                None => {
                    warn!(policy = policy.name(), seed, "session stopped on an exhausted board");
                    entry.exhausted += 1;
                }
            }
            println!(
                "  Policy: {:<12}, Score: {:<7}, Moves left: {:<3}, Result: {}",
                policy.name(),
                session.score(),
                session.moves_left(),
                match end {
                    Some(end) if end.won => "won",
                    Some(_) => "lost",
                    None => "exhausted",
                }
            );
        }
    }

    println!("\n--- Evaluation Complete ---");
    println!("Sessions per policy: {}", args.games);
    println!("\n--- Average Scores ---");

    let mut summary: Vec<(&str, f64, f64, u32)> = stats
        .iter()
        .filter(|(_, s)| !s.scores.is_empty())
        .map(|(name, s)| {
            let total: u64 = s.scores.iter().map(|&v| v as u64).sum();
            let avg = total as f64 / s.scores.len() as f64;
            let win_rate = s.wins as f64 / s.scores.len() as f64;
            (*name, avg, win_rate, s.exhausted)
        })
        .collect();

    summary.sort_by(|a, b| b.1.total_cmp(&a.1));

    for (name, avg, win_rate, exhausted) in summary {
        println!(
            "Policy {:<12}: Average Score = {:.2}, Win Rate = {:.1}%, Exhausted = {}",
            name,
            avg,
            win_rate * 100.0,
            exhausted
        );
    }
    Ok(())
}

use anyhow::Result;
use clap::Parser;
use sphere_match::engine::{GridPosition, BOARD_SIZE};
use sphere_match::hints::best_move;
use sphere_match::powerups::PowerUpKind;
use sphere_match::session::{MoveOutcome, SessionController, SessionEnd, TurnReport};
use std::io::{self, BufRead, Write};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Play a level of Sphere Match in the terminal", long_about = None)]
struct Args {
    /// Level to play
    #[clap(short, long, default_value_t = 1)]
    level: u32,

    /// Seed for the board and refills (defaults to the current time)
    #[clap(short, long)]
    seed: Option<u64>,
}

fn parse_power_up(name: &str) -> Option<PowerUpKind> {
    match name.to_ascii_lowercase().as_str() {
        "lightning" | "l" => Some(PowerUpKind::Lightning),
        "transform" | "t" => Some(PowerUpKind::Transform),
        "timeboost" | "time" => Some(PowerUpKind::TimeBoost),
        "multiplier" | "m" => Some(PowerUpKind::Multiplier),
        "bomb" | "b" => Some(PowerUpKind::Bomb),
        "freeze" | "f" => Some(PowerUpKind::Freeze),
        _ => None,
    }
}

fn parse_coords(parts: &[&str]) -> Option<Vec<usize>> {
    parts.iter().map(|p| p.parse::<usize>().ok()).collect()
}

fn print_turn(report: &TurnReport) {
    for (i, wave) in report.waves.iter().enumerate() {
        println!(
            "  Wave {}: {} cleared, patterns [{}], combo x{}, +{}",
            i + 1,
            wave.cleared.len(),
            wave.patterns.join(", "),
            wave.combo_multiplier,
            wave.points
        );
    }
    for kind in &report.spawned_power_ups {
        println!("  Power-up gained: {}", kind.name());
    }
    if report.board_exhausted {
        println!("  No legal swaps remain on this board.");
    }
}

fn print_end(end: &SessionEnd) -> Result<()> {
    println!("---------------------");
    if end.won {
        println!("LEVEL {} COMPLETE!", end.level);
    } else {
        println!("GAME OVER on level {}", end.level);
    }
    println!("Final Score: {}", end.final_score);
    println!("{}", serde_json::to_string_pretty(end)?);
    println!("---------------------");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let seed = match args.seed {
        Some(seed) => seed,
        None => std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)?
            .as_secs(),
    };

    let mut session = SessionController::new(seed);
    session.start_new_game(args.level);
    println!("Welcome to Sphere Match! {} (seed {})", session.level().name(), seed);
    println!(
        "Reach {} points in {} moves and {:.0} seconds.",
        session.level().target_score,
        session.level().max_moves,
        session.level().time_limit
    );

    let stdin = io::stdin();
    let mut last_tick = Instant::now();
    loop {
        let elapsed = last_tick.elapsed().as_secs_f64();
        last_tick = Instant::now();
        if let Some(end) = session.tick(elapsed) {
            print_end(&end)?;
            break;
        }

        println!("---------------------");
        println!(
            "Score: {}/{}, Moves: {}, Time: {:.1}s, Combo: x{}",
            session.score(),
            session.level().target_score,
            session.moves_left(),
            session.time_remaining(),
            session.combo()
        );
        if !session.available_power_ups().is_empty() {
            let names: Vec<&str> = session
                .available_power_ups()
                .iter()
                .map(|k| k.name())
                .collect();
            println!("Power-ups: {}", names.join(", "));
        }
        println!("{}", session.board().to_string_with_highlight(session.selected()));

        print!("Enter 'r1 c1 r2 c2' to swap, 'h' for a hint, 'p <power-up> [row col]', or 'q' to quit: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();

        match parts.as_slice() {
            ["q"] => {
                println!("Thanks for playing!");
                break;
            }
            ["h"] => match best_move(session.board()) {
                Some(hint) => println!(
                    "Hint: swap {} with {} (worth about {} points)",
                    hint.from, hint.to, hint.potential_score
                ),
                None => println!("No legal swaps on this board."),
            },
            ["p", name, rest @ ..] => {
                let Some(kind) = parse_power_up(name) else {
                    println!("Unknown power-up '{}'.", name);
                    continue;
                };
                let target = match parse_coords(rest).as_deref() {
                    Some([r, c]) => Some(GridPosition::new(*r, *c)),
                    _ => None,
                };
                if kind.needs_target() && target.is_none() {
                    println!("{} needs a target: 'p {} row col'.", kind.name(), name);
                    continue;
                }
                match session.activate_power_up(kind, target) {
                    Some(activation) => {
                        println!(
                            "{} used: {} spheres affected, +{} points",
                            kind.name(),
                            activation.result.affected.len(),
                            activation.points
                        );
                        if let Some(end) = activation.session_end {
                            print_end(&end)?;
                            break;
                        }
                    }
                    None => println!("You don't have a {} power-up.", kind.name()),
                }
            }
            coords if coords.len() == 4 => {
                let Some(values) = parse_coords(coords) else {
                    println!("Invalid input: coordinates must be numbers.");
                    continue;
                };
                if values.iter().any(|&v| v >= BOARD_SIZE) {
                    println!(
                        "Invalid coordinates: row and column must be between 0 and {}.",
                        BOARD_SIZE - 1
                    );
                    continue;
                }
                let from = GridPosition::new(values[0], values[1]);
                let to = GridPosition::new(values[2], values[3]);
                match session.attempt_move(from, to) {
                    MoveOutcome::Applied(report) => {
                        println!("Swap applied: +{} points", report.points);
                        print_turn(&report);
                        if let Some(end) = report.session_end {
                            print_end(&end)?;
                            break;
                        }
                    }
                    MoveOutcome::Rejected(reason) => println!("Invalid move: {}.", reason),
                }
            }
            _ => println!("Invalid input format. Use 'r1 c1 r2 c2', 'h', 'p <power-up> [row col]', or 'q'."),
        }
    }
    Ok(())
}

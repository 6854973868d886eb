use anyhow::{Context, Result};
use clap::Parser;
use sphere_match::hints::find_possible_moves;
use sphere_match::matching::find_all_matches;
use sphere_match::moves::matches_after_swap;
use sphere_match::utils::board_from_text;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Rank every legal swap on a board", long_about = None)]
struct Args {
    /// Number of moves to list
    #[clap(short, long, default_value_t = 5)]
    top: usize,

    /// Print the ranking as JSON instead of text
    #[clap(long)]
    json: bool,

    /// Path to the board file (one row per line, letters C G P O Y K, '.' for empty)
    board_file: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let content = fs::read_to_string(&args.board_file)
        .with_context(|| format!("failed to read {}", args.board_file.display()))?;
    let board = board_from_text(&content)
        .with_context(|| format!("invalid board in {}", args.board_file.display()))?;

    let moves = find_possible_moves(&board);
    let shown: Vec<_> = moves.iter().take(args.top).copied().collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    println!("Loaded board from {}\n", args.board_file.display());
    println!("{}\n", board);

    let existing = find_all_matches(&board);
    if !existing.is_empty() {
        println!(
            "Warning: the board already contains {} match(es); it has not settled.\n",
            existing.len()
        );
    }

    if moves.is_empty() {
        println!("No legal moves. The board is exhausted.");
        return Ok(());
    }

    println!("Legal moves: {} (showing {})", moves.len(), shown.len());
    for (i, m) in shown.iter().enumerate() {
        let patterns: Vec<&str> = matches_after_swap(&board, m.from, m.to)
            .iter()
            .map(|g| g.pattern.name())
            .collect();
        println!(
            "  {}. swap {} with {}: {} points, {} group(s) [{}]",
            i + 1,
            m.from,
            m.to,
            m.potential_score,
            m.match_count,
            patterns.join(", ")
        );
    }
    Ok(())
}

use std::fs::File;
use std::io::{self, BufReader, BufWriter};

use clap::{Parser, Subcommand};
use tracing::info;

use keccak_trail_search::usecases::{
    bruteforce_in_kernel, count_in_kernel_trails, count_trail_cores, extend_from_bruteforce, find_trails,
};

/// Search for low-weight differential trail cores in a Keccak-f[4x16]-style
/// permutation and extend them into full trails.
#[derive(Parser)]
#[command(name = "keccak-trail-search")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Number of rounds a full trail should span.
    #[arg(long, global = true, default_value_t = 5)]
    rounds: u32,

    /// Maximum total Hamming weight admitted anywhere in the search.
    #[arg(long, global = true, default_value_t = 30)]
    max_weight: u32,
}

#[derive(Subcommand)]
enum Command {
    /// Count two-round trail cores by weight.
    CountCores,
    /// Search for the lowest-weight full trail, dispatching one extension
    /// task per two-round core.
    FindBest,
    /// Count and print in-kernel trails reachable from every two-round core.
    CountInKernel,
    /// Extend two-round cores read from a brute-force log file.
    ExtendBruteforce {
        /// Path to a brute-force binary log (16-byte records).
        path: String,
    },
    /// Exhaustively search the kernel for the lowest-weight two-round core.
    BruteforceInKernel,
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Command::CountCores => {
            let (counts, kernel_counts) = count_trail_cores(cli.max_weight);
            for (weight, count) in counts.iter().enumerate() {
                println!("{weight}: {count}");
            }
            println!("------------");
            for (weight, count) in kernel_counts.iter().enumerate() {
                println!("{weight}: {count}");
            }
        }
        Command::FindBest => {
            let best = find_trails(cli.rounds, cli.max_weight);
            println!("Best trail:\n{best}");
        }
        Command::CountInKernel => {
            let (stats, trails) = count_in_kernel_trails(cli.rounds, cli.max_weight);
            for trail in &trails {
                println!("{trail}");
            }
            info!(?stats, "weight histogram");
        }
        Command::ExtendBruteforce { path } => {
            let mut input = BufReader::new(File::open(&path)?);
            let best = extend_from_bruteforce(&mut input, cli.rounds, cli.max_weight)?;
            println!("Best trail:\n{best}");
        }
        Command::BruteforceInKernel => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            let found = bruteforce_in_kernel(cli.max_weight, &mut out)
                .map_err(|e| io::Error::other(e.to_string()))?;
            info!(found, "in-kernel two-round cores");
        }
    }

    Ok(())
}



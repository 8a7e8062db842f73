mod output;
mod query;
mod replay;
mod solve;
mod spec;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "rsolv")]
#[command(about = "Resolve package transactions against a JSON universe")]
#[command(version)]
struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve install/erase/upgrade requests into a transaction
    Solve(solve::SolveArgs),

    /// List the packages a spec matches
    Query(query::QueryArgs),

    /// Re-run a solver testcase written with --debug-dir
    Replay(replay::ReplayArgs),
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).format_timestamp(None);
    // RUST_LOG refines the -v level
    builder.parse_default_env();
    builder.init();
}

fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Solve(solve_args) => solve::execute(solve_args),
        Commands::Query(query_args) => query::execute(query_args),
        Commands::Replay(replay_args) => replay::execute(replay_args),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

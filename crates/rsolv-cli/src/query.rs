use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use rsolv_goal::Universe;

use crate::output::{entry, Entry};
use crate::spec;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Universe file (JSON)
    pub universe: PathBuf,

    /// Package spec: name, glob, `name op evr` or file path
    pub spec: String,

    /// Only list installed packages
    #[arg(long)]
    pub installed: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: QueryArgs) -> Result<i32> {
    let universe = Universe::from_file(&args.universe)
        .with_context(|| format!("Failed to load universe {}", args.universe.display()))?;

    let sltr = spec::selector(&universe, &args.spec)?;
    let matches = sltr
        .matches(&universe)
        .with_context(|| format!("Invalid spec {}", args.spec))?;

    let entries: Vec<Entry> = matches
        .iter()
        .filter(|&id| !args.installed || universe.is_installed(id))
        .map(|id| entry(&universe, id, None))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        eprintln!("{} No package matches {}", "Warning:".yellow().bold(), args.spec);
    } else {
        for e in &entries {
            println!("{} {}", e.package.cyan(), e.repo.dimmed());
        }
    }

    Ok(if entries.is_empty() { 1 } else { 0 })
}

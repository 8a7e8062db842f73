//! Replay command - re-run a recorded solver testcase and compare the outcome.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use rsolv_goal::solver::{Solver, Testcase, TestcaseResult};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Directory holding testcase.json
    pub dir: PathBuf,
}

pub fn execute(args: ReplayArgs) -> Result<i32> {
    let testcase = Testcase::read(&args.dir)
        .with_context(|| format!("Failed to read testcase from {}", args.dir.display()))?;
    let universe = testcase.to_universe()?;
    let job = testcase.to_job(&universe)?;

    let mut solver = Solver::with_flags(&universe, testcase.flags);
    let solved = solver.solve(&job);
    let result = TestcaseResult::from_solver(&solver);

    for step in &result.transaction {
        println!("  {} {}", step.step.to_string().bold(), step.package);
    }
    for (index, problem) in result.problems.iter().enumerate() {
        println!(" Problem {}:", index + 1);
        for line in problem {
            println!("  - {}", line);
        }
    }

    match &testcase.result {
        Some(recorded) if recorded == &result => {
            println!("{}", "Result matches the recorded one.".green());
            Ok(0)
        }
        Some(_) => {
            println!("{}", "Result differs from the recorded one.".red().bold());
            Ok(1)
        }
        None => Ok(if solved { 0 } else { 1 }),
    }
}

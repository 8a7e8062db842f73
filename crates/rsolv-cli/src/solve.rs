//! Solve command - resolve requests against a universe file.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use rsolv_goal::config::ConfigLoader;
use rsolv_goal::{Goal, GoalActions, GoalError, Universe};

use crate::output::{print_problems, Report};
use crate::spec;

#[derive(Args, Debug)]
pub struct SolveArgs {
    /// Universe file (JSON)
    pub universe: PathBuf,

    /// Packages to install
    #[arg(short, long, value_name = "SPEC")]
    pub install: Vec<String>,

    /// Packages to install if possible
    #[arg(long, value_name = "SPEC")]
    pub install_optional: Vec<String>,

    /// Packages to remove
    #[arg(short, long, value_name = "SPEC")]
    pub erase: Vec<String>,

    /// Packages to upgrade
    #[arg(short, long, value_name = "SPEC")]
    pub upgrade: Vec<String>,

    /// Upgrade every installed package
    #[arg(long)]
    pub upgrade_all: bool,

    /// Synchronize installed packages with the repositories
    #[arg(long)]
    pub distupgrade: bool,

    /// Install only the best candidate of every request
    #[arg(long)]
    pub best: bool,

    /// Allow removing installed packages to satisfy the requests
    #[arg(long)]
    pub allowerasing: bool,

    /// Do not install recommended packages
    #[arg(long)]
    pub no_recommends: bool,

    /// Check the dependencies of installed packages too
    #[arg(long)]
    pub verify: bool,

    /// Directory holding rsolv.json
    #[arg(short = 'c', long, default_value = ".")]
    pub config_dir: PathBuf,

    /// Ignore RSOLV_* environment variables
    #[arg(long)]
    pub no_env: bool,

    /// Write the solver testcase into this directory
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl SolveArgs {
    fn run_flags(&self) -> GoalActions {
        let mut flags = GoalActions::empty();
        if self.best {
            flags |= GoalActions::FORCE_BEST;
        }
        if self.allowerasing {
            flags |= GoalActions::ALLOW_UNINSTALL;
        }
        if self.no_recommends {
            flags |= GoalActions::IGNORE_WEAK_DEPS;
        }
        if self.verify {
            flags |= GoalActions::VERIFY;
        }
        flags
    }
}

pub fn execute(args: SolveArgs) -> Result<i32> {
    let mut universe = Universe::from_file(&args.universe)
        .with_context(|| format!("Failed to load universe {}", args.universe.display()))?;

    let mut config = ConfigLoader::new(!args.no_env)
        .load(&args.config_dir)
        .context("Failed to load configuration")?;
    if let Some(dir) = &args.debug_dir {
        config.debug_solver_dir = Some(dir.clone());
    }

    // install-only settings of the universe file win over the configuration
    if universe.installonly().is_empty() {
        config.apply(&mut universe);
    } else if universe.kernel_release().is_none() {
        universe.set_kernel_release(config.kernel_release.clone().or_else(Universe::detect_kernel_release));
    }

    let mut goal = Goal::with_config(&universe, &config)?;
    for s in &args.install {
        goal.install_selector(&spec::selector(&universe, s)?, false)
            .with_context(|| format!("Invalid install spec {}", s))?;
    }
    for s in &args.install_optional {
        goal.install_selector(&spec::selector(&universe, s)?, true)
            .with_context(|| format!("Invalid install spec {}", s))?;
    }
    for s in &args.erase {
        goal.erase_selector(&spec::selector(&universe, s)?, config.erase_flags())
            .with_context(|| format!("Invalid erase spec {}", s))?;
    }
    for s in &args.upgrade {
        goal.upgrade_selector(&spec::selector(&universe, s)?)
            .with_context(|| format!("Invalid upgrade spec {}", s))?;
    }
    if args.upgrade_all {
        goal.upgrade_all();
    }
    if args.distupgrade {
        goal.distupgrade_all()?;
    }

    log::info!("Resolving {} staged job entries", goal.job_length());

    match goal.run(args.run_flags()) {
        Ok(()) => {}
        Err(GoalError::NoSolutionPossible | GoalError::RemovalOfProtectedPackage) => {
            print_problems(&goal)?;
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    }

    if log::log_enabled!(log::Level::Debug) {
        goal.log_decisions()?;
    }

    let report = Report::from_goal(&goal)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }

    if let Some(dir) = &args.debug_dir {
        println!("{} {}", "Debug data written to".dimmed(), dir.display());
    }
    Ok(0)
}

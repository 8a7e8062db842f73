use colored::Colorize;
use serde::Serialize;

use rsolv_goal::{Goal, PackageId, Universe};

/// One listed package of a resolved goal
#[derive(Debug, Serialize)]
pub struct Entry {
    pub package: String,
    pub repo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Resolved goal listings, in the order they are printed
#[derive(Debug, Default, Serialize)]
pub struct Report {
    pub install: Vec<Entry>,
    pub upgrade: Vec<Entry>,
    pub downgrade: Vec<Entry>,
    pub reinstall: Vec<Entry>,
    pub erase: Vec<Entry>,
    pub obsoleted: Vec<Entry>,
}

impl Report {
    pub fn from_goal(goal: &Goal<'_>) -> anyhow::Result<Self> {
        let universe = goal.universe();
        let entries = |ids: Vec<PackageId>, with_reason: bool| -> Vec<Entry> {
            ids.into_iter()
                .map(|id| entry(universe, id, with_reason.then(|| goal.get_reason(id).to_string())))
                .collect()
        };

        Ok(Self {
            install: entries(goal.list_installs()?, true),
            upgrade: entries(goal.list_upgrades()?, false),
            downgrade: entries(goal.list_downgrades()?, false),
            reinstall: entries(goal.list_reinstalls()?, false),
            erase: entries(goal.list_erasures()?, true),
            obsoleted: entries(goal.list_obsoleted()?, false),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.sections().iter().all(|(_, entries)| entries.is_empty())
    }

    fn sections(&self) -> [(&'static str, &[Entry]); 6] {
        [
            ("Installing", self.install.as_slice()),
            ("Upgrading", self.upgrade.as_slice()),
            ("Downgrading", self.downgrade.as_slice()),
            ("Reinstalling", self.reinstall.as_slice()),
            ("Removing", self.erase.as_slice()),
            ("Obsoleting", self.obsoleted.as_slice()),
        ]
    }

    pub fn print(&self) {
        if self.is_empty() {
            println!("{}", "Nothing to do.".green());
            return;
        }

        for (title, entries) in self.sections() {
            if entries.is_empty() {
                continue;
            }
            println!("{}:", title.bold());
            for entry in entries {
                let reason = entry
                    .reason
                    .as_deref()
                    .map(|r| format!(" ({})", r).dimmed().to_string())
                    .unwrap_or_default();
                println!("  {} {}{}", entry.package.cyan(), entry.repo.dimmed(), reason);
            }
        }
    }
}

pub fn entry(universe: &Universe, id: PackageId, reason: Option<String>) -> Entry {
    let (package, repo) = match universe.package(id) {
        Some(p) => (
            p.nevra(),
            universe.package_repo(id).map(|r| r.name.clone()).unwrap_or_default(),
        ),
        None => (format!("#{}", id), String::new()),
    };
    Entry { package, repo, reason }
}

/// Print every problem of a failed goal to stderr
pub fn print_problems(goal: &Goal<'_>) -> anyhow::Result<()> {
    let count = goal.count_problems();
    eprintln!("{} {} problem(s) found", "Error:".red().bold(), count);
    for index in 0..count {
        eprintln!(" Problem {}:", index + 1);
        for line in goal.describe_problem_rules(index)? {
            eprintln!("  - {}", line);
        }
    }
    Ok(())
}

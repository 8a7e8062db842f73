//! Self-contained solver testcases for offline replay.
//!
//! A testcase captures the universe, the job and the flags of one solver run together
//! with its outcome. Packages are referenced by their `nevra@repo` key so that a
//! testcase stays valid when loaded into a fresh universe.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rsolv_evr::Relation;
use serde::{Deserialize, Serialize};

use super::solver::{Solver, SolverFlags};
use super::transaction::{StepType, TransactionMode};
use crate::error::{GoalError, Result};
use crate::job::{Job, JobAction, JobEntry, JobFlags, JobTarget};
use crate::universe::{PackageId, PackageSet, Universe, UniverseFile};

pub const TESTCASE_FILE: &str = "testcase.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testcase {
    pub universe: UniverseFile,
    pub job: Vec<JobSpec>,
    #[serde(default)]
    pub flags: SolverFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TestcaseResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub action: JobAction,
    pub target: TargetSpec,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TargetSpec {
    Solvable {
        package: String,
    },
    OneOf {
        packages: Vec<String>,
    },
    Name {
        relation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arch: Option<String>,
    },
    Provides {
        relation: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arch: Option<String>,
    },
    Repo {
        name: String,
    },
    All,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestcaseResult {
    #[serde(default)]
    pub transaction: Vec<StepSpec>,
    #[serde(default)]
    pub problems: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub package: String,
    pub step: StepType,
}

const RESULT_MODE: TransactionMode = TransactionMode::SHOW_ACTIVE;

impl Testcase {
    /// Capture a solver after `solve`
    pub fn from_solver(solver: &Solver<'_>) -> Self {
        let universe = solver.universe();
        let job = solver
            .job()
            .iter()
            .map(|entry| JobSpec {
                action: entry.action,
                target: target_spec(universe, &entry.target),
                flags: entry.flags.names().into_iter().map(str::to_string).collect(),
            })
            .collect();

        Self {
            universe: universe.to_spec(),
            job,
            flags: solver.flags(),
            result: Some(TestcaseResult::from_solver(solver)),
        }
    }

    /// Write `testcase.json` into `dir`, creating it if needed
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> io::Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let path = dir.join(TESTCASE_FILE);
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    /// Load `testcase.json` from `dir`
    pub fn read<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(TESTCASE_FILE);
        let contents = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn to_universe(&self) -> Result<Universe> {
        Universe::from_spec(&self.universe)
    }

    /// Rebuild the job against a universe loaded from this testcase
    pub fn to_job(&self, universe: &Universe) -> Result<Job> {
        let mut job = Job::new();
        for spec in &self.job {
            let mut flags = JobFlags::empty();
            for name in &spec.flags {
                flags |= JobFlags::from_name(name)
                    .ok_or_else(|| GoalError::Config(format!("unknown job flag {}", name)))?;
            }
            job.push(JobEntry::new(spec.action, job_target(universe, &spec.target)?, flags));
        }
        Ok(job)
    }
}

impl TestcaseResult {
    pub fn from_solver(solver: &Solver<'_>) -> Self {
        let universe = solver.universe();
        let problems = solver
            .problems()
            .iter()
            .map(|problem| problem.describe(universe, solver.rules()))
            .collect();

        let transaction = if solver.is_solved() {
            let transaction = solver.create_transaction();
            transaction
                .steps()
                .iter()
                .filter_map(|step| {
                    let step_type = transaction.step_type(step.id, RESULT_MODE);
                    let package = universe.package_key(step.id)?;
                    (step_type != StepType::Ignore).then_some(StepSpec {
                        package,
                        step: step_type,
                    })
                })
                .collect()
        } else {
            Vec::new()
        };

        Self { transaction, problems }
    }
}

fn key(universe: &Universe, id: PackageId) -> String {
    universe.package_key(id).unwrap_or_else(|| format!("#{}", id))
}

fn target_spec(universe: &Universe, target: &JobTarget) -> TargetSpec {
    match target {
        JobTarget::Solvable(id) => TargetSpec::Solvable {
            package: key(universe, *id),
        },
        JobTarget::OneOf(set) => TargetSpec::OneOf {
            packages: set.iter().map(|id| key(universe, id)).collect(),
        },
        JobTarget::Name { relation, arch } => TargetSpec::Name {
            relation: relation.to_string(),
            arch: arch.clone(),
        },
        JobTarget::Provides { relation, arch } => TargetSpec::Provides {
            relation: relation.to_string(),
            arch: arch.clone(),
        },
        JobTarget::Repo(name) => TargetSpec::Repo { name: name.clone() },
        JobTarget::All => TargetSpec::All,
    }
}

fn job_target(universe: &Universe, spec: &TargetSpec) -> Result<JobTarget> {
    let find = |key: &str| {
        universe
            .find_key(key)
            .ok_or_else(|| GoalError::UnknownPackage(key.to_string()))
    };

    Ok(match spec {
        TargetSpec::Solvable { package } => JobTarget::Solvable(find(package)?),
        TargetSpec::OneOf { packages } => {
            let mut set = PackageSet::new();
            for package in packages {
                set.set(find(package)?);
            }
            JobTarget::OneOf(set)
        }
        TargetSpec::Name { relation, arch } => JobTarget::Name {
            relation: Relation::parse(relation)?,
            arch: arch.clone(),
        },
        TargetSpec::Provides { relation, arch } => JobTarget::Provides {
            relation: Relation::parse(relation)?,
            arch: arch.clone(),
        },
        TargetSpec::Repo { name } => JobTarget::Repo(name.clone()),
        TargetSpec::All => JobTarget::All,
    })
}

//! SAT-based transaction resolver for rpm-style packages.
//!
//! # Architecture
//!
//! - [`RuleGenerator`]: turns the job and the universe into SAT clauses
//! - [`RuleSet`]: the clauses, typed by where they came from
//! - [`Solver`]: propagation and backtracking search, problem minimization,
//!   clean-deps post-processing
//! - [`Transaction`]: the typed steps of a successful solve
//! - [`Testcase`]: a replayable snapshot of one solver run
//!
//! # Algorithm Overview
//!
//! 1. **Rule Generation**: job rules, keep/update/distupgrade rules for installed
//!    packages, package rules for everything reachable
//! 2. **Unit Propagation**: two watched literals per rule
//! 3. **Decision Making**: branch on the first unsatisfied rule, candidates ordered by
//!    [`Policy`]; then weak dependencies; then installed packages
//! 4. **Backtracking**: chronological, over the recorded alternatives
//! 5. **Problems**: an unsatisfiable rule set is reduced to a minimal core; weak job
//!    rules in the core are dropped silently, otherwise the core is reported and one
//!    of its job rules disabled before searching again
//!
//! # Example
//!
//! ```ignore
//! use rsolv_goal::job::{Job, JobAction, JobEntry, JobFlags, JobTarget};
//! use rsolv_goal::solver::Solver;
//!
//! let mut job = Job::new();
//! job.push(JobEntry::new(JobAction::Install, JobTarget::name("httpd"), JobFlags::empty()));
//!
//! let mut solver = Solver::new(&universe);
//! if solver.solve(&job) {
//!     let transaction = solver.create_transaction();
//! }
//! ```

mod decisions;
mod policy;
mod problem;
mod rule;
mod rule_generator;
mod rule_set;
#[allow(clippy::module_inception)]
mod solver;
mod testcase;
mod transaction;
mod watch_graph;


pub use decisions::{Decisions, Reason};
pub use policy::{Policy, Preference};
pub use problem::{describe_rule_info, Problem};
pub use rule::{Literal, Rule, RuleClass, RuleInfo, RuleType};
pub use rule_generator::{JobContext, RuleGenerator};
pub use rule_set::{RuleSet, RuleSetStats};
pub use solver::{DecisionReason, Solver, SolverFlags};
pub use testcase::{JobSpec, StepSpec, TargetSpec, Testcase, TestcaseResult, TESTCASE_FILE};
pub use transaction::{Step, StepType, Transaction, TransactionMode};
pub use watch_graph::{PropagateResult, WatchGraph};

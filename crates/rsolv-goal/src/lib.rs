pub mod config;
pub mod diagnostics;
pub mod error;
pub mod goal;
pub mod job;
pub mod selector;
pub mod solver;
mod translate;
pub mod universe;

pub use config::{ConfigLoader, ConfigSource, GoalConfig};
pub use diagnostics::{DiagnosticSink, EventType, GoalEvent, LogSink, MemorySink};
pub use error::{GoalError, Result, SelectorError};
pub use goal::{Goal, GoalActions, PackageState, Reason};
pub use job::{Job, JobAction, JobEntry, JobFlags, JobTarget};
pub use selector::{CmpKind, Comparison, Filter, FilterKey, Selector};
pub use solver::{Solver, SolverFlags, StepType, Testcase, Transaction, TransactionMode};
pub use universe::{Package, PackageId, PackageSet, Universe, UniverseFile, DEFAULT_PRIORITY};

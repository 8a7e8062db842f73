//! The goal: staged user requests, resolved into a transaction.
//!
//! A [`Goal`] borrows a [`Universe`], collects install/erase/upgrade/distupgrade
//! requests as job entries and resolves them with [`Goal::run`]. On top of the solver it
//! enforces protected packages, bounds install-only packages and turns solver problems
//! into readable explanations.
//!
//! ```ignore
//! let mut goal = Goal::new(&universe);
//! goal.install_selector(&selector, false)?;
//! goal.run(GoalActions::empty())?;
//! for id in goal.list_installs()? {
//!     println!("installing {}", universe.package(id).unwrap());
//! }
//! ```

mod actions;
mod diagnose;
mod installonly;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use rsolv_evr::Relation;

pub use actions::{GoalActions, PackageState, Reason};

use crate::config::GoalConfig;
use crate::diagnostics::{DiagnosticSink, GoalEvent, LogSink};
use crate::error::{GoalError, Result};
use crate::job::{Job, JobAction, JobEntry, JobFlags, JobTarget};
use crate::selector::Selector;
use crate::solver::{
    DecisionReason, RuleClass, Solver, SolverFlags, StepType, Testcase, Transaction, TransactionMode,
};
use crate::translate::{package_to_job, selector_to_job};
use crate::universe::{PackageId, PackageSet, Universe};

const PROTECTED_REMOVAL_MESSAGE: &str =
    "The operation would result in removing the following protected packages: ";

/// Staged requests against one universe, and the result of the latest run
pub struct Goal<'u> {
    universe: &'u Universe,
    staging: Job,
    actions: GoalActions,
    protected: PackageSet,
    removal_of_protected: PackageSet,
    solver: Option<Solver<'u>>,
    transaction: Option<Transaction>,
    sink: Rc<dyn DiagnosticSink>,
    /// Flags ORed into every run
    default_flags: GoalActions,
    allow_vendor_change: bool,
    debug_dir: Option<PathBuf>,
}

impl Clone for Goal<'_> {
    /// Copies the staged requests and protection state, not the result of a run
    fn clone(&self) -> Self {
        Self {
            universe: self.universe,
            staging: self.staging.clone(),
            actions: self.actions,
            protected: self.protected.clone(),
            removal_of_protected: self.removal_of_protected.clone(),
            solver: None,
            transaction: None,
            sink: Rc::clone(&self.sink),
            default_flags: self.default_flags,
            allow_vendor_change: self.allow_vendor_change,
            debug_dir: self.debug_dir.clone(),
        }
    }
}

impl<'u> Goal<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self::with_sink(universe, Rc::new(LogSink))
    }

    pub fn with_sink(universe: &'u Universe, sink: Rc<dyn DiagnosticSink>) -> Self {
        Self {
            universe,
            staging: Job::new(),
            actions: GoalActions::empty(),
            protected: PackageSet::new(),
            removal_of_protected: PackageSet::new(),
            solver: None,
            transaction: None,
            sink,
            default_flags: GoalActions::empty(),
            allow_vendor_change: true,
            debug_dir: None,
        }
    }

    /// A goal honoring the resolution settings of `config`.
    ///
    /// Protected names are resolved to the installed packages carrying them. The universe
    /// should already have had [`GoalConfig::apply`] called on it.
    pub fn with_config(universe: &'u Universe, config: &GoalConfig) -> Result<Self> {
        let mut goal = Self::new(universe);
        goal.allow_vendor_change = config.allow_vendor_change;
        goal.debug_dir = config.debug_solver_dir.clone();
        if config.best {
            goal.default_flags |= GoalActions::FORCE_BEST;
        }

        let installed = universe.installed();
        for name in &config.protected_packages {
            let relation = Relation::parse(name)?;
            for id in universe.what_provides(&relation) {
                if installed.has(id) {
                    goal.protected.set(id);
                }
            }
        }
        Ok(goal)
    }

    pub fn set_sink(&mut self, sink: Rc<dyn DiagnosticSink>) {
        self.sink = sink;
    }

    pub fn universe(&self) -> &'u Universe {
        self.universe
    }

    // Staging

    pub fn install(&mut self, id: PackageId, optional: bool) {
        self.actions |= GoalActions::INSTALL | GoalActions::ALLOW_DOWNGRADE;
        package_to_job(id, JobAction::Install, weak_flag(optional), &mut self.staging);
    }

    pub fn install_selector(&mut self, sltr: &Selector, optional: bool) -> Result<()> {
        self.actions |= GoalActions::INSTALL | GoalActions::ALLOW_DOWNGRADE;
        selector_to_job(self.universe, sltr, JobAction::Install, weak_flag(optional), &mut self.staging)?;
        Ok(())
    }

    pub fn erase(&mut self, id: PackageId, flags: JobFlags) {
        self.actions |= GoalActions::ERASE;
        self.staging.push(JobEntry::new(
            JobAction::Erase,
            JobTarget::Solvable(id),
            clean_flag(flags),
        ));
    }

    pub fn erase_selector(&mut self, sltr: &Selector, flags: JobFlags) -> Result<()> {
        self.actions |= GoalActions::ERASE;
        selector_to_job(self.universe, sltr, JobAction::Erase, clean_flag(flags), &mut self.staging)?;
        Ok(())
    }

    pub fn upgrade_all(&mut self) {
        self.actions |= GoalActions::UPGRADE_ALL;
        self.staging
            .push(JobEntry::new(JobAction::Update, JobTarget::All, JobFlags::empty()));
    }

    pub fn upgrade(&mut self, id: PackageId) {
        self.actions |= GoalActions::UPGRADE;
        package_to_job(id, JobAction::Update, JobFlags::empty(), &mut self.staging);
    }

    pub fn upgrade_selector(&mut self, sltr: &Selector) -> Result<()> {
        self.actions |= GoalActions::UPGRADE;
        selector_to_job(self.universe, sltr, JobAction::Update, JobFlags::empty(), &mut self.staging)?;
        Ok(())
    }

    /// Synchronize every installed package to the repositories
    pub fn distupgrade_all(&mut self) -> Result<()> {
        self.actions |= GoalActions::DISTUPGRADE | GoalActions::DISTUPGRADE_ALL;
        let mut sltr = Selector::new();
        sltr.set_pkgs(self.universe.installed())?;
        selector_to_job(self.universe, &sltr, JobAction::DistUpgrade, JobFlags::empty(), &mut self.staging)?;
        Ok(())
    }

    pub fn distupgrade(&mut self, id: PackageId) {
        self.actions |= GoalActions::DISTUPGRADE;
        package_to_job(id, JobAction::DistUpgrade, JobFlags::empty(), &mut self.staging);
    }

    pub fn distupgrade_selector(&mut self, sltr: &Selector) -> Result<()> {
        self.actions |= GoalActions::DISTUPGRADE;
        selector_to_job(self.universe, sltr, JobAction::DistUpgrade, JobFlags::empty(), &mut self.staging)?;
        Ok(())
    }

    /// Mark a package as installed on the user's request
    pub fn user_installed(&mut self, id: PackageId) {
        self.staging.push(JobEntry::new(
            JobAction::UserInstalled,
            JobTarget::Solvable(id),
            JobFlags::empty(),
        ));
    }

    pub fn user_installed_set(&mut self, set: &PackageSet) {
        for id in set.iter() {
            self.user_installed(id);
        }
    }

    pub fn job_length(&self) -> usize {
        self.staging.len()
    }

    pub fn has_actions(&self, actions: GoalActions) -> bool {
        self.actions.intersects(actions)
    }

    pub fn actions(&self) -> GoalActions {
        self.actions
    }

    pub fn staged_job(&self) -> &Job {
        &self.staging
    }

    // Protected packages

    pub fn add_protected(&mut self, set: &PackageSet) {
        self.protected.union_with(set);
    }

    pub fn set_protected(&mut self, set: PackageSet) {
        self.protected = set;
    }

    pub fn protected(&self) -> &PackageSet {
        &self.protected
    }

    /// Protected packages the latest run would have removed
    pub fn removal_of_protected(&self) -> &PackageSet {
        &self.removal_of_protected
    }

    // Resolution

    /// Resolve the staged requests.
    ///
    /// Every run starts over from the staged job; the solver and transaction of a
    /// previous run are dropped.
    pub fn run(&mut self, flags: GoalActions) -> Result<()> {
        let flags = flags | self.default_flags;
        self.actions |= flags;
        let mut job = self.effective_job(flags);

        self.universe.recompute_considered();
        self.universe.make_provides_ready();
        self.transaction = None;
        self.removal_of_protected = PackageSet::new();
        self.solver = None;

        if flags.contains(GoalActions::IGNORE_WEAK) {
            for entry in job.iter_mut() {
                entry.flags.remove(JobFlags::WEAK);
            }
        }

        let solver_flags = SolverFlags {
            allow_downgrade: self.actions.contains(GoalActions::ALLOW_DOWNGRADE),
            allow_vendorchange: self.allow_vendor_change,
            keep_orphans: true,
            best_obey_policy: true,
            yum_obsoletes: true,
            ignore_recommended: flags.contains(GoalActions::IGNORE_WEAK_DEPS),
        };

        let mut solver = Solver::with_flags(self.universe, solver_flags);
        self.sink.event(&GoalEvent::Resolving { entries: job.len() });
        let mut solved = solver.solve(&job);

        if solved {
            let limited = installonly::limit_entries(&solver);
            if !limited.is_empty() {
                let erasures = limited.iter().filter(|e| e.action == JobAction::Erase).count();
                self.sink.event(&GoalEvent::InstallonlyLimited { erasures });
                job.extend(limited);
                self.allow_uninstall_all_but_protected(&mut job);
                self.sink.event(&GoalEvent::Resolving { entries: job.len() });
                solved = solver.solve(&job);
            }
        }

        let outcome = if solved {
            let transaction = solver.create_transaction();
            self.removal_of_protected = self.protected_in_removals(&transaction);
            let steps = transaction.len();
            // a vetoed transaction stays listable
            self.transaction = Some(transaction);
            if self.removal_of_protected.is_empty() {
                self.sink.event(&GoalEvent::Resolved { steps });
                Ok(())
            } else {
                self.sink.event(&GoalEvent::ProtectedRemoval {
                    packages: self.names(&self.removal_of_protected),
                });
                Err(GoalError::RemovalOfProtectedPackage)
            }
        } else {
            self.sink.event(&GoalEvent::Unsolvable {
                problems: solver.problem_count(),
            });
            Err(GoalError::NoSolutionPossible)
        };
        self.solver = Some(solver);

        if let Some(dir) = self.debug_dir.as_deref() {
            if let Err(e) = self.write_debugdata(dir) {
                log::warn!("{}", e);
            }
        }
        outcome
    }

    /// The staged job plus the entries a run with `flags` implies
    fn effective_job(&mut self, flags: GoalActions) -> Job {
        let mut job = self.staging.clone();

        if flags.contains(GoalActions::FORCE_BEST) {
            for entry in job.iter_mut() {
                entry.flags |= JobFlags::FORCEBEST;
            }
        }

        for name in self.universe.installonly() {
            job.push(JobEntry::new(
                JobAction::Multiversion,
                JobTarget::provides(Relation::new(name.as_str())),
                JobFlags::empty(),
            ));
        }

        if let Some(kernel) = self.universe.running_kernel() {
            self.protected.set(kernel);
        }

        if flags.contains(GoalActions::ALLOW_UNINSTALL) {
            self.allow_uninstall_all_but_protected(&mut job);
        }

        if flags.contains(GoalActions::VERIFY) {
            job.push(JobEntry::new(JobAction::Verify, JobTarget::All, JobFlags::empty()));
        }
        job
    }

    fn allow_uninstall_all_but_protected(&self, job: &mut Job) {
        let considered = self.universe.considered();
        for id in self.universe.installed_ids() {
            if considered.has(id) && !self.protected.has(id) {
                job.push(JobEntry::new(
                    JobAction::AllowUninstall,
                    JobTarget::Solvable(id),
                    JobFlags::empty(),
                ));
            }
        }
    }

    fn protected_in_removals(&self, transaction: &Transaction) -> PackageSet {
        let mut removals: PackageSet = transaction
            .packages_of_type(
                TransactionMode::SHOW_OBSOLETES | TransactionMode::CHANGE_IS_REINSTALL,
                &[StepType::Erase, StepType::Obsoleted],
            )
            .into_iter()
            .collect();
        removals.intersect_with(&self.protected);
        removals
    }

    pub fn solver(&self) -> Option<&Solver<'u>> {
        self.solver.as_ref()
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        self.transaction.as_ref()
    }

    // Result listings

    pub fn list_erasures(&self) -> Result<Vec<PackageId>> {
        self.list_results(&[StepType::Erase])
    }

    /// Newly installed packages, including those that obsolete an installed one
    pub fn list_installs(&self) -> Result<Vec<PackageId>> {
        self.list_results(&[StepType::Install, StepType::Obsoletes])
    }

    pub fn list_upgrades(&self) -> Result<Vec<PackageId>> {
        self.list_results(&[StepType::Upgrade])
    }

    pub fn list_downgrades(&self) -> Result<Vec<PackageId>> {
        self.list_results(&[StepType::Downgrade])
    }

    pub fn list_reinstalls(&self) -> Result<Vec<PackageId>> {
        self.list_results(&[StepType::Reinstall])
    }

    /// Installed packages replaced through obsoletes
    pub fn list_obsoleted(&self) -> Result<Vec<PackageId>> {
        let transaction = self.transaction.as_ref().ok_or_else(|| self.no_transaction_error())?;
        Ok(transaction.packages_of_type(
            TransactionMode::SHOW_OBSOLETES | TransactionMode::CHANGE_IS_REINSTALL,
            &[StepType::Obsoleted],
        ))
    }

    /// Installed packages that stay but nothing the user installed needs
    pub fn list_unneeded(&self) -> Result<PackageSet> {
        let solver = self
            .solver
            .as_ref()
            .ok_or_else(|| GoalError::Internal("no solv in the goal".to_string()))?;
        Ok(solver.unneeded())
    }

    /// Installed packages `id` replaces in the transaction
    pub fn list_obsoleted_by_package(&self, id: PackageId) -> Result<Vec<PackageId>> {
        let transaction = self.transaction.as_ref().ok_or_else(|| self.no_transaction_error())?;
        Ok(transaction.all_obs_pkgs(id))
    }

    fn list_results(&self, types: &[StepType]) -> Result<Vec<PackageId>> {
        let transaction = self.transaction.as_ref().ok_or_else(|| self.no_transaction_error())?;
        let mode = TransactionMode::SHOW_ACTIVE
            | TransactionMode::SHOW_ALL
            | TransactionMode::SHOW_OBSOLETES
            | TransactionMode::CHANGE_IS_REINSTALL;
        Ok(transaction.packages_of_type(mode, types))
    }

    fn no_transaction_error(&self) -> GoalError {
        if self.solver.is_none() {
            GoalError::Internal("no solv in the goal".to_string())
        } else if !self.removal_of_protected.is_empty() {
            GoalError::RemovalOfProtectedPackage
        } else {
            GoalError::NoSolutionPossible
        }
    }

    // Problems

    pub fn list_conflict_pkgs(&self, state: PackageState) -> PackageSet {
        self.solver
            .as_ref()
            .map(|solver| diagnose::conflict_pkgs(solver, state))
            .unwrap_or_default()
    }

    pub fn list_broken_dependency_pkgs(&self, state: PackageState) -> PackageSet {
        self.solver
            .as_ref()
            .map(|solver| diagnose::broken_dependency_pkgs(solver, state))
            .unwrap_or_default()
    }

    /// Solver problems, plus one for a protected removal
    pub fn count_problems(&self) -> usize {
        let solver_problems = self.solver.as_ref().map_or(0, Solver::problem_count);
        solver_problems + self.protected_problem()
    }

    fn protected_problem(&self) -> usize {
        usize::from(!self.removal_of_protected.is_empty())
    }

    /// Lines describing problem `index`.
    ///
    /// While protected packages are removed or entangled in broken dependencies, every
    /// index is described by the protected removal.
    pub fn describe_problem_rules(&self, index: usize) -> Result<Vec<String>> {
        if index >= self.count_problems() {
            return Err(GoalError::Internal(format!("no problem with index {}", index)));
        }

        if let Some(protected) = self.describe_protected_removal() {
            return Ok(vec![protected]);
        }

        let Some(solver) = self.solver.as_ref() else {
            return Err(GoalError::Internal("no solv in the goal".to_string()));
        };
        let mut lines: Vec<String> = Vec::new();
        if index >= solver.problem_count() {
            return Ok(lines);
        }
        for rule in solver.problem_rules(index) {
            for info in solver.all_rule_infos(rule) {
                let line = solver.problem_rule_info_to_string(&info);
                if !lines.contains(&line) {
                    lines.push(line);
                }
            }
        }
        Ok(lines)
    }

    /// Names the protected packages the latest run would remove.
    ///
    /// Falls back to protected installed packages whose dependencies are broken.
    pub fn describe_protected_removal(&self) -> Option<String> {
        let mut packages = self.removal_of_protected.clone();
        if packages.is_empty() {
            packages = self.list_broken_dependency_pkgs(PackageState::Installed);
            packages.intersect_with(&self.protected);
        }
        if packages.is_empty() {
            return None;
        }
        Some(format!("{}{}", PROTECTED_REMOVAL_MESSAGE, self.names(&packages).join(", ")))
    }

    fn names(&self, set: &PackageSet) -> Vec<String> {
        set.iter()
            .filter_map(|id| self.universe.package(id))
            .map(|p| p.name.clone())
            .collect()
    }

    // Decisions

    pub fn get_reason(&self, id: PackageId) -> Reason {
        let Some(solver) = self.solver.as_ref() else {
            return Reason::User;
        };
        let (reason, rule) = solver.describe_decision(id);
        let job_rule = rule
            .and_then(|r| solver.rule_class(r))
            .is_some_and(|class| matches!(class, RuleClass::Job | RuleClass::Best));

        match reason {
            DecisionReason::ResolveJob => Reason::User,
            DecisionReason::UnitRule if job_rule => Reason::User,
            DecisionReason::CleanDepsErase => Reason::Clean,
            DecisionReason::WeakDep => Reason::WeakDep,
            _ => Reason::Dep,
        }
    }

    /// Dump the latest solver run into `dir` for offline replay
    pub fn write_debugdata<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let solver = self
            .solver
            .as_ref()
            .ok_or_else(|| GoalError::Internal("no solver set".to_string()))?;

        let dir = dir.as_ref();
        let absolute = std::path::absolute(dir).map_err(|e| GoalError::DebugData {
            message: format!("failed to make {} absolute", dir.display()),
            source: Some(e),
        })?;

        Testcase::from_solver(solver)
            .write(&absolute)
            .map_err(|e| GoalError::DebugData {
                message: format!("failed writing debugdata to {}: {}", absolute.display(), e),
                source: Some(e),
            })?;

        self.sink.event(&GoalEvent::DebugDataWritten {
            path: absolute.clone(),
        });
        Ok(absolute)
    }

    /// Log every decision of the latest run at debug level
    pub fn log_decisions(&self) -> Result<()> {
        let solver = self
            .solver
            .as_ref()
            .ok_or_else(|| GoalError::Internal("no solver set".to_string()))?;

        for &(literal, reason) in solver.decisions().queue() {
            let id = literal.abs();
            let nevra = self
                .universe
                .package(id)
                .map(|p| p.nevra())
                .unwrap_or_else(|| format!("#{}", id));
            log::debug!(
                "{}{} level {} ({:?})",
                if literal > 0 { "+" } else { "-" },
                nevra,
                solver.decision_level(id).abs(),
                reason
            );
        }
        Ok(())
    }
}

fn weak_flag(optional: bool) -> JobFlags {
    if optional {
        JobFlags::WEAK
    } else {
        JobFlags::empty()
    }
}

fn clean_flag(flags: JobFlags) -> JobFlags {
    if flags.contains(JobFlags::CLEANDEPS) {
        JobFlags::CLEANDEPS
    } else {
        JobFlags::empty()
    }
}

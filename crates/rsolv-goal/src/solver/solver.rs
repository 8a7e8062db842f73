use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::decisions::{Decisions, Reason};
use super::policy::{Policy, Preference};
use super::problem::{describe_rule_info, Problem};
use super::rule::{Literal, Rule, RuleClass, RuleInfo};
use super::rule_generator::{JobContext, RuleGenerator};
use super::rule_set::RuleSet;
use super::transaction::Transaction;
use super::watch_graph::{PropagateResult, WatchGraph};
use crate::job::Job;
use crate::universe::{PackageId, PackageSet, Universe};

/// Bound on search iterations before giving up
const MAX_ITERATIONS: u32 = 100_000;

/// Switches that change how rules are generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SolverFlags {
    /// Keep rules accept lower EVRs
    pub allow_downgrade: bool,
    /// Keep rules accept packages of another vendor
    pub allow_vendorchange: bool,
    /// Distupgrade keeps installed packages nothing in the repositories replaces
    pub keep_orphans: bool,
    pub best_obey_policy: bool,
    /// Obsoleters of any arch count as replacements
    pub yum_obsoletes: bool,
    pub ignore_recommended: bool,
}

/// Why a package ended up decided the way it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    Unrelated,
    /// Forced by propagation
    UnitRule,
    KeepInstalled,
    /// Chosen to satisfy a job rule
    ResolveJob,
    /// Chosen to satisfy a package rule
    Resolve,
    WeakDep,
    CleanDepsErase,
}

enum SearchResult {
    Satisfied(Decisions),
    Unsatisfiable,
    Exhausted,
}

/// The SAT solver for transaction resolution.
///
/// Solving generates rules from the job, then searches for an assignment with
/// unit propagation and chronological backtracking. When no assignment exists the
/// conflicting rules are reduced to a minimal set, recorded as a problem, and one of
/// them is disabled so that the search can report further independent problems.
pub struct Solver<'u> {
    universe: &'u Universe,
    flags: SolverFlags,
    policy: Policy,
    rules: RuleSet,
    context: JobContext,
    decisions: Decisions,
    problems: Vec<Problem>,
    job: Job,
    solved: bool,
}

impl<'u> Solver<'u> {
    pub fn new(universe: &'u Universe) -> Self {
        Self::with_flags(universe, SolverFlags::default())
    }

    pub fn with_flags(universe: &'u Universe, flags: SolverFlags) -> Self {
        Self {
            universe,
            flags,
            policy: Policy::new().best_obey_policy(flags.best_obey_policy),
            rules: RuleSet::new(),
            context: JobContext::default(),
            decisions: Decisions::new(),
            problems: Vec::new(),
            job: Job::new(),
            solved: false,
        }
    }

    /// Solve a job. Returns true when a solution without problems was found.
    pub fn solve(&mut self, job: &Job) -> bool {
        let start = Instant::now();
        self.universe.make_provides_ready();

        self.job = job.clone();
        self.problems.clear();
        self.decisions = Decisions::new();

        let generator = RuleGenerator::new(self.universe, &self.flags, &self.policy);
        let (rules, context) = generator.generate(job);
        self.rules = rules;
        self.context = context;

        log::debug!("Rule generation: {:?}, {} rules", start.elapsed(), self.rules.len());
        let sat_start = Instant::now();

        loop {
            match self.search() {
                SearchResult::Satisfied(decisions) => {
                    self.decisions = decisions;
                    break;
                }
                SearchResult::Exhausted => {
                    log::warn!("Solver exceeded {} iterations", MAX_ITERATIONS);
                    self.problems.push(Problem::default());
                    break;
                }
                SearchResult::Unsatisfiable => {
                    let core = self.minimal_core();

                    let weak = core
                        .iter()
                        .copied()
                        .find(|&id| self.rules.get(id).is_some_and(Rule::is_weak));
                    if let Some(id) = weak {
                        log::debug!("Dropping weak rule #{}", id);
                        self.rules.disable(id);
                        continue;
                    }

                    let Some(disable) = self.rule_to_disable(&core) else {
                        self.problems.push(Problem::default());
                        break;
                    };
                    log::debug!("Problem with rules {:?}, disabling #{}", core, disable);
                    self.problems.push(Problem::new(core));
                    self.rules.disable(disable);
                }
            }
        }

        self.solved = self.problems.is_empty();
        if self.solved {
            self.apply_cleandeps();
            log::info!(
                "Solved in {:?}: {} packages installed",
                sat_start.elapsed(),
                self.decisions.installed_packages().count()
            );
        } else {
            log::info!(
                "No solution after {:?}: {} problem(s)",
                sat_start.elapsed(),
                self.problems.len()
            );
        }

        self.solved
    }

    /// Job rules go first, then best, keep and distupgrade rules, then anything
    fn rule_to_disable(&self, core: &[u32]) -> Option<u32> {
        let of_class = |classes: &[RuleClass]| {
            core.iter()
                .copied()
                .find(|&id| self.rules.get(id).is_some_and(|r| classes.contains(&r.class())))
        };

        of_class(&[RuleClass::Job])
            .or_else(|| of_class(&[RuleClass::Best, RuleClass::Update, RuleClass::Distupgrade]))
            .or_else(|| core.first().copied())
    }

    fn search(&self) -> SearchResult {
        let mut state = SolverState::new(&self.rules, self.universe.len());
        state.decisions.set_level(1);

        for rule in self.rules.enabled() {
            if rule.is_empty() {
                return SearchResult::Unsatisfiable;
            }
            if rule.is_assertion() && !state.decisions.decide(rule.literals()[0], Reason::Unit(rule.id())) {
                return SearchResult::Unsatisfiable;
            }
        }

        let mut iterations = 0u32;
        loop {
            iterations += 1;
            if iterations > MAX_ITERATIONS {
                return SearchResult::Exhausted;
            }

            if let Err(rule_id) = self.propagate(&mut state) {
                log::trace!("Conflict in rule #{} at level {}", rule_id, state.decisions.level());
                if !state.backtrack() {
                    return SearchResult::Unsatisfiable;
                }
                continue;
            }

            let Some((mut alternatives, reason)) = self.select_next(&state.decisions) else {
                return SearchResult::Satisfied(state.decisions);
            };

            state.decisions.increment_level();
            let first = alternatives.remove(0);
            alternatives.reverse();
            state.branches.push(Branch {
                level: state.decisions.level(),
                alternatives,
                reason,
            });

            let decided = first.iter().all(|&literal| state.decisions.decide(literal, reason));
            if !decided && !state.backtrack() {
                return SearchResult::Unsatisfiable;
            }
        }
    }

    fn propagate(&self, state: &mut SolverState) -> Result<(), u32> {
        while state.propagated < state.decisions.len() {
            let (literal, _) = state.decisions.queue()[state.propagated];
            state.propagated += 1;

            match state.graph.propagate(literal, &self.rules, &state.decisions) {
                PropagateResult::Conflict(rule_id) => return Err(rule_id),
                PropagateResult::Units(units) => {
                    for (unit, rule_id) in units {
                        if !state.decisions.decide(unit, Reason::Unit(rule_id)) {
                            return Err(rule_id);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Next decision to branch on, as alternatives tried in order
    fn select_next(&self, decisions: &Decisions) -> Option<(Vec<Vec<Literal>>, Reason)> {
        for rule in self.rules.enabled() {
            let literals = rule.literals();
            if literals.iter().any(|&l| decisions.satisfied(l)) {
                continue;
            }
            // an undecided negative literal is satisfied by leaving the package out
            if literals.iter().any(|&l| l < 0 && decisions.undecided(-l)) {
                continue;
            }

            let candidates: Vec<PackageId> = literals
                .iter()
                .copied()
                .filter(|&l| l > 0 && decisions.undecided(l))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let preference = match rule.class() {
                RuleClass::Job | RuleClass::Best => Preference::Best,
                RuleClass::Update | RuleClass::Distupgrade => Preference::Keep,
                RuleClass::Package => Preference::Dependency,
            };
            let ordered = self
                .policy
                .select_preferred(self.universe, preference, rule.source(), &candidates);

            return Some((
                ordered.into_iter().map(|id| vec![id]).collect(),
                Reason::Branch(rule.id()),
            ));
        }

        if !self.flags.ignore_recommended {
            if let Some(alternatives) = self.select_weak(decisions) {
                return Some((alternatives, Reason::WeakDep));
            }
        }

        let undecided_installed = self
            .universe
            .installed_ids()
            .into_iter()
            .find(|&id| decisions.undecided(id));
        undecided_installed.map(|id| (vec![vec![id], vec![-id]], Reason::Keep))
    }

    /// Providers of a recommendation of a newly installed package, or declining all of them
    fn select_weak(&self, decisions: &Decisions) -> Option<Vec<Vec<Literal>>> {
        for id in decisions.installed_packages() {
            if self.universe.is_installed(id) {
                continue;
            }
            let Some(package) = self.universe.package(id) else {
                continue;
            };

            for recommendation in &package.recommends {
                let providers = self.universe.what_provides(recommendation);
                if providers.iter().any(|&p| decisions.decided_install(p)) {
                    continue;
                }
                let undecided: Vec<PackageId> =
                    providers.into_iter().filter(|&p| decisions.undecided(p)).collect();
                if undecided.is_empty() {
                    continue;
                }

                let ordered =
                    self.policy
                        .select_preferred(self.universe, Preference::Dependency, Some(id), &undecided);
                let mut alternatives: Vec<Vec<Literal>> = ordered.into_iter().map(|p| vec![p]).collect();
                alternatives.push(undecided.iter().map(|&p| -p).collect());
                return Some(alternatives);
            }
        }
        None
    }

    /// Reduce the enabled rules to a minimal unsatisfiable subset.
    ///
    /// Rules are dropped one at a time, package rules first and job rules last;
    /// a rule stays in the core when dropping it makes the rest satisfiable.
    fn minimal_core(&mut self) -> Vec<u32> {
        let mut candidates: Vec<(u8, u32)> = self
            .rules
            .enabled()
            .map(|r| (r.rule_type().priority(), r.id()))
            .collect();
        candidates.sort();

        let mut core = Vec::new();
        let mut dropped = Vec::new();
        for (_, id) in candidates {
            self.rules.disable(id);
            if matches!(self.search(), SearchResult::Satisfied(_)) {
                self.rules.enable(id);
                core.push(id);
            } else {
                dropped.push(id);
            }
        }

        for id in dropped {
            self.rules.enable(id);
        }
        core.sort_unstable();
        core
    }

    /// Installed packages decided by a job or best rule
    fn decided_by_job(&self, id: PackageId) -> bool {
        self.decisions
            .decision_reason(id)
            .and_then(|reason| reason.rule())
            .and_then(|rule| self.rules.get(rule))
            .is_some_and(|rule| matches!(rule.class(), RuleClass::Job | RuleClass::Best))
    }

    /// Erase installed packages only the clean-deps erasures needed
    fn apply_cleandeps(&mut self) {
        if self.context.cleandeps.is_empty() {
            return;
        }

        let mut erased = self.context.cleandeps.clone();
        loop {
            let kept: Vec<PackageId> = self.decisions.installed_packages().collect();
            let candidate = kept.iter().copied().find(|&id| {
                self.universe.is_installed(id)
                    && !self.context.userinstalled.has(id)
                    && !self.decided_by_job(id)
                    && self.required_by_any(id, &erased)
                    && !self.needed_by_kept(id, &kept)
            });

            let Some(id) = candidate else {
                break;
            };
            log::debug!("Clean-deps erasing #{}", id);
            self.decisions.override_decision(-id, Reason::CleanDeps);
            erased.set(id);
        }
    }

    /// Whether `id` provides a requirement of one of `packages`
    fn required_by_any(&self, id: PackageId, packages: &PackageSet) -> bool {
        packages.iter().any(|p| {
            self.universe.package(p).is_some_and(|package| {
                package
                    .requires
                    .iter()
                    .any(|r| self.universe.what_provides(r).contains(&id))
            })
        })
    }

    /// Whether some other kept package has `id` as its only kept provider of a requirement
    fn needed_by_kept(&self, id: PackageId, kept: &[PackageId]) -> bool {
        kept.iter().filter(|&&k| k != id).any(|&k| {
            self.universe.package(k).is_some_and(|package| {
                package.requires.iter().any(|r| {
                    let providers = self.universe.what_provides(r);
                    providers.contains(&id)
                        && !providers
                            .iter()
                            .any(|&p| p != id && p != k && self.decisions.decided_install(p))
                })
            })
        })
    }

    /// Installed packages that stay but nothing user-installed or requested reaches
    pub fn unneeded(&self) -> PackageSet {
        let kept: PackageSet = self.decisions.installed_packages().collect();

        let mut reached = PackageSet::new();
        let mut queue: Vec<PackageId> = kept
            .iter()
            .filter(|&id| self.context.userinstalled.has(id) || self.decided_by_job(id))
            .collect();

        while let Some(id) = queue.pop() {
            if reached.has(id) {
                continue;
            }
            reached.set(id);
            let Some(package) = self.universe.package(id) else {
                continue;
            };
            for relation in package.requires.iter().chain(&package.recommends) {
                queue.extend(
                    self.universe
                        .what_provides(relation)
                        .into_iter()
                        .filter(|&p| kept.has(p) && !reached.has(p)),
                );
            }
        }

        kept.iter()
            .filter(|&id| self.universe.is_installed(id) && !reached.has(id))
            .collect()
    }

    pub fn describe_decision(&self, id: PackageId) -> (DecisionReason, Option<u32>) {
        let Some(reason) = self.decisions.decision_reason(id) else {
            return (DecisionReason::Unrelated, None);
        };
        let class = reason.rule().and_then(|r| self.rules.get(r)).map(Rule::class);

        let described = match (reason, class) {
            (Reason::Unit(_), Some(RuleClass::Update | RuleClass::Distupgrade)) => DecisionReason::KeepInstalled,
            (Reason::Unit(_), _) => DecisionReason::UnitRule,
            (Reason::Branch(_), Some(RuleClass::Job | RuleClass::Best)) => DecisionReason::ResolveJob,
            (Reason::Branch(_), Some(RuleClass::Update | RuleClass::Distupgrade)) => {
                DecisionReason::KeepInstalled
            }
            (Reason::Branch(_), _) => DecisionReason::Resolve,
            (Reason::WeakDep, _) => DecisionReason::WeakDep,
            (Reason::Keep, _) => DecisionReason::KeepInstalled,
            (Reason::CleanDeps, _) => DecisionReason::CleanDepsErase,
        };
        (described, reason.rule())
    }

    /// > 0 decided in, < 0 decided out, 0 undecided
    pub fn decision_level(&self, id: PackageId) -> i32 {
        self.decisions.signed_level(id)
    }

    pub fn create_transaction(&self) -> Transaction {
        let mut kept: PackageSet = self.decisions.installed_packages().collect();
        for id in self.universe.installed_ids() {
            if self.decisions.undecided(id) {
                kept.set(id);
            }
        }
        Transaction::from_decisions(self.universe, &kept, &self.context.multiversion)
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn problem_count(&self) -> usize {
        self.problems.len()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// Rule ids of problem `index`; empty when out of range
    pub fn problem_rules(&self, index: usize) -> Vec<u32> {
        self.problems
            .get(index)
            .map(|p| p.rules().to_vec())
            .unwrap_or_default()
    }

    pub fn rule_info(&self, rule: u32) -> Option<RuleInfo> {
        self.rules.get(rule).map(Rule::info)
    }

    pub fn all_rule_infos(&self, rule: u32) -> Vec<RuleInfo> {
        self.rule_info(rule).into_iter().collect()
    }

    pub fn rule_class(&self, rule: u32) -> Option<RuleClass> {
        self.rules.get(rule).map(Rule::class)
    }

    pub fn problem_rule_info_to_string(&self, info: &RuleInfo) -> String {
        describe_rule_info(self.universe, info)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn flags(&self) -> SolverFlags {
        self.flags
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn universe(&self) -> &'u Universe {
        self.universe
    }

    pub fn decisions(&self) -> &Decisions {
        &self.decisions
    }

    pub fn context(&self) -> &JobContext {
        &self.context
    }
}

/// Internal state of one search
struct SolverState {
    decisions: Decisions,
    graph: WatchGraph,
    /// Branch points for backtracking
    branches: Vec<Branch>,
    /// Index of the next decision to propagate
    propagated: usize,
}

impl SolverState {
    fn new(rules: &RuleSet, max_package_id: usize) -> Self {
        Self {
            decisions: Decisions::with_capacity(max_package_id),
            graph: WatchGraph::from_rules(rules),
            branches: Vec::new(),
            propagated: 0,
        }
    }

    /// Undo the latest branch and decide its next alternative.
    ///
    /// Returns false when no branch has alternatives left.
    fn backtrack(&mut self) -> bool {
        while let Some(branch) = self.branches.last_mut() {
            let Some(alternative) = branch.alternatives.pop() else {
                self.branches.pop();
                continue;
            };
            let level = branch.level;
            let reason = branch.reason;

            self.decisions.revert_to_level(level - 1);
            self.decisions.set_level(level);
            // everything below the branch level was propagated before branching
            self.propagated = self.decisions.len();

            if alternative.iter().all(|&literal| self.decisions.decide(literal, reason)) {
                return true;
            }
        }
        false
    }
}

/// A branch point for backtracking
struct Branch {
    level: u32,
    /// Alternatives left to try, last one first
    alternatives: Vec<Vec<Literal>>,
    reason: Reason,
}

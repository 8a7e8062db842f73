use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use indexmap::map::Entry;
use indexmap::IndexMap;

use super::policy::Policy;
use super::rule::{Rule, RuleType};
use super::rule_set::RuleSet;
use super::solver::SolverFlags;
use crate::job::{Job, JobAction, JobFlags, JobTarget};
use crate::universe::{Package, PackageId, PackageSet, Universe};

/// Package sets the job marks for special treatment
#[derive(Debug, Clone, Default)]
pub struct JobContext {
    pub multiversion: PackageSet,
    pub allow_uninstall: PackageSet,
    pub userinstalled: PackageSet,
    /// Installed packages erased with `CLEANDEPS`
    pub cleandeps: PackageSet,
    pub erase: PackageSet,
    pub verify: bool,
}

/// Installed package -> the candidates it may move to (None = any)
type Targets = IndexMap<PackageId, Option<PackageSet>>;

/// Generates rules from the job and the universe.
///
/// Rules are produced in a fixed order: job rules, then rules for installed packages
/// (keep, update, distupgrade), then package rules for everything reachable from
/// installed packages and job candidates.
pub struct RuleGenerator<'a> {
    universe: &'a Universe,
    flags: &'a SolverFlags,
    policy: &'a Policy,
    rules: RuleSet,
    context: JobContext,
    update: Targets,
    update_best: PackageSet,
    distupgrade: Targets,
    /// Obsoleted name -> available packages obsoleting something of that name
    obsoleters: HashMap<String, Vec<PackageId>>,
}

impl<'a> RuleGenerator<'a> {
    pub fn new(universe: &'a Universe, flags: &'a SolverFlags, policy: &'a Policy) -> Self {
        let mut obsoleters: HashMap<String, Vec<PackageId>> = HashMap::new();
        for id in universe.considered().iter() {
            if universe.is_installed(id) {
                continue;
            }
            if let Some(package) = universe.package(id) {
                for obsolete in &package.obsoletes {
                    let entry = obsoleters.entry(obsolete.name().to_string()).or_default();
                    if !entry.contains(&id) {
                        entry.push(id);
                    }
                }
            }
        }

        Self {
            universe,
            flags,
            policy,
            rules: RuleSet::new(),
            context: JobContext::default(),
            update: Targets::new(),
            update_best: PackageSet::new(),
            distupgrade: Targets::new(),
            obsoleters,
        }
    }

    pub fn generate(mut self, job: &Job) -> (RuleSet, JobContext) {
        let installed = self.universe.installed_ids();

        self.scan_job(job, &installed);
        self.add_job_rules(job);
        self.add_installed_rules(&installed);
        self.add_package_rules(&installed);

        log::debug!(
            "Generated {} rules ({} job, {} update, {} requires)",
            self.rules.len(),
            self.rules.count_by_type(RuleType::Job),
            self.rules.count_by_type(RuleType::Update),
            self.rules.count_by_type(RuleType::PackageRequires)
        );

        (self.rules, self.context)
    }

    fn package(&self, id: PackageId) -> Option<&'a Package> {
        self.universe.package(id)
    }

    fn scan_job(&mut self, job: &Job, installed: &[PackageId]) {
        for entry in job.iter() {
            let candidates = entry.target.resolve(self.universe);
            match entry.action {
                JobAction::Multiversion => self.context.multiversion.extend(candidates),
                JobAction::AllowUninstall => self.context.allow_uninstall.extend(candidates),
                JobAction::UserInstalled => self.context.userinstalled.extend(candidates),
                JobAction::Verify => self.context.verify = true,
                JobAction::Erase => {
                    for id in candidates.into_iter().filter(|&id| self.universe.is_installed(id)) {
                        self.context.erase.set(id);
                        if entry.flags.contains(JobFlags::CLEANDEPS) {
                            self.context.cleandeps.set(id);
                        }
                    }
                }
                JobAction::Update => {
                    let all = entry.target == JobTarget::All;
                    let targets = self.collect_targets(&candidates, installed, all);
                    if entry.flags.contains(JobFlags::FORCEBEST) {
                        self.update_best.extend(targets.keys().copied());
                    }
                    merge_targets(&mut self.update, targets);
                }
                JobAction::DistUpgrade => {
                    let all = entry.target == JobTarget::All;
                    let targets = self.collect_targets(&candidates, installed, all);
                    merge_targets(&mut self.distupgrade, targets);
                }
                JobAction::Install => {}
            }
        }
    }

    /// Installed packages an update or distupgrade entry applies to.
    ///
    /// Installed candidates may move anywhere. Available candidates restrict the installed
    /// packages of their name that are not candidates themselves.
    fn collect_targets(&self, candidates: &[PackageId], installed: &[PackageId], all: bool) -> Targets {
        let mut targets = Targets::new();
        if all {
            for &id in installed {
                targets.insert(id, None);
            }
            return targets;
        }

        for &id in candidates.iter().filter(|&&id| self.universe.is_installed(id)) {
            targets.insert(id, None);
        }

        for &candidate in candidates.iter().filter(|&&id| !self.universe.is_installed(id)) {
            let Some(package) = self.package(candidate) else {
                continue;
            };
            for &id in installed {
                if candidates.contains(&id) || self.package(id).is_none_or(|p| p.name != package.name) {
                    continue;
                }
                match targets.entry(id) {
                    Entry::Occupied(mut entry) => {
                        if let Some(set) = entry.get_mut() {
                            set.set(candidate);
                        }
                    }
                    Entry::Vacant(entry) => {
                        entry.insert(Some(std::iter::once(candidate).collect()));
                    }
                }
            }
        }
        targets
    }

    fn add_job_rules(&mut self, job: &Job) {
        for (index, entry) in job.iter().enumerate() {
            let weak = entry.is_weak();
            match entry.action {
                JobAction::Install => {
                    let candidates = entry.target.resolve(self.universe);
                    if candidates.is_empty() {
                        let unknown = match &entry.target {
                            JobTarget::Name { relation, .. } => {
                                self.universe.packages_by_name(relation.name()).is_empty()
                            }
                            JobTarget::Solvable(_) | JobTarget::OneOf(_) => true,
                            _ => false,
                        };
                        let kind = if unknown {
                            RuleType::JobUnknownPackage
                        } else {
                            RuleType::JobNothingProvides
                        };
                        self.rules.add(
                            Rule::new(Vec::new(), kind)
                                .with_dep(entry.target.describe(self.universe))
                                .with_job(index)
                                .weak(weak),
                        );
                        continue;
                    }

                    self.rules.add(
                        Rule::new(candidates.clone(), RuleType::Job)
                            .with_dep(entry.target.describe(self.universe))
                            .with_job(index)
                            .weak(weak),
                    );

                    if entry.flags.contains(JobFlags::FORCEBEST) {
                        let best = self.policy.best_candidates(self.universe, &candidates);
                        if best.len() < candidates.len() {
                            self.rules.add(Rule::new(best, RuleType::Best).with_job(index).weak(weak));
                        }
                    }
                }
                JobAction::Erase => {
                    for id in entry.target.resolve(self.universe) {
                        self.rules.add(
                            Rule::assertion(-id, RuleType::Job)
                                .with_source(id)
                                .with_job(index)
                                .weak(weak),
                        );
                    }
                }
                _ => {}
            }
        }
    }

    fn add_installed_rules(&mut self, installed: &[PackageId]) {
        for &id in installed {
            if self.context.erase.has(id) {
                continue;
            }

            if let Some(restriction) = self.distupgrade.get(&id).cloned() {
                let candidates = self.distupgrade_candidates(id, restriction.as_ref());
                if !candidates.is_empty() {
                    self.rules
                        .add(Rule::new(candidates, RuleType::Distupgrade).with_source(id));
                    continue;
                }
                if !self.flags.keep_orphans {
                    self.rules
                        .add(Rule::assertion(-id, RuleType::Distupgrade).with_source(id));
                    continue;
                }
            }

            let multiversion = self.context.multiversion.has(id);
            if multiversion {
                if let Some(restriction) = self.update.get(&id).cloned() {
                    self.add_multiversion_update(id, restriction.as_ref());
                }
            }

            if self.context.allow_uninstall.has(id) {
                continue;
            }

            if multiversion {
                self.rules.add(Rule::new(vec![id], RuleType::Update).with_source(id));
                continue;
            }

            let replacements = self.replacements(id);
            let literals = match self.update.get(&id).cloned() {
                Some(restriction) => {
                    let newer: Vec<PackageId> = replacements
                        .iter()
                        .copied()
                        .filter(|&r| restriction.as_ref().is_none_or(|set| set.has(r)))
                        .filter(|&r| self.is_update_of(r, id))
                        .collect();

                    if self.update_best.has(id) {
                        let best = if newer.is_empty() {
                            vec![id]
                        } else {
                            self.policy.best_candidates(self.universe, &newer)
                        };
                        self.rules.add(Rule::new(best, RuleType::Best).with_source(id));
                    }

                    let mut literals = newer.clone();
                    literals.push(id);
                    literals.extend(replacements.iter().copied().filter(|r| !newer.contains(r)));
                    literals
                }
                None => {
                    let mut literals = vec![id];
                    literals.extend(replacements);
                    literals
                }
            };
            self.rules.add(Rule::new(literals, RuleType::Update).with_source(id));
        }
    }

    /// Updating a multiversion package installs a newer build next to it.
    ///
    /// The rule asks for one build newer than every installed build of the name and is
    /// weak, so an update that cannot be installed keeps what is there.
    fn add_multiversion_update(&mut self, id: PackageId, restriction: Option<&PackageSet>) {
        let Some(package) = self.package(id) else {
            return;
        };

        let siblings: Vec<&Package> = self
            .universe
            .packages_by_name(&package.name)
            .into_iter()
            .filter(|&s| self.universe.is_installed(s))
            .filter_map(|s| self.package(s))
            .filter(|s| s.arch_compatible(package))
            .collect();

        let newer: Vec<PackageId> = self
            .universe
            .packages_by_name(&package.name)
            .into_iter()
            .filter(|&c| !self.universe.is_installed(c))
            .filter(|&c| restriction.is_none_or(|set| set.has(c)))
            .filter(|&c| {
                self.package(c).is_some_and(|candidate| {
                    candidate.arch_compatible(package)
                        && (self.flags.allow_vendorchange || candidate.vendor == package.vendor)
                        && siblings
                            .iter()
                            .all(|s| candidate.evr.compare(&s.evr) == Ordering::Greater)
                })
            })
            .collect();
        if newer.is_empty() {
            return;
        }

        let literals = if self.update_best.has(id) {
            self.policy.best_candidates(self.universe, &newer)
        } else {
            self.policy
                .select_preferred(self.universe, super::policy::Preference::Best, None, &newer)
        };
        self.rules.add(
            Rule::new(literals, RuleType::Update)
                .with_source(id)
                .weak(true),
        );
    }

    /// Whether `candidate` counts as an upgrade of installed `id`
    fn is_update_of(&self, candidate: PackageId, id: PackageId) -> bool {
        match (self.package(candidate), self.package(id)) {
            (Some(c), Some(p)) if c.name == p.name => c.evr.compare(&p.evr) == Ordering::Greater,
            (Some(c), Some(p)) => c.obsoletes_package(p),
            _ => false,
        }
    }

    /// Available packages an installed package may be replaced by, best first
    fn replacements(&self, id: PackageId) -> Vec<PackageId> {
        let Some(package) = self.package(id) else {
            return Vec::new();
        };

        let mut replacements: Vec<PackageId> = self
            .universe
            .packages_by_name(&package.name)
            .into_iter()
            .filter(|&r| r != id && !self.universe.is_installed(r))
            .filter(|&r| {
                self.package(r).is_some_and(|candidate| {
                    candidate.arch_compatible(package)
                        && (self.flags.allow_downgrade
                            || candidate.evr.compare(&package.evr) != Ordering::Less)
                        && (self.flags.allow_vendorchange || candidate.vendor == package.vendor)
                })
            })
            .collect();

        for &obsoleter in self.obsoleters.get(&package.name).into_iter().flatten() {
            let matches = self.package(obsoleter).is_some_and(|candidate| {
                candidate.obsoletes_package(package)
                    && (self.flags.yum_obsoletes || candidate.arch_compatible(package))
            });
            if matches && !replacements.contains(&obsoleter) {
                replacements.push(obsoleter);
            }
        }

        self.policy
            .select_preferred(self.universe, super::policy::Preference::Best, None, &replacements)
    }

    /// Repository packages an installed package is synchronized to, best first.
    ///
    /// An available package identical to the installed one is replaced by the installed
    /// package itself so that syncing does not reinstall.
    fn distupgrade_candidates(&self, id: PackageId, restriction: Option<&PackageSet>) -> Vec<PackageId> {
        let Some(package) = self.package(id) else {
            return Vec::new();
        };

        let mut candidates: Vec<PackageId> = self
            .universe
            .packages_by_name(&package.name)
            .into_iter()
            .filter(|&c| !self.universe.is_installed(c))
            .filter(|&c| restriction.is_none_or(|set| set.has(c)))
            .filter(|&c| self.package(c).is_some_and(|p| p.arch_compatible(package)))
            .collect();

        if restriction.is_none() {
            for &obsoleter in self.obsoleters.get(&package.name).into_iter().flatten() {
                let matches = self.package(obsoleter).is_some_and(|p| p.obsoletes_package(package));
                if matches && !candidates.contains(&obsoleter) {
                    candidates.push(obsoleter);
                }
            }
        }

        let ordered =
            self.policy
                .select_preferred(self.universe, super::policy::Preference::Best, None, &candidates);

        let mut result = Vec::with_capacity(ordered.len());
        for candidate in ordered {
            let substitute = match self.package(candidate) {
                Some(p) if p.same_nevra(package) => id,
                _ => candidate,
            };
            if !result.contains(&substitute) {
                result.push(substitute);
            }
        }
        result
    }

    /// Requires and conflicts of everything reachable, then same-name and obsoletes
    /// rules among the reached packages
    fn add_package_rules(&mut self, installed: &[PackageId]) {
        let mut queue: VecDeque<PackageId> = installed.iter().copied().collect();
        for rule in self.rules.iter() {
            queue.extend(rule.literals().iter().copied().filter(|&l| l > 0));
        }

        let mut visited = PackageSet::new();
        while let Some(id) = queue.pop_front() {
            if visited.has(id) {
                continue;
            }
            visited.set(id);
            queue.extend(self.add_rules_for_package(id));
        }

        self.add_same_name_rules(&visited);
        self.add_obsoletes_rules(&visited);
    }

    /// Returns the packages the new rules point to
    fn add_rules_for_package(&mut self, id: PackageId) -> Vec<PackageId> {
        let Some(package) = self.package(id) else {
            return Vec::new();
        };
        let installed = self.universe.is_installed(id);
        let keep_broken_out = installed && !self.context.verify;
        let mut reached = Vec::new();

        for requirement in &package.requires {
            let providers = self.universe.what_provides(requirement);
            if providers.contains(&id) {
                continue;
            }
            if keep_broken_out && !providers.iter().any(|&p| self.universe.is_installed(p)) {
                log::debug!("Ignoring broken dependency {} of installed {}", requirement, package);
                continue;
            }

            if providers.is_empty() {
                self.rules
                    .add(Rule::nothing_provides(id).with_dep(requirement.to_string()));
            } else {
                reached.extend(providers.iter().copied());
                self.rules
                    .add(Rule::requires(id, providers).with_dep(requirement.to_string()));
            }
        }

        if !self.flags.ignore_recommended {
            for recommendation in &package.recommends {
                reached.extend(self.universe.what_provides(recommendation));
            }
        }

        for conflict in &package.conflicts {
            for other in self.universe.what_provides(conflict) {
                if other == id {
                    self.rules
                        .add(Rule::self_conflict(id).with_dep(conflict.to_string()));
                } else if !(keep_broken_out && self.universe.is_installed(other)) {
                    self.rules
                        .add(Rule::conflict(id, other).with_dep(conflict.to_string()));
                }
            }
        }

        reached
    }

    fn add_same_name_rules(&mut self, visited: &PackageSet) {
        let mut by_name: IndexMap<&str, Vec<PackageId>> = IndexMap::new();
        for id in visited.iter() {
            if let Some(package) = self.package(id) {
                by_name.entry(package.name.as_str()).or_default().push(id);
            }
        }

        for group in by_name.values() {
            for (i, &a) in group.iter().enumerate() {
                for &b in &group[i + 1..] {
                    let (Some(pa), Some(pb)) = (self.package(a), self.package(b)) else {
                        continue;
                    };
                    if !pa.arch_compatible(pb) {
                        continue;
                    }
                    let both_installed = self.universe.is_installed(a) && self.universe.is_installed(b);
                    if both_installed && !self.context.verify {
                        continue;
                    }
                    let multiversion = self.context.multiversion.has(a) || self.context.multiversion.has(b);
                    if multiversion && !pa.same_nevra(pb) {
                        continue;
                    }
                    self.rules.add(Rule::same_name(a, b));
                }
            }
        }
    }

    fn add_obsoletes_rules(&mut self, visited: &PackageSet) {
        for id in visited.iter() {
            let Some(package) = self.package(id) else {
                continue;
            };
            let installed = self.universe.is_installed(id);

            for obsolete in &package.obsoletes {
                for other in self.universe.packages_by_name(obsolete.name()) {
                    if !visited.has(other) || other == id {
                        continue;
                    }
                    if installed && self.universe.is_installed(other) {
                        continue;
                    }
                    let hit = self
                        .package(other)
                        .is_some_and(|p| p.name != package.name && obsolete.matches_evr(&p.evr));
                    if hit {
                        self.rules.add(
                            Rule::obsoletes(id, other, installed).with_dep(obsolete.to_string()),
                        );
                    }
                }
            }
        }
    }
}

fn merge_targets(into: &mut Targets, targets: Targets) {
    for (id, restriction) in targets {
        match into.entry(id) {
            Entry::Occupied(mut entry) => match (entry.get_mut(), restriction) {
                (Some(existing), Some(more)) => existing.union_with(&more),
                (existing, _) => *existing = None,
            },
            Entry::Vacant(entry) => {
                entry.insert(restriction);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobEntry;
    use crate::universe::DEFAULT_PRIORITY;
    use rsolv_evr::Relation;

    fn pkg(name: &str, evr: &str) -> Package {
        Package::parse(name, evr, "x86_64").unwrap()
    }

    fn rel(s: &str) -> Relation {
        Relation::parse(s).unwrap()
    }

    fn generate(universe: &Universe, job: &Job, flags: SolverFlags) -> (RuleSet, JobContext) {
        let policy = Policy::new();
        RuleGenerator::new(universe, &flags, &policy).generate(job)
    }

    fn install(id: PackageId) -> Job {
        let mut job = Job::new();
        job.push(JobEntry::new(JobAction::Install, JobTarget::one(id), JobFlags::empty()));
        job
    }

    #[test]
    fn test_install_generates_job_and_requires_rules() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let a = universe.add_package(repo, pkg("a", "1-1").with_requires(rel("b")));
        let b = universe.add_package(repo, pkg("b", "1-1"));
        universe.add_package(repo, pkg("unrelated", "1-1").with_requires(rel("missing")));

        let (rules, _) = generate(&universe, &install(a), SolverFlags::default());

        let job: Vec<_> = rules.rules_of_type(RuleType::Job).collect();
        assert_eq!(job.len(), 1);
        assert_eq!(job[0].literals(), &[a]);
        assert_eq!(job[0].job(), Some(0));

        let requires: Vec<_> = rules.rules_of_type(RuleType::PackageRequires).collect();
        assert_eq!(requires.len(), 1);
        assert_eq!(requires[0].literals(), &[-a, b]);
        assert_eq!(requires[0].dep(), Some("b"));

        // unreachable packages get no rules
        assert_eq!(rules.count_by_type(RuleType::PackageNothingProvides), 0);
    }

    #[test]
    fn test_install_without_candidates() {
        let mut universe = Universe::new();
        universe.add_repo("fedora", DEFAULT_PRIORITY);

        let mut job = Job::new();
        job.push(JobEntry::new(JobAction::Install, JobTarget::name("ghost"), JobFlags::WEAK));

        let (rules, _) = generate(&universe, &job, SolverFlags::default());
        let rule = rules.get(0).unwrap();
        assert_eq!(rule.rule_type(), RuleType::JobUnknownPackage);
        assert!(rule.is_empty());
        assert!(rule.is_weak());
        assert_eq!(rule.dep(), Some("ghost"));
    }

    #[test]
    fn test_keep_rule_lists_installed_first() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let installed = universe.add_installed(pkg("a", "1-1"));
        let newer = universe.add_package(repo, pkg("a", "2-1"));
        let older = universe.add_package(repo, pkg("a", "0.5-1"));

        let (rules, _) = generate(&universe, &Job::new(), SolverFlags::default());
        let keep: Vec<_> = rules.rules_of_type(RuleType::Update).collect();
        assert_eq!(keep[0].literals(), &[installed, newer]);

        let flags = SolverFlags {
            allow_downgrade: true,
            ..Default::default()
        };
        let (rules, _) = generate(&universe, &Job::new(), flags);
        let keep: Vec<_> = rules.rules_of_type(RuleType::Update).collect();
        assert_eq!(keep[0].literals(), &[installed, newer, older]);
        assert_eq!(rules.count_by_type(RuleType::PackageSameName), 3);
    }

    #[test]
    fn test_update_all_prefers_newer() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let installed = universe.add_installed(pkg("a", "1-1"));
        let newer = universe.add_package(repo, pkg("a", "2-1"));
        let newest = universe.add_package(repo, pkg("a", "3-1"));

        let mut job = Job::new();
        job.push(JobEntry::new(JobAction::Update, JobTarget::All, JobFlags::FORCEBEST));

        let (rules, _) = generate(&universe, &job, SolverFlags::default());
        let keep: Vec<_> = rules.rules_of_type(RuleType::Update).collect();
        assert_eq!(keep[0].literals(), &[newest, newer, installed]);

        let best: Vec<_> = rules.rules_of_type(RuleType::Best).collect();
        assert_eq!(best[0].literals(), &[newest]);
        assert_eq!(best[0].source(), Some(installed));
    }

    #[test]
    fn test_distupgrade_substitutes_installed() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let installed = universe.add_installed(pkg("a", "2-1"));
        universe.add_package(repo, pkg("a", "2-1"));
        let older = universe.add_package(repo, pkg("a", "1-1"));
        let orphan = universe.add_installed(pkg("orphan", "1-1"));

        let mut job = Job::new();
        job.push(JobEntry::new(JobAction::DistUpgrade, JobTarget::All, JobFlags::empty()));

        let (rules, _) = generate(&universe, &job, SolverFlags::default());
        let dup: Vec<_> = rules.rules_of_type(RuleType::Distupgrade).collect();
        assert_eq!(dup.len(), 2);
        assert_eq!(dup[0].literals(), &[installed, older]);
        assert_eq!(dup[1].literals(), &[-orphan]);

        let flags = SolverFlags {
            keep_orphans: true,
            ..Default::default()
        };
        let (rules, _) = generate(&universe, &job, flags);
        assert_eq!(rules.count_by_type(RuleType::Distupgrade), 1);
        assert_eq!(rules.count_by_type(RuleType::Update), 1);
    }

    #[test]
    fn test_broken_installed_dependencies_are_ignored() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        universe.add_installed(pkg("a", "1-1").with_requires(rel("b")));
        universe.add_installed(pkg("c", "1-1").with_conflicts(rel("a")));
        universe.add_package(repo, pkg("b", "1-1"));

        let (rules, _) = generate(&universe, &Job::new(), SolverFlags::default());
        assert_eq!(rules.count_by_type(RuleType::PackageRequires), 0);
        assert_eq!(rules.count_by_type(RuleType::PackageConflict), 0);

        let mut job = Job::new();
        job.push(JobEntry::new(JobAction::Verify, JobTarget::All, JobFlags::empty()));
        let (rules, context) = generate(&universe, &job, SolverFlags::default());
        assert!(context.verify);
        assert_eq!(rules.count_by_type(RuleType::PackageRequires), 1);
        assert_eq!(rules.count_by_type(RuleType::PackageConflict), 1);
    }

    #[test]
    fn test_obsoletes_and_self_conflict() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let old = universe.add_installed(pkg("old", "1-1"));
        let new = universe.add_package(repo, pkg("new", "1-1").with_obsoletes(rel("old < 2")));
        let odd = universe.add_package(
            repo,
            pkg("odd", "1-1")
                .with_provides(rel("feature"))
                .with_conflicts(rel("feature")),
        );

        let mut job = install(new);
        job.push(JobEntry::new(JobAction::Install, JobTarget::one(odd), JobFlags::empty()));
        let (rules, _) = generate(&universe, &job, SolverFlags::default());

        let obsoletes: Vec<_> = rules.rules_of_type(RuleType::PackageObsoletes).collect();
        assert_eq!(obsoletes.len(), 1);
        assert_eq!(obsoletes[0].literals(), &[-new, -old]);

        let keep: Vec<_> = rules.rules_of_type(RuleType::Update).collect();
        assert_eq!(keep[0].literals(), &[old, new]);

        let self_conflicts: Vec<_> = rules.rules_of_type(RuleType::PackageSelfConflict).collect();
        assert_eq!(self_conflicts[0].literals(), &[-odd]);
    }

    #[test]
    fn test_erase_marks_cleandeps() {
        let mut universe = Universe::new();
        let a = universe.add_installed(pkg("a", "1-1"));

        let mut job = Job::new();
        job.push(JobEntry::new(JobAction::Erase, JobTarget::Solvable(a), JobFlags::CLEANDEPS));

        let (rules, context) = generate(&universe, &job, SolverFlags::default());
        assert!(context.erase.has(a));
        assert!(context.cleandeps.has(a));
        assert_eq!(rules.get(0).unwrap().literals(), &[-a]);
        assert_eq!(rules.count_by_type(RuleType::Update), 0);
    }
}

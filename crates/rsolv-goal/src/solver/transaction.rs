use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::universe::{Package, PackageId, PackageSet, Universe};

/// What happens to one package in a transaction, as seen through a mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepType {
    Ignore,
    Erase,
    Install,
    Upgrade,
    Upgraded,
    Downgrade,
    Downgraded,
    Reinstall,
    Reinstalled,
    Change,
    Changed,
    Obsoletes,
    Obsoleted,
    MultiInstall,
    MultiReinstall,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Ignore => "ignore",
            StepType::Erase => "erase",
            StepType::Install => "install",
            StepType::Upgrade => "upgrade",
            StepType::Upgraded => "upgraded",
            StepType::Downgrade => "downgrade",
            StepType::Downgraded => "downgraded",
            StepType::Reinstall => "reinstall",
            StepType::Reinstalled => "reinstalled",
            StepType::Change => "change",
            StepType::Changed => "changed",
            StepType::Obsoletes => "obsoletes",
            StepType::Obsoleted => "obsoleted",
            StepType::MultiInstall => "multi-install",
            StepType::MultiReinstall => "multi-reinstall",
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How step types are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionMode(u32);

impl TransactionMode {
    /// Report the incoming side of replacements
    pub const SHOW_ACTIVE: TransactionMode = TransactionMode(1 << 0);
    /// Report both sides of replacements
    pub const SHOW_ALL: TransactionMode = TransactionMode(1 << 1);
    pub const SHOW_OBSOLETES: TransactionMode = TransactionMode(1 << 2);
    pub const SHOW_MULTIINSTALL: TransactionMode = TransactionMode(1 << 3);
    /// Same EVR with a different arch or vendor counts as a reinstall
    pub const CHANGE_IS_REINSTALL: TransactionMode = TransactionMode(1 << 4);

    pub const fn empty() -> Self {
        TransactionMode(0)
    }

    pub fn contains(&self, other: TransactionMode) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TransactionMode {
    type Output = TransactionMode;

    fn bitor(self, rhs: TransactionMode) -> TransactionMode {
        TransactionMode(self.0 | rhs.0)
    }
}

/// Replacement relation of a step, independent of any mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Install,
    MultiInstall,
    MultiReinstall,
    Upgrade,
    Downgrade,
    Reinstall,
    Change,
    Obsoletes,
    Erase,
    Upgraded,
    Downgraded,
    Reinstalled,
    Changed,
    Obsoleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: PackageId,
    kind: Kind,
    /// Incoming package: installed packages it replaces.
    /// Outgoing package: the package replacing it.
    related: Vec<PackageId>,
}

impl Step {
    /// Whether the package comes in (as opposed to going away)
    pub fn is_incoming(&self) -> bool {
        matches!(
            self.kind,
            Kind::Install
                | Kind::MultiInstall
                | Kind::MultiReinstall
                | Kind::Upgrade
                | Kind::Downgrade
                | Kind::Reinstall
                | Kind::Change
                | Kind::Obsoletes
        )
    }
}

/// The typed outcome of a successful solve
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    steps: Vec<Step>,
    index: HashMap<PackageId, usize>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the steps turning the installed set into `kept`.
    ///
    /// An outgoing package is replaced by the newest incoming package of its name
    /// (multiversion packages only replace their identical NEVRA), otherwise by an
    /// incoming package obsoleting it, otherwise erased.
    pub fn from_decisions(universe: &Universe, kept: &PackageSet, multiversion: &PackageSet) -> Self {
        let installed = universe.installed();

        let mut incoming = kept.clone();
        incoming.difference_with(&installed);
        let mut outgoing = installed;
        outgoing.difference_with(kept);

        let incoming: Vec<(PackageId, &Package)> = incoming
            .iter()
            .filter_map(|id| universe.package(id).map(|p| (id, p)))
            .collect();

        // outgoing id -> (replacing id, replaced by obsoletes)
        let mut replaced_by: HashMap<PackageId, (PackageId, bool)> = HashMap::new();
        for removed_id in outgoing.iter() {
            let Some(removed) = universe.package(removed_id) else {
                continue;
            };

            let same_name = incoming
                .iter()
                .filter(|(id, p)| {
                    p.name == removed.name
                        && p.arch_compatible(removed)
                        && (!multiversion.has(*id) || p.same_nevra(removed))
                })
                .max_by(|(a_id, a), (b_id, b)| a.evr.compare(&b.evr).then_with(|| b_id.cmp(a_id)));

            if let Some((id, _)) = same_name {
                replaced_by.insert(removed_id, (*id, false));
            } else if let Some((id, _)) = incoming.iter().find(|(_, p)| p.obsoletes_package(removed)) {
                replaced_by.insert(removed_id, (*id, true));
            }
        }

        let mut transaction = Transaction::new();
        for &(id, package) in &incoming {
            let replaces: Vec<PackageId> = outgoing
                .iter()
                .filter(|r| replaced_by.get(r).is_some_and(|(by, _)| *by == id))
                .collect();
            let first_same_name = replaces
                .iter()
                .copied()
                .find(|r| replaced_by.get(r).is_some_and(|(_, obsoleted)| !obsoleted));

            let kind = if multiversion.has(id) {
                if replaces.is_empty() {
                    Kind::MultiInstall
                } else {
                    Kind::MultiReinstall
                }
            } else {
                match first_same_name.and_then(|r| universe.package(r)) {
                    Some(old) => match compare(package, old) {
                        Ordering::Greater => Kind::Upgrade,
                        Ordering::Less => Kind::Downgrade,
                        Ordering::Equal if is_reinstall(package, old) => Kind::Reinstall,
                        Ordering::Equal => Kind::Change,
                    },
                    None if !replaces.is_empty() => Kind::Obsoletes,
                    None => Kind::Install,
                }
            };

            transaction.push(Step {
                id,
                kind,
                related: replaces.clone(),
            });

            for removed_id in replaces {
                let kind = match replaced_by.get(&removed_id) {
                    Some((_, true)) => Kind::Obsoleted,
                    _ => match universe.package(removed_id) {
                        Some(old) => match compare(package, old) {
                            Ordering::Greater => Kind::Upgraded,
                            Ordering::Less => Kind::Downgraded,
                            Ordering::Equal if is_reinstall(package, old) => Kind::Reinstalled,
                            Ordering::Equal => Kind::Changed,
                        },
                        None => Kind::Erase,
                    },
                };
                transaction.push(Step {
                    id: removed_id,
                    kind,
                    related: vec![id],
                });
            }
        }

        for removed_id in outgoing.iter().filter(|id| !replaced_by.contains_key(id)) {
            transaction.push(Step {
                id: removed_id,
                kind: Kind::Erase,
                related: Vec::new(),
            });
        }

        transaction
    }

    fn push(&mut self, step: Step) {
        self.index.insert(step.id, self.steps.len());
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn contains(&self, id: PackageId) -> bool {
        self.index.contains_key(&id)
    }

    /// Step type of a package under `mode`; `Ignore` for packages outside the transaction
    pub fn step_type(&self, id: PackageId, mode: TransactionMode) -> StepType {
        let Some(step) = self.index.get(&id).and_then(|&i| self.steps.get(i)) else {
            return StepType::Ignore;
        };

        let show_active = mode.contains(TransactionMode::SHOW_ACTIVE);
        let show_all = mode.contains(TransactionMode::SHOW_ALL);
        let change_is_reinstall = mode.contains(TransactionMode::CHANGE_IS_REINSTALL);
        let show_obsoletes = mode.contains(TransactionMode::SHOW_OBSOLETES);
        let show_multiinstall = mode.contains(TransactionMode::SHOW_MULTIINSTALL);

        match step.kind {
            Kind::Install => StepType::Install,
            Kind::Erase => StepType::Erase,
            Kind::MultiInstall if show_multiinstall => StepType::MultiInstall,
            Kind::MultiInstall => StepType::Install,
            _ if step.is_incoming() && !show_active && !show_all => StepType::Ignore,
            _ if !step.is_incoming() && show_active && !show_all => StepType::Ignore,
            Kind::MultiReinstall if show_multiinstall => StepType::MultiReinstall,
            Kind::MultiReinstall | Kind::Reinstall => StepType::Reinstall,
            Kind::Upgrade => StepType::Upgrade,
            Kind::Downgrade => StepType::Downgrade,
            Kind::Change if change_is_reinstall => StepType::Reinstall,
            Kind::Change => StepType::Change,
            Kind::Obsoletes if show_obsoletes => StepType::Obsoletes,
            Kind::Obsoletes => StepType::Upgrade,
            Kind::Upgraded => StepType::Upgraded,
            Kind::Downgraded => StepType::Downgraded,
            Kind::Reinstalled => StepType::Reinstalled,
            Kind::Changed if change_is_reinstall => StepType::Reinstalled,
            Kind::Changed => StepType::Changed,
            Kind::Obsoleted if show_obsoletes => StepType::Obsoleted,
            Kind::Obsoleted => StepType::Upgraded,
        }
    }

    /// Packages whose step type under `mode` is one of `types`, in step order
    pub fn packages_of_type(&self, mode: TransactionMode, types: &[StepType]) -> Vec<PackageId> {
        self.steps
            .iter()
            .filter(|step| types.contains(&self.step_type(step.id, mode)))
            .map(|step| step.id)
            .collect()
    }

    /// For an incoming package the installed packages it replaces; for an outgoing one
    /// the package replacing it
    pub fn all_obs_pkgs(&self, id: PackageId) -> Vec<PackageId> {
        self.index
            .get(&id)
            .and_then(|&i| self.steps.get(i))
            .map(|step| step.related.clone())
            .unwrap_or_default()
    }
}

fn compare(new: &Package, old: &Package) -> Ordering {
    new.evr.compare(&old.evr)
}

fn is_reinstall(new: &Package, old: &Package) -> bool {
    new.arch == old.arch && new.vendor == old.vendor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::DEFAULT_PRIORITY;
    use rsolv_evr::Relation;

    const ALL: TransactionMode = TransactionMode(0b10111);

    fn pkg(name: &str, evr: &str) -> Package {
        Package::parse(name, evr, "x86_64").unwrap()
    }

    #[test]
    fn test_upgrade_and_erase() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let old = universe.add_installed(pkg("httpd", "2.2-1"));
        let gone = universe.add_installed(pkg("gone", "1-1"));
        let kept_installed = universe.add_installed(pkg("bash", "5-1"));
        let new = universe.add_package(repo, pkg("httpd", "2.4-1"));

        let kept: PackageSet = [kept_installed, new].into_iter().collect();
        let transaction = Transaction::from_decisions(&universe, &kept, &PackageSet::new());

        assert_eq!(transaction.len(), 3);
        assert_eq!(transaction.step_type(new, ALL), StepType::Upgrade);
        assert_eq!(transaction.step_type(old, ALL), StepType::Upgraded);
        assert_eq!(transaction.step_type(gone, ALL), StepType::Erase);
        assert_eq!(transaction.step_type(kept_installed, ALL), StepType::Ignore);
        assert_eq!(transaction.all_obs_pkgs(new), vec![old]);
        assert_eq!(transaction.all_obs_pkgs(old), vec![new]);
    }

    #[test]
    fn test_mode_hides_one_side() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let old = universe.add_installed(pkg("a", "2-1"));
        let new = universe.add_package(repo, pkg("a", "1-1"));

        let kept: PackageSet = [new].into_iter().collect();
        let transaction = Transaction::from_decisions(&universe, &kept, &PackageSet::new());

        let active = TransactionMode::SHOW_ACTIVE;
        assert_eq!(transaction.step_type(new, active), StepType::Downgrade);
        assert_eq!(transaction.step_type(old, active), StepType::Ignore);

        let passive = TransactionMode::empty();
        assert_eq!(transaction.step_type(new, passive), StepType::Ignore);
        assert_eq!(transaction.step_type(old, passive), StepType::Downgraded);
    }

    #[test]
    fn test_obsoletes() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let old = universe.add_installed(pkg("old", "1-1"));
        let new = universe.add_package(
            repo,
            pkg("new", "1-1").with_obsoletes(Relation::parse("old").unwrap()),
        );

        let kept: PackageSet = [new].into_iter().collect();
        let transaction = Transaction::from_decisions(&universe, &kept, &PackageSet::new());

        assert_eq!(transaction.step_type(new, ALL), StepType::Obsoletes);
        assert_eq!(transaction.step_type(old, ALL), StepType::Obsoleted);

        let passive = TransactionMode::SHOW_OBSOLETES | TransactionMode::CHANGE_IS_REINSTALL;
        assert_eq!(transaction.packages_of_type(passive, &[StepType::Obsoleted]), vec![old]);
        assert_eq!(transaction.step_type(new, TransactionMode::SHOW_ACTIVE), StepType::Upgrade);
    }

    #[test]
    fn test_reinstall_and_change() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let a_old = universe.add_installed(pkg("a", "1-1"));
        let b_old = universe.add_installed(pkg("b", "1-1"));
        let a_new = universe.add_package(repo, pkg("a", "1-1"));
        let b_new = universe.add_package(repo, pkg("b", "1-1").with_vendor("Other"));

        let kept: PackageSet = [a_new, b_new].into_iter().collect();
        let transaction = Transaction::from_decisions(&universe, &kept, &PackageSet::new());

        assert_eq!(transaction.step_type(a_new, ALL), StepType::Reinstall);
        assert_eq!(transaction.step_type(a_old, ALL), StepType::Reinstalled);
        assert_eq!(transaction.step_type(b_new, ALL), StepType::Reinstall);
        assert_eq!(transaction.step_type(b_new, TransactionMode::SHOW_ACTIVE), StepType::Change);
        assert_eq!(transaction.step_type(b_old, TransactionMode::empty()), StepType::Changed);
    }

    #[test]
    fn test_multiversion_installs_alongside() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let k1 = universe.add_installed(pkg("kernel", "6.1-1"));
        let k2 = universe.add_package(repo, pkg("kernel", "6.2-1"));

        let kept: PackageSet = [k1, k2].into_iter().collect();
        let multiversion: PackageSet = [k1, k2].into_iter().collect();
        let transaction = Transaction::from_decisions(&universe, &kept, &multiversion);

        assert_eq!(transaction.len(), 1);
        assert_eq!(transaction.step_type(k2, ALL), StepType::Install);
        assert_eq!(
            transaction.step_type(k2, TransactionMode::SHOW_MULTIINSTALL),
            StepType::MultiInstall
        );
    }
}

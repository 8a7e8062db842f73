use crate::goal::actions::PackageState;
use crate::solver::{RuleType, Solver};
use crate::universe::{PackageId, PackageSet, Universe};

/// Packages named by conflict rules of any problem
pub(super) fn conflict_pkgs(solver: &Solver<'_>, state: PackageState) -> PackageSet {
    collect(solver, state, |kind| match kind {
        RuleType::PackageConflict | RuleType::PackageSameName => (true, true),
        RuleType::PackageSelfConflict => (true, false),
        _ => (false, false),
    })
}

/// Packages whose requirements cannot be met in any problem
pub(super) fn broken_dependency_pkgs(solver: &Solver<'_>, state: PackageState) -> PackageSet {
    collect(solver, state, |kind| match kind {
        RuleType::PackageNothingProvides | RuleType::PackageRequires => (true, false),
        _ => (false, false),
    })
}

/// `pick` says whether the source and the target of a rule kind are reported
fn collect<F>(solver: &Solver<'_>, state: PackageState, pick: F) -> PackageSet
where
    F: Fn(RuleType) -> (bool, bool),
{
    let universe = solver.universe();
    let mut found: Vec<PackageId> = Vec::new();

    for index in 0..solver.problem_count() {
        for rule in solver.problem_rules(index) {
            let Some(info) = solver.rule_info(rule) else {
                continue;
            };
            let (source, target) = pick(info.kind);
            let ids = [info.source.filter(|_| source), info.target.filter(|_| target)];
            for id in ids.into_iter().flatten() {
                if !found.contains(&id) && state_matches(universe, state, id) {
                    found.push(id);
                }
            }
        }
    }

    if state == PackageState::Available {
        remove_installed_twins(universe, &mut found);
    }

    found.into_iter().collect()
}

fn state_matches(universe: &Universe, state: PackageState, id: PackageId) -> bool {
    match state {
        PackageState::All => true,
        PackageState::Installed => universe.is_installed(id),
        PackageState::Available => true,
    }
}

/// Drop installed packages, and available ones identical to an installed one
fn remove_installed_twins(universe: &Universe, found: &mut Vec<PackageId>) {
    let (installed, available): (Vec<PackageId>, Vec<PackageId>) =
        found.iter().partition(|&&id| universe.is_installed(id));

    *found = available
        .into_iter()
        .filter(|&id| {
            let Some(package) = universe.package(id) else {
                return false;
            };
            !installed
                .iter()
                .filter_map(|&i| universe.package(i))
                .any(|other| other.same_nevra(package))
        })
        .collect();
}

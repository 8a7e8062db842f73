//! Bounding how many versions of an install-only package stay installed.

use std::cmp::Ordering;

use rsolv_evr::Relation;

use crate::job::{JobAction, JobEntry, JobFlags, JobTarget};
use crate::solver::Solver;
use crate::universe::{PackageId, Universe};

/// Job entries that bring every install-only name back within the limit.
///
/// Empty when nothing exceeds the limit, in which case no second solve is needed.
pub(super) fn limit_entries(solver: &Solver<'_>) -> Vec<JobEntry> {
    let universe = solver.universe();
    let limit = universe.installonly_limit() as usize;
    if limit == 0 {
        return Vec::new();
    }

    let kernel = universe.running_kernel();
    let mut entries = Vec::new();

    for name in universe.installonly() {
        let mut kept: Vec<PackageId> = universe
            .what_provides(&Relation::new(name.as_str()))
            .into_iter()
            .filter(|&id| solver.decision_level(id) > 0)
            .collect();

        if kept.len() <= limit || kept.iter().all(|&id| universe.is_installed(id)) {
            continue;
        }

        kept.sort_by(|&a, &b| compare(universe, kernel, a, b));

        // walking groups from the end leaves each group newest and incoming first
        while let Some(last) = kept.pop() {
            let mut group = vec![last];
            let group_name = universe.package(last).map(|p| p.name.as_str());
            while let Some(&next) = kept.last() {
                if universe.package(next).map(|p| p.name.as_str()) != group_name {
                    break;
                }
                group.push(next);
                kept.pop();
            }

            if group.len() <= limit {
                continue;
            }
            log::debug!(
                "install-only {}: keeping {} of {} versions",
                group_name.unwrap_or(name),
                limit,
                group.len()
            );
            for (i, id) in group.into_iter().enumerate() {
                let action = if i < limit { JobAction::Install } else { JobAction::Erase };
                entries.push(JobEntry::new(action, JobTarget::Solvable(id), JobFlags::empty()));
            }
        }
    }

    entries
}

/// Same names together, installed before available, the running kernel and what
/// depends on it after the other installed versions, then ascending EVR
fn compare(universe: &Universe, kernel: Option<PackageId>, a: PackageId, b: PackageId) -> Ordering {
    let (Some(pa), Some(pb)) = (universe.package(a), universe.package(b)) else {
        return a.cmp(&b);
    };

    let rank = |id: PackageId| -> u8 {
        if !universe.is_installed(id) {
            2
        } else if kernel.is_some_and(|k| id == k || depends_on(universe, id, k)) {
            1
        } else {
            0
        }
    };

    pa.name
        .cmp(&pb.name)
        .then_with(|| rank(a).cmp(&rank(b)))
        .then_with(|| pa.evr.compare(&pb.evr))
        .then_with(|| a.cmp(&b))
}

/// Whether one of the requirements of `id` is provided by `target`
fn depends_on(universe: &Universe, id: PackageId, target: PackageId) -> bool {
    universe.package(id).is_some_and(|package| {
        package
            .requires
            .iter()
            .any(|relation| universe.what_provides(relation).contains(&target))
    })
}

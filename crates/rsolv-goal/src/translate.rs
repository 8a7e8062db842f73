//! Selector to job translation.
//!
//! A selector is resolved into `(target, flags)` selections: the required filter
//! (explicit packages, name, file or provides) produces the initial selections, then
//! arch, evr and reponame filters rewrite or narrow them. Selections are appended to
//! the destination job; nothing already in the job is touched.

use rsolv_evr::{Evr, Operator, Relation};

use crate::error::SelectorError;
use crate::job::{Job, JobAction, JobEntry, JobFlags, JobTarget};
use crate::selector::{CmpKind, Comparison, Filter, FilterKey, Selector};
use crate::universe::{PackageId, PackageSet, Universe};

type Selection = Vec<(JobTarget, JobFlags)>;

/// Append the entry for one explicit package
pub(crate) fn package_to_job(id: PackageId, action: JobAction, flags: JobFlags, job: &mut Job) {
    job.push(JobEntry::new(
        action,
        JobTarget::one(id),
        flags | JobFlags::SETARCH | JobFlags::SETEVR,
    ));
}

/// Append the entries a selector denotes
pub(crate) fn selector_to_job(
    universe: &Universe,
    sltr: &Selector,
    action: JobAction,
    flags: JobFlags,
    job: &mut Job,
) -> Result<(), SelectorError> {
    if !sltr.has_required_filter() {
        if sltr.has_optional_filter() {
            return Err(SelectorError::MissingRequiredFilter);
        }
        return Ok(());
    }

    let mut selection: Selection = Vec::new();

    if let Some(pkgs) = sltr.pkgs() {
        if !pkgs.is_empty() {
            selection.push((
                JobTarget::OneOf(pkgs.clone()),
                JobFlags::SETARCH | JobFlags::SETEVR,
            ));
        }
    } else if let Some(filter) = sltr.name() {
        filter_name(universe, filter, job, &mut selection)?;
    } else if let Some(filter) = sltr.file() {
        filter_file(universe, filter, &mut selection)?;
    } else if let Some(filter) = sltr.provides() {
        filter_provides(universe, filter, job, &mut selection)?;
    }

    if let Some(filter) = sltr.arch() {
        filter_arch(universe, filter, &mut selection)?;
    }
    if let Some(filter) = sltr.evr() {
        filter_evr(universe, filter, &mut selection)?;
    }
    if let Some(filter) = sltr.reponame() {
        filter_reponame(universe, filter, &mut selection)?;
    }

    for (target, selection_flags) in selection {
        job.push(JobEntry::new(action, target, selection_flags | flags));
    }
    Ok(())
}

fn already_selected(target: &JobTarget, job: &Job, selection: &Selection) -> bool {
    job.has_target(target) || selection.iter().any(|(t, _)| t == target)
}

fn filter_name(
    universe: &Universe,
    filter: &Filter,
    job: &Job,
    selection: &mut Selection,
) -> Result<(), SelectorError> {
    let name = filter.single_match()?;

    match filter.cmp() {
        Comparison::EQ => {
            if !universe.packages_by_name(name).is_empty() {
                selection.push((JobTarget::name(name), JobFlags::empty()));
            }
        }
        Comparison::GLOB => {
            let matching: Vec<String> = universe
                .names()
                .filter(|candidate| Comparison::GLOB.matches(name, candidate))
                .map(str::to_string)
                .collect();
            for candidate in matching {
                let target = JobTarget::name(candidate);
                if !already_selected(&target, job, selection) {
                    selection.push((target, JobFlags::empty()));
                }
            }
        }
        _ => return Err(SelectorError::IncorrectComparisonType),
    }
    Ok(())
}

fn filter_file(universe: &Universe, filter: &Filter, selection: &mut Selection) -> Result<(), SelectorError> {
    let path = filter.single_match()?;

    let cmp = match filter.cmp().kind {
        CmpKind::Glob => filter.cmp().icase(),
        _ => filter.cmp(),
    };

    let owners: PackageSet = if cmp == Comparison::EQ {
        universe.file_owners(path).into_iter().collect()
    } else {
        let considered = universe.considered();
        universe
            .iter()
            .filter(|(id, p)| considered.has(*id) && p.files.iter().any(|f| cmp.matches(path, f)))
            .map(|(id, _)| id)
            .collect()
    };

    if owners.is_empty() {
        return Err(SelectorError::NoMatch(path.to_string()));
    }
    selection.push((JobTarget::OneOf(owners), JobFlags::empty()));
    Ok(())
}

fn filter_provides(
    universe: &Universe,
    filter: &Filter,
    job: &Job,
    selection: &mut Selection,
) -> Result<(), SelectorError> {
    let value = filter.single_match()?;

    match filter.cmp() {
        Comparison::EQ => {
            let relation = Relation::parse(value)?;
            selection.push((JobTarget::provides(relation), JobFlags::empty()));
        }
        Comparison::GLOB => {
            let matching: Vec<String> = universe
                .provide_names()
                .filter(|candidate| Comparison::GLOB.matches(value, candidate))
                .map(str::to_string)
                .collect();
            for candidate in matching {
                let target = JobTarget::provides(Relation::new(candidate));
                if !already_selected(&target, job, selection) {
                    selection.push((target, JobFlags::empty()));
                }
            }
        }
        _ => return Err(SelectorError::IncorrectComparisonType),
    }
    Ok(())
}

/// Narrow an explicit package set with a predicate, dropping it if nothing is left
fn narrow(universe: &Universe, set: &PackageSet, keep: impl Fn(&crate::universe::Package) -> bool) -> PackageSet {
    set.iter()
        .filter(|&id| universe.package(id).is_some_and(&keep))
        .collect()
}

fn filter_arch(universe: &Universe, filter: &Filter, selection: &mut Selection) -> Result<(), SelectorError> {
    let arch = filter.single_match()?;
    if filter.cmp() != Comparison::EQ {
        return Err(SelectorError::IncorrectComparisonType);
    }
    if !universe.has_arch(arch) {
        return Err(SelectorError::NoMatch(arch.to_string()));
    }

    let current = std::mem::take(selection);
    for (target, flags) in current {
        let flags = flags | JobFlags::SETARCH;
        let target = match target {
            JobTarget::Name { relation, .. } => JobTarget::Name {
                relation,
                arch: Some(arch.to_string()),
            },
            JobTarget::Provides { relation, .. } => JobTarget::Provides {
                relation,
                arch: Some(arch.to_string()),
            },
            JobTarget::OneOf(set) => {
                let narrowed = narrow(universe, &set, |p| p.arch == arch);
                if narrowed.is_empty() {
                    continue;
                }
                JobTarget::OneOf(narrowed)
            }
            other => other,
        };
        selection.push((target, flags));
    }
    Ok(())
}

fn filter_evr(universe: &Universe, filter: &Filter, selection: &mut Selection) -> Result<(), SelectorError> {
    let value = filter.single_match()?;
    if filter.cmp() != Comparison::EQ {
        return Err(SelectorError::IncorrectComparisonType);
    }

    let (evr, set_flag) = match filter.key() {
        FilterKey::Version => (Evr::new(0, value, None), JobFlags::SETEV),
        _ => (Evr::parse(value)?, JobFlags::SETEVR),
    };

    let current = std::mem::take(selection);
    for (target, flags) in current {
        let flags = flags | set_flag;
        let target = match target {
            JobTarget::Name { relation, arch } => JobTarget::Name {
                relation: relation.constrained(Operator::Equal, evr.clone()),
                arch,
            },
            JobTarget::Provides { relation, arch } => JobTarget::Provides {
                relation: relation.constrained(Operator::Equal, evr.clone()),
                arch,
            },
            JobTarget::OneOf(set) => {
                let narrowed = narrow(universe, &set, |p| match filter.key() {
                    FilterKey::Version => p.evr.version() == evr.version(),
                    _ => p.evr.compare(&evr) == std::cmp::Ordering::Equal,
                });
                if narrowed.is_empty() {
                    continue;
                }
                JobTarget::OneOf(narrowed)
            }
            other => other,
        };
        selection.push((target, flags));
    }
    Ok(())
}

fn filter_reponame(universe: &Universe, filter: &Filter, selection: &mut Selection) -> Result<(), SelectorError> {
    let reponame = filter.single_match()?;
    if filter.cmp() != Comparison::EQ {
        return Err(SelectorError::IncorrectComparisonType);
    }

    let current = std::mem::take(selection);
    for (target, flags) in current {
        let in_repo: PackageSet = target
            .resolve(universe)
            .into_iter()
            .filter(|&id| universe.package_repo(id).is_some_and(|r| r.name == reponame))
            .collect();
        if in_repo.is_empty() {
            continue;
        }
        selection.push((JobTarget::OneOf(in_repo), flags | JobFlags::SETREPO));
    }
    Ok(())
}

//! Package specs given on the command line.
//!
//! - `/usr/bin/foo` selects the owners of a file
//! - `name op evr` (e.g. `httpd >= 2.4`) selects providers of a relation
//! - `name-*` or another glob selects matching names
//! - anything else is an exact name
//!
//! A spec may narrow the arch with a trailing `.arch` when that arch exists in the
//! universe, and the repository with `@repo`.

use anyhow::{Context, Result};
use rsolv_goal::{Comparison, FilterKey, Selector, Universe};

fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Split `spec@repo` into the spec and the repository name
fn split_repo(spec: &str) -> (&str, Option<&str>) {
    match spec.rsplit_once('@') {
        Some((rest, repo)) if !rest.is_empty() && !repo.is_empty() => (rest, Some(repo)),
        _ => (spec, None),
    }
}

/// Split a trailing `.arch` known to the universe
fn split_arch<'s>(universe: &Universe, spec: &'s str) -> (&'s str, Option<&'s str>) {
    match spec.rsplit_once('.') {
        Some((name, arch)) if !name.is_empty() && universe.has_arch(arch) => (name, Some(arch)),
        _ => (spec, None),
    }
}

pub fn selector(universe: &Universe, spec: &str) -> Result<Selector> {
    let spec = spec.trim();
    let (spec, repo) = split_repo(spec);
    let mut sltr = Selector::new();

    if spec.starts_with('/') {
        let cmp = if is_glob(spec) { Comparison::GLOB } else { Comparison::EQ };
        sltr.set(FilterKey::File, cmp, spec)?;
    } else if spec.contains(char::is_whitespace) {
        sltr.set(FilterKey::Provides, Comparison::EQ, spec)?;
    } else {
        let (name, arch) = split_arch(universe, spec);
        let cmp = if is_glob(name) { Comparison::GLOB } else { Comparison::EQ };
        sltr.set(FilterKey::Name, cmp, name)?;
        if let Some(arch) = arch {
            sltr.set(FilterKey::Arch, Comparison::EQ, arch)?;
        }
    }

    if let Some(repo) = repo {
        sltr.set(FilterKey::Reponame, Comparison::EQ, repo)
            .with_context(|| format!("Invalid repository in {}", spec))?;
    }
    Ok(sltr)
}

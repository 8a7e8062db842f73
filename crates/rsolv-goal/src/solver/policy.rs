use std::cmp::Ordering;

use indexmap::IndexMap;

use crate::universe::{PackageId, Universe};

/// How the candidates of a rule are ordered before branching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    /// Request candidates: installed first, then repository priority and newest EVR
    Best,
    /// Keep the order the rule was generated in
    Keep,
    /// Providers of a dependency: like `Best`, preferring the requiring package's arch
    Dependency,
}

/// Policy for selecting between candidate packages.
///
/// When multiple packages can satisfy a rule, the policy
/// determines which one to try first.
#[derive(Debug, Clone, Default)]
pub struct Policy {
    /// Best-candidate narrowing keeps the arch of the installed package
    pub best_obey_policy: bool,
}

impl Policy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best_obey_policy(mut self, obey: bool) -> Self {
        self.best_obey_policy = obey;
        self
    }

    /// Candidates sorted by preference (best first).
    ///
    /// 1. Prefer installed packages
    /// 2. Prefer the arch of the requiring package (dependencies only)
    /// 3. Prefer lower repository priority values
    /// 4. Prefer higher EVRs
    /// 5. Fall back to package ID
    pub fn select_preferred(
        &self,
        universe: &Universe,
        preference: Preference,
        source: Option<PackageId>,
        candidates: &[PackageId],
    ) -> Vec<PackageId> {
        let mut sorted = candidates.to_vec();
        if preference == Preference::Keep {
            return sorted;
        }

        let source_arch = match preference {
            Preference::Dependency => source.and_then(|id| universe.package(id)).map(|p| p.arch.clone()),
            _ => None,
        };

        sorted.sort_by(|&a, &b| {
            let installed = universe.is_installed(b).cmp(&universe.is_installed(a));
            if installed != Ordering::Equal {
                return installed;
            }

            if let Some(arch) = &source_arch {
                let same_arch = |id| universe.package(id).is_some_and(|p| &p.arch == arch || p.is_noarch());
                let arch_order = same_arch(b).cmp(&same_arch(a));
                if arch_order != Ordering::Equal {
                    return arch_order;
                }
            }

            self.compare_available(universe, a, b)
        });
        sorted
    }

    /// Priority, then EVR descending, then id
    fn compare_available(&self, universe: &Universe, a: PackageId, b: PackageId) -> Ordering {
        universe
            .priority(a)
            .cmp(&universe.priority(b))
            .then_with(|| match (universe.package(a), universe.package(b)) {
                (Some(pa), Some(pb)) => pb.evr.compare(&pa.evr),
                _ => Ordering::Equal,
            })
            .then_with(|| a.cmp(&b))
    }

    /// Narrow candidates to the best ones of each name.
    ///
    /// Per name: the installed arch when `best_obey_policy` is set and one is installed,
    /// then the best repository priority, then the highest EVR. Input order is kept.
    pub fn best_candidates(&self, universe: &Universe, candidates: &[PackageId]) -> Vec<PackageId> {
        let mut by_name: IndexMap<&str, Vec<PackageId>> = IndexMap::new();
        for &id in candidates {
            if let Some(package) = universe.package(id) {
                by_name.entry(package.name.as_str()).or_default().push(id);
            }
        }

        let mut best = Vec::new();
        for (name, mut group) in by_name {
            if self.best_obey_policy {
                let installed_archs: Vec<&str> = universe
                    .installed_ids()
                    .into_iter()
                    .filter_map(|id| universe.package(id))
                    .filter(|p| p.name == name)
                    .map(|p| p.arch.as_str())
                    .collect();
                if !installed_archs.is_empty() {
                    let matching: Vec<PackageId> = group
                        .iter()
                        .copied()
                        .filter(|&id| {
                            universe.package(id).is_some_and(|p| {
                                p.is_noarch() || installed_archs.iter().any(|a| *a == p.arch || *a == "noarch")
                            })
                        })
                        .collect();
                    if !matching.is_empty() {
                        group = matching;
                    }
                }
            }

            let Some(&top) = group
                .iter()
                .min_by(|&&a, &&b| self.compare_available(universe, a, b))
            else {
                continue;
            };
            let same_rank = |id: PackageId| {
                universe.priority(id) == universe.priority(top)
                    && match (universe.package(id), universe.package(top)) {
                        (Some(p), Some(t)) => p.evr.compare(&t.evr) == Ordering::Equal,
                        _ => false,
                    }
            };
            best.extend(group.iter().copied().filter(|&id| same_rank(id)));
        }

        candidates.iter().copied().filter(|id| best.contains(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::{Package, DEFAULT_PRIORITY};

    fn pkg(name: &str, evr: &str, arch: &str) -> Package {
        Package::parse(name, evr, arch).unwrap()
    }

    #[test]
    fn test_best_prefers_installed_then_newest() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let old = universe.add_package(repo, pkg("a", "1-1", "x86_64"));
        let new = universe.add_package(repo, pkg("a", "2-1", "x86_64"));
        let installed = universe.add_installed(pkg("a", "1.5-1", "x86_64"));

        let policy = Policy::new();
        assert_eq!(
            policy.select_preferred(&universe, Preference::Best, None, &[old, new, installed]),
            vec![installed, new, old]
        );
        assert_eq!(
            policy.select_preferred(&universe, Preference::Keep, None, &[old, new, installed]),
            vec![old, new, installed]
        );
    }

    #[test]
    fn test_priority_beats_evr() {
        let mut universe = Universe::new();
        let main = universe.add_repo("main", 10);
        let extra = universe.add_repo("extra", 50);
        let newer = universe.add_package(extra, pkg("a", "2-1", "noarch"));
        let older = universe.add_package(main, pkg("a", "1-1", "noarch"));

        let policy = Policy::new();
        assert_eq!(
            policy.select_preferred(&universe, Preference::Best, None, &[newer, older]),
            vec![older, newer]
        );
        assert_eq!(policy.best_candidates(&universe, &[newer, older]), vec![older]);
    }

    #[test]
    fn test_dependency_prefers_source_arch() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        let app = universe.add_package(repo, pkg("app", "1-1", "i686"));
        let lib64 = universe.add_package(repo, pkg("lib", "1-1", "x86_64"));
        let lib32 = universe.add_package(repo, pkg("lib", "1-1", "i686"));

        let policy = Policy::new();
        assert_eq!(
            policy.select_preferred(&universe, Preference::Dependency, Some(app), &[lib64, lib32]),
            vec![lib32, lib64]
        );
    }

    #[test]
    fn test_best_candidates_obey_installed_arch() {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        universe.add_installed(pkg("a", "1-1", "i686"));
        let x86 = universe.add_package(repo, pkg("a", "2-1", "x86_64"));
        let i686 = universe.add_package(repo, pkg("a", "2-1", "i686"));
        let other = universe.add_package(repo, pkg("b", "1-1", "noarch"));

        let obeying = Policy::new().best_obey_policy(true);
        assert_eq!(obeying.best_candidates(&universe, &[x86, i686, other]), vec![i686, other]);
        assert_eq!(Policy::new().best_candidates(&universe, &[x86, i686]), vec![x86, i686]);
    }
}

//! The package universe: every installed and available package the resolver may
//! reason about.
//!
//! Packages get 1-based ids in insertion order; id 0 never names a package. Lookups by
//! name, provide and file go through an index that is built lazily and dropped whenever
//! the universe is mutated. `recompute_considered` and `make_provides_ready` force it.

mod loader;
mod package;
mod package_set;

pub use loader::{PackageSpec, RepoSpec, UniverseFile};
pub use package::Package;
pub use package_set::PackageSet;

use std::cell::OnceCell;
use std::collections::HashMap;

use indexmap::IndexMap;
use rsolv_evr::Relation;

/// Index of a package inside the universe (1-based, 0 = none)
pub type PackageId = i32;

/// Index of a repository inside the universe
pub type RepoId = usize;

/// Name of the repository holding installed packages
pub const SYSTEM_REPO_NAME: &str = "@System";

/// Default repository priority (lower = preferred)
pub const DEFAULT_PRIORITY: i32 = 99;

#[derive(Debug, Clone)]
pub struct Repo {
    pub name: String,
    pub priority: i32,
    installed: bool,
}

impl Repo {
    pub fn is_installed(&self) -> bool {
        self.installed
    }
}

/// Lookup tables derived from the package list
#[derive(Debug, Default)]
struct ProvidesIndex {
    considered: PackageSet,
    installed: PackageSet,
    by_name: IndexMap<String, Vec<PackageId>>,
    provides: IndexMap<String, Vec<(PackageId, Relation)>>,
    files: HashMap<String, Vec<PackageId>>,
    running_kernel: Option<PackageId>,
}

/// Catalog of packages, repositories and install-only policy
#[derive(Debug, Default)]
pub struct Universe {
    packages: Vec<Package>,
    repos: Vec<Repo>,
    installed_repo: Option<RepoId>,
    excludes: PackageSet,
    installonly: Vec<String>,
    installonly_limit: u32,
    kernel_release: Option<String>,
    index: OnceCell<ProvidesIndex>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an available repository, returning its id
    pub fn add_repo(&mut self, name: impl Into<String>, priority: i32) -> RepoId {
        self.index.take();
        self.repos.push(Repo {
            name: name.into(),
            priority,
            installed: false,
        });
        self.repos.len() - 1
    }

    /// The repository of installed packages, created on first use
    pub fn installed_repo(&mut self) -> RepoId {
        if let Some(id) = self.installed_repo {
            return id;
        }
        self.index.take();
        self.repos.push(Repo {
            name: SYSTEM_REPO_NAME.to_string(),
            priority: DEFAULT_PRIORITY,
            installed: true,
        });
        let id = self.repos.len() - 1;
        self.installed_repo = Some(id);
        id
    }

    /// Add a package to a repository, returning its id
    pub fn add_package(&mut self, repo: RepoId, mut package: Package) -> PackageId {
        self.index.take();
        package.repo = repo;
        self.packages.push(package);
        self.packages.len() as PackageId
    }

    /// Shorthand for adding to the installed repository
    pub fn add_installed(&mut self, package: Package) -> PackageId {
        let repo = self.installed_repo();
        self.add_package(repo, package)
    }

    pub fn package(&self, id: PackageId) -> Option<&Package> {
        if id <= 0 {
            return None;
        }
        self.packages.get(id as usize - 1)
    }

    pub fn repo(&self, id: RepoId) -> Option<&Repo> {
        self.repos.get(id)
    }

    pub fn repos(&self) -> &[Repo] {
        &self.repos
    }

    pub fn repo_by_name(&self, name: &str) -> Option<RepoId> {
        self.repos.iter().position(|r| r.name == name)
    }

    /// Repository of a package
    pub fn package_repo(&self, id: PackageId) -> Option<&Repo> {
        self.package(id).and_then(|p| self.repos.get(p.repo))
    }

    /// Priority used by the policy; installed packages take no part in priorities
    pub fn priority(&self, id: PackageId) -> i32 {
        match self.package_repo(id) {
            Some(repo) if !repo.installed => repo.priority,
            _ => DEFAULT_PRIORITY,
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Every package id, considered or not
    pub fn ids(&self) -> impl Iterator<Item = PackageId> {
        1..=(self.packages.len() as PackageId)
    }

    /// Every package with its id
    pub fn iter(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| ((i + 1) as PackageId, p))
    }

    pub fn is_installed(&self, id: PackageId) -> bool {
        self.package_repo(id).is_some_and(|r| r.installed)
    }

    /// Installed packages, in id order
    pub fn installed_ids(&self) -> Vec<PackageId> {
        self.index().installed.iter().collect()
    }

    pub fn installed(&self) -> PackageSet {
        self.index().installed.clone()
    }

    /// Hide a package from resolution. Installed packages stay visible.
    pub fn exclude(&mut self, id: PackageId) {
        self.index.take();
        self.excludes.set(id);
    }

    pub fn set_excludes(&mut self, excludes: PackageSet) {
        self.index.take();
        self.excludes = excludes;
    }

    pub fn set_installonly(&mut self, names: Vec<String>, limit: u32) {
        self.installonly = names;
        self.installonly_limit = limit;
    }

    /// Names whose providers may be installed side by side
    pub fn installonly(&self) -> &[String] {
        &self.installonly
    }

    /// Maximum number of coexisting install-only versions, 0 = unlimited
    pub fn installonly_limit(&self) -> u32 {
        self.installonly_limit
    }

    pub fn set_kernel_release(&mut self, release: Option<String>) {
        self.index.take();
        self.kernel_release = release;
    }

    pub fn kernel_release(&self) -> Option<&str> {
        self.kernel_release.as_deref()
    }

    /// Release of the booted kernel as reported by the running system
    pub fn detect_kernel_release() -> Option<String> {
        std::fs::read_to_string("/proc/sys/kernel/osrelease")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// The installed package of the booted kernel, if it can be identified
    pub fn running_kernel(&self) -> Option<PackageId> {
        self.index().running_kernel
    }

    /// Rebuild the considered set (everything not excluded)
    pub fn recompute_considered(&self) {
        self.index();
    }

    /// Make sure provide lookups are answered from an up-to-date index
    pub fn make_provides_ready(&self) {
        self.index();
    }

    /// Packages visible to resolution
    pub fn considered(&self) -> PackageSet {
        self.index().considered.clone()
    }

    pub fn is_considered(&self, id: PackageId) -> bool {
        self.index().considered.has(id)
    }

    /// Considered packages of exactly this name, in id order
    pub fn packages_by_name(&self, name: &str) -> Vec<PackageId> {
        self.index().by_name.get(name).cloned().unwrap_or_default()
    }

    /// Distinct names of considered packages, in first-seen order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.index().by_name.keys().map(String::as_str)
    }

    /// Distinct provide names of considered packages, in first-seen order
    pub fn provide_names(&self) -> impl Iterator<Item = &str> {
        self.index().provides.keys().map(String::as_str)
    }

    /// Considered packages owning exactly this file
    pub fn file_owners(&self, path: &str) -> Vec<PackageId> {
        self.index().files.get(path).cloned().unwrap_or_default()
    }

    /// Every considered package whose provides intersect `relation`, ascending.
    ///
    /// Unversioned relations naming an absolute path also match file lists.
    pub fn what_provides(&self, relation: &Relation) -> Vec<PackageId> {
        let index = self.index();
        let mut result: Vec<PackageId> = index
            .provides
            .get(relation.name())
            .into_iter()
            .flatten()
            .filter(|(_, provide)| provide.intersects(relation))
            .map(|(id, _)| *id)
            .collect();

        if relation.name().starts_with('/') && !relation.is_versioned() {
            if let Some(owners) = index.files.get(relation.name()) {
                result.extend(owners);
            }
        }

        result.sort_unstable();
        result.dedup();
        result
    }

    /// Whether any considered package is built for `arch`
    pub fn has_arch(&self, arch: &str) -> bool {
        let index = self.index();
        self.iter()
            .any(|(id, p)| p.arch == arch && index.considered.has(id))
    }

    /// `nevra@repo`, unique within a universe built from distinct repositories
    pub fn package_key(&self, id: PackageId) -> Option<String> {
        let package = self.package(id)?;
        let repo = self.repos.get(package.repo)?;
        Some(format!("{}@{}", package.nevra(), repo.name))
    }

    /// Resolve a `nevra@repo` key, or a bare NEVRA when it is unambiguous
    pub fn find_key(&self, key: &str) -> Option<PackageId> {
        if let Some(id) = self.ids().find(|&id| self.package_key(id).as_deref() == Some(key)) {
            return Some(id);
        }
        let mut matching = self.iter().filter(|(_, p)| p.nevra() == key).map(|(id, _)| id);
        let first = matching.next()?;
        matching.next().is_none().then_some(first)
    }

    fn index(&self) -> &ProvidesIndex {
        self.index.get_or_init(|| self.build_index())
    }

    fn build_index(&self) -> ProvidesIndex {
        let mut index = ProvidesIndex::default();

        for (id, package) in self.iter() {
            let installed = self.repos.get(package.repo).is_some_and(|r| r.installed);
            if installed {
                index.installed.set(id);
            } else if self.excludes.has(id) {
                continue;
            }
            index.considered.set(id);

            index
                .by_name
                .entry(package.name.clone())
                .or_default()
                .push(id);

            index
                .provides
                .entry(package.name.clone())
                .or_default()
                .push((id, package.self_provide()));
            for provide in &package.provides {
                index
                    .provides
                    .entry(provide.name().to_string())
                    .or_default()
                    .push((id, provide.clone()));
            }

            for file in &package.files {
                index.files.entry(file.clone()).or_default().push(id);
            }
        }

        index.running_kernel = self.find_running_kernel(&index.installed);
        log::debug!(
            "Indexed {} packages ({} considered, {} installed)",
            self.packages.len(),
            index.considered.len(),
            index.installed.len()
        );
        index
    }

    fn find_running_kernel(&self, installed: &PackageSet) -> Option<PackageId> {
        let release = self.kernel_release.as_deref()?;

        let by_uname = installed.iter().find(|&id| {
            self.package(id).is_some_and(|p| {
                p.provides.iter().any(|provide| {
                    provide.name() == "kernel-uname-r"
                        && provide.constraint().is_some_and(|(_, evr)| evr.to_string() == release)
                })
            })
        });
        if by_uname.is_some() {
            return by_uname;
        }

        installed.iter().find(|&id| {
            self.package(id).is_some_and(|p| {
                (p.name == "kernel" || p.name == "kernel-core")
                    && format!("{}-{}.{}", p.evr.version(), p.evr.release().unwrap_or_default(), p.arch)
                        == release
            })
        })
    }
}

use std::fs;
use std::path::Path;

use rsolv_evr::{Evr, Relation};
use serde::{Deserialize, Serialize};

use super::{Package, PackageId, PackageSet, Universe, DEFAULT_PRIORITY};
use crate::error::{GoalError, Result};

/// On-disk description of a universe, also embedded in solver testcases
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UniverseFile {
    #[serde(default)]
    pub repos: Vec<RepoSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub installonly: Vec<String>,

    #[serde(rename = "installonly-limit", default)]
    pub installonly_limit: u32,

    #[serde(rename = "kernel-release", default, skip_serializing_if = "Option::is_none")]
    pub kernel_release: Option<String>,

    /// `nevra@repo` keys of excluded packages
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSpec {
    pub name: String,

    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default)]
    pub installed: bool,

    #[serde(default)]
    pub packages: Vec<PackageSpec>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

fn default_arch() -> String {
    "noarch".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    pub evr: String,

    #[serde(default = "default_arch")]
    pub arch: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provides: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obsoletes: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommends: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

fn parse_relations(items: &[String]) -> Result<Vec<Relation>> {
    items
        .iter()
        .map(|s| Relation::parse(s).map_err(GoalError::from))
        .collect()
}

fn relation_strings(relations: &[Relation]) -> Vec<String> {
    relations.iter().map(|r| r.to_string()).collect()
}

impl PackageSpec {
    pub fn to_package(&self) -> Result<Package> {
        let mut package = Package::new(self.name.clone(), Evr::parse(&self.evr)?, self.arch.clone());
        package.vendor = self.vendor.clone();
        package.provides = parse_relations(&self.provides)?;
        package.requires = parse_relations(&self.requires)?;
        package.conflicts = parse_relations(&self.conflicts)?;
        package.obsoletes = parse_relations(&self.obsoletes)?;
        package.recommends = parse_relations(&self.recommends)?;
        package.files = self.files.clone();
        Ok(package)
    }

    pub fn from_package(package: &Package) -> Self {
        Self {
            name: package.name.clone(),
            evr: package.evr.to_string(),
            arch: package.arch.clone(),
            vendor: package.vendor.clone(),
            provides: relation_strings(&package.provides),
            requires: relation_strings(&package.requires),
            conflicts: relation_strings(&package.conflicts),
            obsoletes: relation_strings(&package.obsoletes),
            recommends: relation_strings(&package.recommends),
            files: package.files.clone(),
        }
    }
}

impl Universe {
    /// Build a universe from its JSON description
    pub fn from_json(json: &str) -> Result<Self> {
        let file: UniverseFile = serde_json::from_str(json)?;
        Self::from_spec(&file)
    }

    /// Load a universe from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| GoalError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }

    pub fn from_spec(file: &UniverseFile) -> Result<Self> {
        let mut universe = Universe::new();

        for repo_spec in &file.repos {
            let repo = if repo_spec.installed {
                universe.installed_repo()
            } else {
                universe.add_repo(repo_spec.name.clone(), repo_spec.priority)
            };
            for package in &repo_spec.packages {
                universe.add_package(repo, package.to_package()?);
            }
        }

        let mut excludes = PackageSet::new();
        for key in &file.excludes {
            let id = universe
                .find_key(key)
                .ok_or_else(|| GoalError::UnknownPackage(key.clone()))?;
            excludes.set(id);
        }
        universe.set_excludes(excludes);
        universe.set_installonly(file.installonly.clone(), file.installonly_limit);
        universe.set_kernel_release(file.kernel_release.clone());

        log::debug!(
            "Loaded universe with {} repositories and {} packages",
            universe.repos().len(),
            universe.len()
        );
        Ok(universe)
    }

    /// Describe this universe in its on-disk form
    pub fn to_spec(&self) -> UniverseFile {
        let repos = self
            .repos
            .iter()
            .enumerate()
            .map(|(repo_id, repo)| RepoSpec {
                name: repo.name.clone(),
                priority: repo.priority,
                installed: repo.installed,
                packages: self
                    .packages
                    .iter()
                    .filter(|p| p.repo == repo_id)
                    .map(PackageSpec::from_package)
                    .collect(),
            })
            .collect();

        let excludes = self
            .excludes
            .iter()
            .filter_map(|id: PackageId| self.package_key(id))
            .collect();

        UniverseFile {
            repos,
            installonly: self.installonly.clone(),
            installonly_limit: self.installonly_limit,
            kernel_release: self.kernel_release.clone(),
            excludes,
        }
    }
}

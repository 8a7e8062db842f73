use std::fmt;

use rsolv_evr::{Evr, EvrError, Operator, Relation};

use super::RepoId;

/// A package known to the universe, either installed or available from a repository.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub evr: Evr,
    pub arch: String,
    pub vendor: Option<String>,
    pub provides: Vec<Relation>,
    pub requires: Vec<Relation>,
    pub conflicts: Vec<Relation>,
    pub obsoletes: Vec<Relation>,
    pub recommends: Vec<Relation>,
    pub files: Vec<String>,
    pub(crate) repo: RepoId,
}

impl Package {
    pub fn new(name: impl Into<String>, evr: Evr, arch: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            evr,
            arch: arch.into(),
            vendor: None,
            provides: Vec::new(),
            requires: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            recommends: Vec::new(),
            files: Vec::new(),
            repo: 0,
        }
    }

    /// Create a package from an EVR string
    pub fn parse(name: impl Into<String>, evr: &str, arch: impl Into<String>) -> Result<Self, EvrError> {
        Ok(Self::new(name, Evr::parse(evr)?, arch))
    }

    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = Some(vendor.into());
        self
    }

    pub fn with_provides(mut self, relation: Relation) -> Self {
        self.provides.push(relation);
        self
    }

    pub fn with_requires(mut self, relation: Relation) -> Self {
        self.requires.push(relation);
        self
    }

    pub fn with_conflicts(mut self, relation: Relation) -> Self {
        self.conflicts.push(relation);
        self
    }

    pub fn with_obsoletes(mut self, relation: Relation) -> Self {
        self.obsoletes.push(relation);
        self
    }

    pub fn with_recommends(mut self, relation: Relation) -> Self {
        self.recommends.push(relation);
        self
    }

    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Repository the package was added to
    pub fn repo(&self) -> RepoId {
        self.repo
    }

    /// `name-[epoch:]version-release.arch`
    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.evr, self.arch)
    }

    /// The implicit `name = evr` provide every package carries
    pub fn self_provide(&self) -> Relation {
        Relation::with_constraint(self.name.clone(), Operator::Equal, self.evr.clone())
    }

    pub fn is_noarch(&self) -> bool {
        self.arch == "noarch"
    }

    /// Whether two packages of the same name occupy the same install slot
    pub fn arch_compatible(&self, other: &Package) -> bool {
        self.arch == other.arch || self.is_noarch() || other.is_noarch()
    }

    pub fn same_nevra(&self, other: &Package) -> bool {
        self.name == other.name
            && self.arch == other.arch
            && self.evr.epoch() == other.evr.epoch()
            && self.evr.version() == other.evr.version()
            && self.evr.release() == other.evr.release()
    }

    /// Whether an obsoletes relation of this package hits `other`.
    ///
    /// Obsoletes match package names, not provides.
    pub fn obsoletes_package(&self, other: &Package) -> bool {
        self.name != other.name
            && self
                .obsoletes
                .iter()
                .any(|o| o.name() == other.name && o.matches_evr(&other.evr))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nevra())
    }
}

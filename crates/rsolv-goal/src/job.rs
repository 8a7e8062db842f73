//! The job: the ordered instruction list handed to the solver.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use rsolv_evr::Relation;
use serde::{Deserialize, Serialize};

use crate::universe::{PackageId, PackageSet, Universe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobAction {
    Install,
    Erase,
    Update,
    DistUpgrade,
    Verify,
    AllowUninstall,
    UserInstalled,
    Multiversion,
}

impl JobAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Install => "install",
            JobAction::Erase => "erase",
            JobAction::Update => "update",
            JobAction::DistUpgrade => "distupgrade",
            JobAction::Verify => "verify",
            JobAction::AllowUninstall => "allowuninstall",
            JobAction::UserInstalled => "userinstalled",
            JobAction::Multiversion => "multiversion",
        }
    }
}

/// Modifier bits of a job entry
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct JobFlags(u32);

impl JobFlags {
    /// Entry may be dropped if it cannot be satisfied
    pub const WEAK: JobFlags = JobFlags(1 << 0);
    /// Erase leaves behind nothing the erased package pulled in
    pub const CLEANDEPS: JobFlags = JobFlags(1 << 1);
    /// Only the best candidate satisfies the entry
    pub const FORCEBEST: JobFlags = JobFlags(1 << 2);
    pub const SETEV: JobFlags = JobFlags(1 << 3);
    pub const SETEVR: JobFlags = JobFlags(1 << 4);
    pub const SETARCH: JobFlags = JobFlags(1 << 5);
    pub const SETREPO: JobFlags = JobFlags(1 << 6);

    const NAMES: [(JobFlags, &'static str); 7] = [
        (JobFlags::WEAK, "weak"),
        (JobFlags::CLEANDEPS, "cleandeps"),
        (JobFlags::FORCEBEST, "forcebest"),
        (JobFlags::SETEV, "setev"),
        (JobFlags::SETEVR, "setevr"),
        (JobFlags::SETARCH, "setarch"),
        (JobFlags::SETREPO, "setrepo"),
    ];

    pub const fn empty() -> Self {
        JobFlags(0)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: JobFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn remove(&mut self, other: JobFlags) {
        self.0 &= !other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES.iter().find(|(_, n)| *n == name).map(|(flag, _)| *flag)
    }
}

impl BitOr for JobFlags {
    type Output = JobFlags;

    fn bitor(self, rhs: JobFlags) -> JobFlags {
        JobFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for JobFlags {
    fn bitor_assign(&mut self, rhs: JobFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for JobFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JobFlags({})", self.names().join("|"))
    }
}

/// What a job entry applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobTarget {
    /// One specific package
    Solvable(PackageId),
    /// Any one of a set of packages
    OneOf(PackageSet),
    /// Packages of a name, optionally narrowed by EVR and arch
    Name {
        relation: Relation,
        arch: Option<String>,
    },
    /// Packages providing a relation, optionally narrowed by arch
    Provides {
        relation: Relation,
        arch: Option<String>,
    },
    /// Every package of a repository
    Repo(String),
    /// Every package
    All,
}

impl JobTarget {
    pub fn name(name: impl Into<String>) -> Self {
        JobTarget::Name {
            relation: Relation::new(name),
            arch: None,
        }
    }

    pub fn provides(relation: Relation) -> Self {
        JobTarget::Provides { relation, arch: None }
    }

    pub fn one(id: PackageId) -> Self {
        let mut set = PackageSet::new();
        set.set(id);
        JobTarget::OneOf(set)
    }

    /// Considered packages this target denotes, ascending
    pub fn resolve(&self, universe: &Universe) -> Vec<PackageId> {
        let arch_ok = |arch: &Option<String>, id: PackageId| match arch {
            Some(arch) => universe.package(id).is_some_and(|p| &p.arch == arch),
            None => true,
        };

        match self {
            JobTarget::Solvable(id) => {
                if universe.is_considered(*id) {
                    vec![*id]
                } else {
                    Vec::new()
                }
            }
            JobTarget::OneOf(set) => set.intersection(&universe.considered()).iter().collect(),
            JobTarget::Name { relation, arch } => universe
                .packages_by_name(relation.name())
                .into_iter()
                .filter(|&id| {
                    universe
                        .package(id)
                        .is_some_and(|p| relation.matches_evr(&p.evr))
                        && arch_ok(arch, id)
                })
                .collect(),
            JobTarget::Provides { relation, arch } => universe
                .what_provides(relation)
                .into_iter()
                .filter(|&id| arch_ok(arch, id))
                .collect(),
            JobTarget::Repo(name) => {
                let considered = universe.considered();
                universe
                    .iter()
                    .filter(|(id, _)| considered.has(*id))
                    .filter(|(id, _)| universe.package_repo(*id).is_some_and(|r| &r.name == name))
                    .map(|(id, _)| id)
                    .collect()
            }
            JobTarget::All => universe.considered().iter().collect(),
        }
    }

    /// Human-readable form used in problem descriptions
    pub fn describe(&self, universe: &Universe) -> String {
        let nevra = |id: PackageId| {
            universe
                .package(id)
                .map(|p| p.nevra())
                .unwrap_or_else(|| format!("#{}", id))
        };

        match self {
            JobTarget::Solvable(id) => nevra(*id),
            JobTarget::OneOf(set) => set.iter().map(nevra).collect::<Vec<_>>().join(", "),
            JobTarget::Name { relation, arch } | JobTarget::Provides { relation, arch } => match arch {
                Some(arch) => format!("{}.{}", relation, arch),
                None => relation.to_string(),
            },
            JobTarget::Repo(name) => format!("repository {}", name),
            JobTarget::All => "all packages".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEntry {
    pub action: JobAction,
    pub target: JobTarget,
    pub flags: JobFlags,
}

impl JobEntry {
    pub fn new(action: JobAction, target: JobTarget, flags: JobFlags) -> Self {
        Self { action, target, flags }
    }

    pub fn is_weak(&self) -> bool {
        self.flags.contains(JobFlags::WEAK)
    }
}

/// Ordered list of job entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    entries: Vec<JobEntry>,
}

impl Job {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: JobEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut JobEntry> {
        self.entries.iter_mut()
    }

    pub fn get(&self, index: usize) -> Option<&JobEntry> {
        self.entries.get(index)
    }

    /// Whether any entry already targets exactly this
    pub fn has_target(&self, target: &JobTarget) -> bool {
        self.entries.iter().any(|e| &e.target == target)
    }
}

impl Extend<JobEntry> for Job {
    fn extend<I: IntoIterator<Item = JobEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

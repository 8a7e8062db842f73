use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::universe::PackageId;

/// A literal in SAT terms - positive means "install", negative means "don't install"
pub type Literal = i32;

/// Types of rules generated from the job and the universe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RuleType {
    /// Install or erase request of the job
    Job,
    /// Install request whose target has no provider
    JobNothingProvides,
    /// Install request naming a package that does not exist
    JobUnknownPackage,
    /// Install request restricted to its best candidates
    Best,
    /// Installed package stays or is replaced by one of its updates
    Update,
    /// Installed package is synchronized to the repositories
    Distupgrade,
    /// If A is installed, then B|C|D must be installed
    PackageRequires,
    /// A requires something nobody provides
    PackageNothingProvides,
    /// A and B cannot both be installed
    PackageConflict,
    /// A conflicts with one of its own provides
    PackageSelfConflict,
    /// Two versions of one name cannot both be installed
    PackageSameName,
    /// A obsoletes B
    PackageObsoletes,
    /// Installed A obsoletes B
    PackageInstalledObsoletes,
}

/// Coarse grouping of rule types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleClass {
    Package,
    Update,
    Job,
    Distupgrade,
    Best,
}

impl RuleType {
    pub fn class(&self) -> RuleClass {
        match self {
            RuleType::Job | RuleType::JobNothingProvides | RuleType::JobUnknownPackage => RuleClass::Job,
            RuleType::Best => RuleClass::Best,
            RuleType::Update => RuleClass::Update,
            RuleType::Distupgrade => RuleClass::Distupgrade,
            RuleType::PackageRequires
            | RuleType::PackageNothingProvides
            | RuleType::PackageConflict
            | RuleType::PackageSelfConflict
            | RuleType::PackageSameName
            | RuleType::PackageObsoletes
            | RuleType::PackageInstalledObsoletes => RuleClass::Package,
        }
    }

    /// Order in which rules are dropped from a conflict set when minimizing it
    /// (lower = tried first)
    pub fn priority(&self) -> u8 {
        match self.class() {
            RuleClass::Package => 0,
            RuleClass::Update | RuleClass::Distupgrade => 1,
            RuleClass::Best => 2,
            RuleClass::Job => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::Job => "job",
            RuleType::JobNothingProvides => "job-nothing-provides",
            RuleType::JobUnknownPackage => "job-unknown-package",
            RuleType::Best => "best",
            RuleType::Update => "update",
            RuleType::Distupgrade => "distupgrade",
            RuleType::PackageRequires => "requires",
            RuleType::PackageNothingProvides => "nothing-provides",
            RuleType::PackageConflict => "conflict",
            RuleType::PackageSelfConflict => "self-conflict",
            RuleType::PackageSameName => "same-name",
            RuleType::PackageObsoletes => "obsoletes",
            RuleType::PackageInstalledObsoletes => "installed-obsoletes",
        }
    }
}

/// What a rule is about, in terms of packages and dependencies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    pub kind: RuleType,
    pub source: Option<PackageId>,
    pub target: Option<PackageId>,
    pub dep: Option<String>,
}

/// A SAT rule (clause).
///
/// Rules are disjunctions (OR) of literals. A rule is satisfied when
/// at least one of its literals is true.
///
/// - `[A]` - Package A must be installed (assertion)
/// - `[-A]` - Package A must not be installed
/// - `[-A, B, C]` - If A is installed, then B or C must be installed
/// - `[-A, -B]` - A and B cannot both be installed (conflict)
/// - `[]` - Never satisfiable (a request without candidates)
#[derive(Clone)]
pub struct Rule {
    literals: Vec<Literal>,
    rule_type: RuleType,
    id: u32,
    source: Option<PackageId>,
    target: Option<PackageId>,
    dep: Option<String>,
    /// Index of the job entry this rule came from
    job: Option<usize>,
    weak: bool,
    disabled: bool,
}

impl Rule {
    /// Create a new rule; repeated literals are dropped, order is kept
    pub fn new(literals: Vec<Literal>, rule_type: RuleType) -> Self {
        let mut unique = Vec::with_capacity(literals.len());
        for literal in literals {
            if !unique.contains(&literal) {
                unique.push(literal);
            }
        }

        Self {
            literals: unique,
            rule_type,
            id: 0,
            source: None,
            target: None,
            dep: None,
            job: None,
            weak: false,
            disabled: false,
        }
    }

    /// Create an assertion rule (single literal that must be true)
    pub fn assertion(literal: Literal, rule_type: RuleType) -> Self {
        Self::new(vec![literal], rule_type)
    }

    /// If source is installed, one of targets must be
    pub fn requires(source: PackageId, targets: Vec<PackageId>) -> Self {
        let mut literals = vec![-source];
        literals.extend(targets);
        Self::new(literals, RuleType::PackageRequires).with_source(source)
    }

    /// Source requires something nobody provides, so it cannot be installed
    pub fn nothing_provides(source: PackageId) -> Self {
        Self::assertion(-source, RuleType::PackageNothingProvides).with_source(source)
    }

    /// These two packages cannot both be installed
    pub fn conflict(source: PackageId, target: PackageId) -> Self {
        Self::new(vec![-source, -target], RuleType::PackageConflict)
            .with_source(source)
            .with_target(target)
    }

    pub fn self_conflict(source: PackageId) -> Self {
        Self::assertion(-source, RuleType::PackageSelfConflict).with_source(source)
    }

    /// Only one of two versions of a name can be installed
    pub fn same_name(source: PackageId, target: PackageId) -> Self {
        Self::new(vec![-source, -target], RuleType::PackageSameName)
            .with_source(source)
            .with_target(target)
    }

    pub fn obsoletes(source: PackageId, target: PackageId, source_installed: bool) -> Self {
        let rule_type = if source_installed {
            RuleType::PackageInstalledObsoletes
        } else {
            RuleType::PackageObsoletes
        };
        Self::new(vec![-source, -target], rule_type)
            .with_source(source)
            .with_target(target)
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn with_source(mut self, package: PackageId) -> Self {
        self.source = Some(package);
        self
    }

    pub fn with_target(mut self, package: PackageId) -> Self {
        self.target = Some(package);
        self
    }

    /// Set the dependency string used in problem descriptions
    pub fn with_dep(mut self, dep: impl Into<String>) -> Self {
        self.dep = Some(dep.into());
        self
    }

    pub fn with_job(mut self, index: usize) -> Self {
        self.job = Some(index);
        self
    }

    /// Mark the rule as droppable when it takes part in a conflict
    pub fn weak(mut self, weak: bool) -> Self {
        self.weak = weak;
        self
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule_type
    }

    pub fn class(&self) -> RuleClass {
        self.rule_type.class()
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn source(&self) -> Option<PackageId> {
        self.source
    }

    pub fn target(&self) -> Option<PackageId> {
        self.target
    }

    pub fn dep(&self) -> Option<&str> {
        self.dep.as_deref()
    }

    pub fn job(&self) -> Option<usize> {
        self.job
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    pub(crate) fn clear_weak(&mut self) {
        self.weak = false;
    }

    pub fn info(&self) -> RuleInfo {
        RuleInfo {
            kind: self.rule_type,
            source: self.source,
            target: self.target,
            dep: self.dep.clone(),
        }
    }

    /// Check if this is an assertion (single literal)
    pub fn is_assertion(&self) -> bool {
        self.literals.len() == 1
    }

    /// A rule containing both `p` and `-p` is always satisfied
    pub fn is_tautology(&self) -> bool {
        self.literals.iter().any(|&l| self.literals.contains(&-l))
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn disable(&mut self) {
        self.disabled = true;
    }

    pub fn enable(&mut self) {
        self.disabled = false;
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// Get a hash of this rule's literals for deduplication
    pub fn literal_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        // Sort literals for consistent hashing
        let mut sorted = self.literals.clone();
        sorted.sort();
        sorted.hash(&mut hasher);

        hasher.finish()
    }

    /// Check if two rules have the same literals (regardless of order)
    pub fn equals_literals(&self, other: &Rule) -> bool {
        if self.literals.len() != other.literals.len() {
            return false;
        }

        let mut a = self.literals.clone();
        let mut b = other.literals.clone();
        a.sort();
        b.sort();
        a == b
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule({:?}, {:?})", self.rule_type, self.literals)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let literals: Vec<String> = self
            .literals
            .iter()
            .map(|&l| if l > 0 { format!("+{}", l) } else { format!("{}", l) })
            .collect();

        write!(f, "({}) [{}]", self.rule_type.as_str(), literals.join(" | "))
    }
}

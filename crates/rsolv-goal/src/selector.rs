//! Selectors: reusable predicates that turn user package specs into job entries.

use std::fmt;

use crate::error::SelectorError;
use crate::job::Job;
use crate::translate;
use crate::universe::{PackageSet, Universe};

/// What a filter looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Name,
    /// Full `epoch:version-release`
    Evr,
    /// Version only; shares the EVR slot of a selector
    Version,
    Arch,
    Provides,
    File,
    Reponame,
}

impl FilterKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Name => "name",
            FilterKey::Evr => "evr",
            FilterKey::Version => "version",
            FilterKey::Arch => "arch",
            FilterKey::Provides => "provides",
            FilterKey::File => "file",
            FilterKey::Reponame => "reponame",
        }
    }

    /// Name, provides and file each pin down what a selector is about
    pub fn is_required(&self) -> bool {
        matches!(self, FilterKey::Name | FilterKey::Provides | FilterKey::File)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpKind {
    Eq,
    Glob,
    Substr,
}

/// Comparison applied by a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Comparison {
    pub kind: CmpKind,
    pub icase: bool,
}

impl Comparison {
    pub const EQ: Comparison = Comparison {
        kind: CmpKind::Eq,
        icase: false,
    };
    pub const GLOB: Comparison = Comparison {
        kind: CmpKind::Glob,
        icase: false,
    };
    pub const SUBSTR: Comparison = Comparison {
        kind: CmpKind::Substr,
        icase: false,
    };

    /// The same comparison, ignoring case
    pub fn icase(self) -> Self {
        Self { icase: true, ..self }
    }

    /// Test a single string value
    pub fn matches(&self, pattern: &str, value: &str) -> bool {
        match self.kind {
            CmpKind::Eq if self.icase => value.eq_ignore_ascii_case(pattern),
            CmpKind::Eq => value == pattern,
            CmpKind::Substr if self.icase => value.to_lowercase().contains(&pattern.to_lowercase()),
            CmpKind::Substr => value.contains(pattern),
            CmpKind::Glob => {
                let options = glob::MatchOptions {
                    case_sensitive: !self.icase,
                    require_literal_separator: false,
                    require_literal_leading_dot: false,
                };
                glob::Pattern::new(pattern).is_ok_and(|p| p.matches_with(value, options))
            }
        }
    }
}

/// A key, a comparison and the values it is matched against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    key: FilterKey,
    cmp: Comparison,
    matches: Vec<String>,
}

impl Filter {
    pub fn key(&self) -> FilterKey {
        self.key
    }

    pub fn cmp(&self) -> Comparison {
        self.cmp
    }

    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    /// The single match value, as every translation step requires
    pub(crate) fn single_match(&self) -> Result<&str, SelectorError> {
        match self.matches.as_slice() {
            [only] => Ok(only),
            _ => Err(SelectorError::MultipleMatchObjects),
        }
    }
}

/// A multi-dimensional package predicate.
///
/// At most one filter per dimension; name, provides, file and explicit packages are
/// mutually exclusive. Setting an occupied dimension again adds another match value to
/// its filter, which later fails translation with `MultipleMatchObjects`.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    name: Option<Filter>,
    evr: Option<Filter>,
    arch: Option<Filter>,
    provides: Option<Filter>,
    file: Option<Filter>,
    reponame: Option<Filter>,
    pkgs: Option<PackageSet>,
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter
    pub fn set(
        &mut self,
        key: FilterKey,
        cmp: Comparison,
        value: impl Into<String>,
    ) -> Result<&mut Self, SelectorError> {
        if key.is_required() {
            self.check_required_slot(key.as_str())?;
        }

        let slot = match key {
            FilterKey::Name => &mut self.name,
            FilterKey::Evr | FilterKey::Version => &mut self.evr,
            FilterKey::Arch => &mut self.arch,
            FilterKey::Provides => &mut self.provides,
            FilterKey::File => &mut self.file,
            FilterKey::Reponame => &mut self.reponame,
        };

        match slot {
            Some(filter) => filter.matches.push(value.into()),
            None => {
                *slot = Some(Filter {
                    key,
                    cmp,
                    matches: vec![value.into()],
                })
            }
        }
        Ok(self)
    }

    /// Restrict the selector to explicit packages
    pub fn set_pkgs(&mut self, pkgs: PackageSet) -> Result<&mut Self, SelectorError> {
        if self.pkgs.is_none() {
            self.check_required_slot("pkgs")?;
        }
        self.pkgs = Some(pkgs);
        Ok(self)
    }

    fn check_required_slot(&self, key: &str) -> Result<(), SelectorError> {
        let occupied = [
            ("name", self.name.is_some()),
            ("provides", self.provides.is_some()),
            ("file", self.file.is_some()),
            ("pkgs", self.pkgs.is_some()),
        ];
        match occupied.iter().find(|(other, present)| *present && *other != key) {
            Some((other, _)) => Err(SelectorError::ConflictingFilters {
                key: key.to_string(),
                other: other.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn name(&self) -> Option<&Filter> {
        self.name.as_ref()
    }

    pub fn evr(&self) -> Option<&Filter> {
        self.evr.as_ref()
    }

    pub fn arch(&self) -> Option<&Filter> {
        self.arch.as_ref()
    }

    pub fn provides(&self) -> Option<&Filter> {
        self.provides.as_ref()
    }

    pub fn file(&self) -> Option<&Filter> {
        self.file.as_ref()
    }

    pub fn reponame(&self) -> Option<&Filter> {
        self.reponame.as_ref()
    }

    pub fn pkgs(&self) -> Option<&PackageSet> {
        self.pkgs.as_ref()
    }

    pub fn has_required_filter(&self) -> bool {
        self.name.is_some() || self.provides.is_some() || self.file.is_some() || self.pkgs.is_some()
    }

    pub fn has_optional_filter(&self) -> bool {
        self.arch.is_some() || self.evr.is_some() || self.reponame.is_some()
    }

    /// Packages this selector denotes in `universe`
    pub fn matches(&self, universe: &Universe) -> Result<PackageSet, SelectorError> {
        let mut job = Job::new();
        translate::selector_to_job(universe, self, crate::job::JobAction::Install, Default::default(), &mut job)?;

        let mut result = PackageSet::new();
        for entry in job.iter() {
            result.extend(entry.target.resolve(universe));
        }
        Ok(result)
    }
}

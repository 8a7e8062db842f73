use std::fmt;

use super::rule::{RuleInfo, RuleType};
use super::rule_set::RuleSet;
use crate::universe::{PackageId, Universe};

/// A problem encountered during dependency resolution.
///
/// A problem is a minimal set of rules that cannot all hold at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Problem {
    rules: Vec<u32>,
}

impl Problem {
    pub fn new(rules: Vec<u32>) -> Self {
        Self { rules }
    }

    /// Ids of the rules involved, in rule order
    pub fn rules(&self) -> &[u32] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// One line per distinct rule description
    pub fn describe(&self, universe: &Universe, rules: &RuleSet) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        for info in self.rules.iter().filter_map(|&id| rules.get(id)).map(|r| r.info()) {
            let line = describe_rule_info(universe, &info);
            if !lines.contains(&line) {
                lines.push(line);
            }
        }
        lines
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.rules.iter().map(|id| format!("#{}", id)).collect();
        write!(f, "problem [{}]", ids.join(", "))
    }
}

fn nevra(universe: &Universe, id: Option<PackageId>) -> String {
    id.and_then(|id| universe.package(id))
        .map(|p| p.nevra())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Describe a rule info in human-readable form
pub fn describe_rule_info(universe: &Universe, info: &RuleInfo) -> String {
    let source = nevra(universe, info.source);
    let target = nevra(universe, info.target);
    let dep = info.dep.as_deref().unwrap_or("unknown");

    match info.kind {
        RuleType::Job => "conflicting requests".to_string(),
        RuleType::JobNothingProvides => format!("nothing provides requested {}", dep),
        RuleType::JobUnknownPackage => format!("package {} does not exist", dep),
        RuleType::Best if info.source.is_some() => {
            format!("cannot install the best update candidate for package {}", source)
        }
        RuleType::Best => "cannot install the best candidate for the job".to_string(),
        RuleType::Update => format!("problem with installed package {}", source),
        RuleType::Distupgrade => format!("{} does not belong to a distupgrade repository", source),
        RuleType::PackageNothingProvides => format!("nothing provides {} needed by {}", dep, source),
        RuleType::PackageRequires => format!(
            "package {} requires {}, but none of the providers can be installed",
            source, dep
        ),
        RuleType::PackageSelfConflict => {
            format!("package {} conflicts with {} provided by itself", source, dep)
        }
        RuleType::PackageConflict => {
            format!("package {} conflicts with {} provided by {}", source, dep, target)
        }
        RuleType::PackageSameName => format!("cannot install both {} and {}", source, target),
        RuleType::PackageObsoletes => {
            format!("package {} obsoletes {} provided by {}", source, dep, target)
        }
        RuleType::PackageInstalledObsoletes => {
            format!("installed package {} obsoletes {} provided by {}", source, dep, target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::rule::Rule;
    use crate::universe::{Package, DEFAULT_PRIORITY};

    fn universe() -> Universe {
        let mut universe = Universe::new();
        let repo = universe.add_repo("fedora", DEFAULT_PRIORITY);
        universe.add_package(repo, Package::parse("a", "1-1", "x86_64").unwrap());
        universe.add_package(repo, Package::parse("b", "2-1", "noarch").unwrap());
        universe
    }

    #[test]
    fn test_describe_package_rules() {
        let universe = universe();

        let requires = Rule::requires(1, vec![2]).with_dep("b >= 2").info();
        assert_eq!(
            describe_rule_info(&universe, &requires),
            "package a-1-1.x86_64 requires b >= 2, but none of the providers can be installed"
        );

        let conflict = Rule::conflict(1, 2).with_dep("b").info();
        assert_eq!(
            describe_rule_info(&universe, &conflict),
            "package a-1-1.x86_64 conflicts with b provided by b-2-1.noarch"
        );

        let same_name = Rule::same_name(1, 2).info();
        assert_eq!(
            describe_rule_info(&universe, &same_name),
            "cannot install both a-1-1.x86_64 and b-2-1.noarch"
        );

        let missing = Rule::nothing_provides(1).with_dep("libfoo").info();
        assert_eq!(
            describe_rule_info(&universe, &missing),
            "nothing provides libfoo needed by a-1-1.x86_64"
        );
    }

    #[test]
    fn test_describe_job_rules() {
        let universe = universe();

        let unknown = Rule::new(vec![], RuleType::JobUnknownPackage).with_dep("ghost").info();
        assert_eq!(describe_rule_info(&universe, &unknown), "package ghost does not exist");

        let best = Rule::new(vec![2], RuleType::Best).info();
        assert_eq!(
            describe_rule_info(&universe, &best),
            "cannot install the best candidate for the job"
        );

        let best_update = Rule::new(vec![2], RuleType::Best).with_source(1).info();
        assert_eq!(
            describe_rule_info(&universe, &best_update),
            "cannot install the best update candidate for package a-1-1.x86_64"
        );
    }

    #[test]
    fn test_problem_describe_dedups() {
        let universe = universe();
        let mut rules = RuleSet::new();
        let job = rules.add(Rule::assertion(1, RuleType::Job));
        let erase = rules.add(Rule::assertion(-1, RuleType::Job));
        let missing = rules.add(Rule::nothing_provides(1).with_dep("libfoo"));

        let problem = Problem::new(vec![job, erase, missing]);
        assert_eq!(
            problem.describe(&universe, &rules),
            vec![
                "conflicting requests".to_string(),
                "nothing provides libfoo needed by a-1-1.x86_64".to_string()
            ]
        );
        assert_eq!(problem.to_string(), "problem [#0, #1, #2]");
    }
}

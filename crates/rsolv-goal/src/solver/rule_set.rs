use std::collections::HashMap;

use super::rule::{Literal, Rule, RuleType};

/// Collection of rules in generation order.
///
/// - Deduplication on (type, literal content, originating job entry)
/// - Sequential ID assignment
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    rules_by_type: HashMap<RuleType, Vec<u32>>,
    rule_hashes: HashMap<(RuleType, u64, Option<usize>), u32>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule to the set, returning its ID.
    ///
    /// A duplicate returns the existing rule's ID. The existing rule stops being weak
    /// when the duplicate is not.
    pub fn add(&mut self, mut rule: Rule) -> u32 {
        let key = (rule.rule_type(), rule.literal_hash(), rule.job());
        if let Some(&existing_id) = self.rule_hashes.get(&key) {
            let weak = rule.is_weak();
            if let Some(existing) = self.rules.get_mut(existing_id as usize) {
                if existing.equals_literals(&rule) {
                    if !weak {
                        existing.clear_weak();
                    }
                    return existing_id;
                }
            }
        }

        let id = self.rules.len() as u32;
        rule.set_id(id);

        self.rules_by_type.entry(rule.rule_type()).or_default().push(id);
        self.rule_hashes.insert(key, id);
        self.rules.push(rule);

        id
    }

    pub fn get(&self, id: u32) -> Option<&Rule> {
        self.rules.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Rule> {
        self.rules.get_mut(id as usize)
    }

    pub fn rules_of_type(&self, rule_type: RuleType) -> impl Iterator<Item = &Rule> {
        self.rules_by_type
            .get(&rule_type)
            .into_iter()
            .flatten()
            .filter_map(move |&id| self.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Enabled rules, in ID order
    pub fn enabled(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| !r.is_disabled())
    }

    /// Get assertion rules (single literal rules)
    pub fn assertions(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().filter(|r| r.is_assertion())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn count_by_type(&self, rule_type: RuleType) -> usize {
        self.rules_by_type.get(&rule_type).map(|v| v.len()).unwrap_or(0)
    }

    /// Find rules containing a specific literal
    pub fn rules_containing(&self, literal: Literal) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.literals().contains(&literal))
            .collect()
    }

    pub fn disable(&mut self, id: u32) {
        if let Some(rule) = self.get_mut(id) {
            rule.disable();
        }
    }

    pub fn enable(&mut self, id: u32) {
        if let Some(rule) = self.get_mut(id) {
            rule.enable();
        }
    }

    pub fn stats(&self) -> RuleSetStats {
        let mut stats = RuleSetStats {
            total: self.rules.len(),
            ..Default::default()
        };

        for rule in &self.rules {
            match rule.rule_type() {
                RuleType::Job | RuleType::JobNothingProvides | RuleType::JobUnknownPackage => stats.job += 1,
                RuleType::Best => stats.best += 1,
                RuleType::Update => stats.update += 1,
                RuleType::Distupgrade => stats.distupgrade += 1,
                RuleType::PackageRequires | RuleType::PackageNothingProvides => stats.requires += 1,
                RuleType::PackageConflict | RuleType::PackageSelfConflict => stats.conflict += 1,
                RuleType::PackageSameName => stats.same_name += 1,
                RuleType::PackageObsoletes | RuleType::PackageInstalledObsoletes => stats.obsoletes += 1,
            }

            if rule.is_assertion() {
                stats.assertions += 1;
            }
        }

        stats
    }
}

/// Statistics about a rule set
#[derive(Debug, Default)]
pub struct RuleSetStats {
    pub total: usize,
    pub assertions: usize,
    pub job: usize,
    pub best: usize,
    pub update: usize,
    pub distupgrade: usize,
    pub requires: usize,
    pub conflict: usize,
    pub same_name: usize,
    pub obsoletes: usize,
}

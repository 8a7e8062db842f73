use super::rule::Literal;
use crate::universe::PackageId;

/// Why a literal was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// Forced by a rule that had no other way to be satisfied
    Unit(u32),
    /// Picked as one of the ways to satisfy a rule
    Branch(u32),
    /// Weak dependency of a newly installed package
    WeakDep,
    /// Installed package kept without a rule forcing it
    Keep,
    /// Erased after solving as an unused dependency of a clean-deps erase
    CleanDeps,
}

impl Reason {
    pub fn rule(&self) -> Option<u32> {
        match self {
            Reason::Unit(rule) | Reason::Branch(rule) => Some(*rule),
            _ => None,
        }
    }
}

/// Tracks decisions made during solving.
///
/// Uses a flat Vec indexed by PackageId for O(1) lookups.
/// The decision_map stores: 0 = undecided, >0 = installed at level N, <0 = not installed at level -N
#[derive(Debug, Clone, Default)]
pub struct Decisions {
    /// Index is PackageId, value encodes both decision and level+1
    decision_map: Vec<i32>,

    /// Queue of decisions in order made
    decision_queue: Vec<(Literal, Reason)>,

    level: u32,
}

impl Decisions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_package_id: usize) -> Self {
        Self {
            decision_map: vec![0; max_package_id + 1],
            decision_queue: Vec::with_capacity(max_package_id),
            level: 0,
        }
    }

    #[inline]
    fn ensure_capacity(&mut self, package_id: PackageId) {
        let id = package_id as usize;
        if id >= self.decision_map.len() {
            self.decision_map.resize(id + 1, 0);
        }
    }

    #[inline]
    fn raw(&self, literal: Literal) -> i32 {
        self.decision_map
            .get(literal.unsigned_abs() as usize)
            .copied()
            .unwrap_or(0)
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn increment_level(&mut self) {
        self.level += 1;
    }

    #[inline]
    pub fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    /// Make a decision at the current level
    ///
    /// Returns false if this conflicts with an existing decision
    pub fn decide(&mut self, literal: Literal, reason: Reason) -> bool {
        let package_id = literal.unsigned_abs() as PackageId;
        self.ensure_capacity(package_id);

        let existing = self.decision_map[package_id as usize];
        if existing != 0 {
            return (existing > 0) == (literal > 0);
        }

        // level+1 so that level 0 doesn't become 0 (which means undecided)
        let level_value = (self.level + 1) as i32;
        self.decision_map[package_id as usize] = if literal > 0 { level_value } else { -level_value };
        self.decision_queue.push((literal, reason));

        true
    }

    /// Replace an existing decision, keeping its level
    pub fn override_decision(&mut self, literal: Literal, reason: Reason) {
        let package_id = literal.unsigned_abs() as PackageId;
        self.ensure_capacity(package_id);

        let id = package_id as usize;
        let level_value = match self.decision_map[id] {
            0 => (self.level + 1) as i32,
            existing => existing.abs(),
        };
        self.decision_map[id] = if literal > 0 { level_value } else { -level_value };

        self.decision_queue.retain(|(l, _)| l.unsigned_abs() as PackageId != package_id);
        self.decision_queue.push((literal, reason));
    }

    /// Check if a literal is satisfied by current decisions
    #[inline]
    pub fn satisfied(&self, literal: Literal) -> bool {
        let decision = self.raw(literal);
        decision != 0 && (decision > 0) == (literal > 0)
    }

    /// Check if a literal conflicts with current decisions
    #[inline]
    pub fn conflict(&self, literal: Literal) -> bool {
        let decision = self.raw(literal);
        decision != 0 && (decision > 0) != (literal > 0)
    }

    /// None = undecided
    #[inline]
    pub fn value(&self, literal: Literal) -> Option<bool> {
        match self.raw(literal) {
            0 => None,
            decision => Some((decision > 0) == (literal > 0)),
        }
    }

    #[inline]
    pub fn decided(&self, package_id: PackageId) -> bool {
        self.raw(package_id) != 0
    }

    #[inline]
    pub fn undecided(&self, package_id: PackageId) -> bool {
        !self.decided(package_id)
    }

    #[inline]
    pub fn decided_install(&self, package_id: PackageId) -> bool {
        self.raw(package_id) > 0
    }

    #[inline]
    pub fn decided_remove(&self, package_id: PackageId) -> bool {
        self.raw(package_id) < 0
    }

    pub fn decision_level(&self, literal: Literal) -> Option<u32> {
        match self.raw(literal) {
            0 => None,
            decision => Some(decision.unsigned_abs() - 1),
        }
    }

    /// Signed level: > 0 installed, < 0 not installed, 0 undecided
    pub fn signed_level(&self, package_id: PackageId) -> i32 {
        self.raw(package_id)
    }

    pub fn decision_reason(&self, literal: Literal) -> Option<Reason> {
        let package_id = literal.unsigned_abs() as PackageId;
        self.decision_queue
            .iter()
            .find(|(lit, _)| lit.unsigned_abs() as PackageId == package_id)
            .map(|&(_, reason)| reason)
    }

    /// Revert all decisions at levels > target_level
    pub fn revert_to_level(&mut self, target_level: u32) {
        let target = (target_level + 1) as i32;

        for decision in &mut self.decision_map {
            if *decision != 0 && decision.abs() > target {
                *decision = 0;
            }
        }

        let decision_map = &self.decision_map;
        self.decision_queue.retain(|(literal, _)| {
            let id = literal.unsigned_abs() as usize;
            id < decision_map.len() && decision_map[id] != 0
        });

        self.level = target_level;
    }

    /// Packages decided to be installed
    pub fn installed_packages(&self) -> impl Iterator<Item = PackageId> + '_ {
        self.decision_map
            .iter()
            .enumerate()
            .filter(|(_, &d)| d > 0)
            .map(|(id, _)| id as PackageId)
    }

    pub fn queue(&self) -> &[(Literal, Reason)] {
        &self.decision_queue
    }

    pub fn len(&self) -> usize {
        self.decision_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decision_queue.is_empty()
    }

    pub fn reset(&mut self) {
        self.decision_map.fill(0);
        self.decision_queue.clear();
        self.level = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decisions_decide() {
        let mut decisions = Decisions::new();

        assert!(decisions.decide(1, Reason::Unit(0)));
        assert!(decisions.satisfied(1));
        assert!(!decisions.satisfied(-1));
        assert!(decisions.decided_install(1));

        assert!(decisions.decide(-2, Reason::Unit(1)));
        assert!(decisions.satisfied(-2));
        assert!(decisions.decided_remove(2));
        assert_eq!(decisions.value(2), Some(false));
        assert_eq!(decisions.value(-2), Some(true));
        assert_eq!(decisions.value(3), None);
    }

    #[test]
    fn test_decisions_conflict() {
        let mut decisions = Decisions::new();
        decisions.decide(1, Reason::Keep);

        assert!(!decisions.decide(-1, Reason::Keep));
        assert!(decisions.decide(1, Reason::Keep));
        assert!(decisions.conflict(-1));
        assert!(!decisions.conflict(1));
    }

    #[test]
    fn test_decisions_levels_and_revert() {
        let mut decisions = Decisions::new();

        decisions.increment_level();
        decisions.decide(1, Reason::Unit(0));
        decisions.increment_level();
        decisions.decide(2, Reason::Branch(3));
        decisions.increment_level();
        decisions.decide(-3, Reason::Keep);

        assert_eq!(decisions.decision_level(2), Some(2));
        assert_eq!(decisions.signed_level(3), -4);

        decisions.revert_to_level(1);

        assert!(decisions.decided(1));
        assert!(!decisions.decided(2));
        assert!(!decisions.decided(3));
        assert_eq!(decisions.level(), 1);
        assert_eq!(decisions.len(), 1);
    }

    #[test]
    fn test_decisions_reason() {
        let mut decisions = Decisions::new();
        decisions.decide(1, Reason::Unit(42));
        decisions.decide(2, Reason::WeakDep);

        assert_eq!(decisions.decision_reason(1), Some(Reason::Unit(42)));
        assert_eq!(decisions.decision_reason(-1).and_then(|r| r.rule()), Some(42));
        assert_eq!(decisions.decision_reason(2), Some(Reason::WeakDep));
        assert_eq!(decisions.decision_reason(3), None);
    }

    #[test]
    fn test_decisions_override() {
        let mut decisions = Decisions::new();
        decisions.increment_level();
        decisions.decide(5, Reason::Keep);

        decisions.override_decision(-5, Reason::CleanDeps);

        assert!(decisions.decided_remove(5));
        assert_eq!(decisions.decision_level(5), Some(1));
        assert_eq!(decisions.decision_reason(5), Some(Reason::CleanDeps));
        assert_eq!(decisions.len(), 1);
    }

    #[test]
    fn test_decisions_installed_packages() {
        let mut decisions = Decisions::new();
        decisions.decide(1, Reason::Keep);
        decisions.decide(-2, Reason::Keep);
        decisions.decide(3, Reason::Keep);

        let installed: Vec<_> = decisions.installed_packages().collect();
        assert_eq!(installed, vec![1, 3]);
    }
}

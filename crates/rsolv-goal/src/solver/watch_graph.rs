use super::decisions::Decisions;
use super::rule::{Literal, Rule};
use super::rule_set::RuleSet;

/// Two-watched literals graph for unit propagation.
///
/// Each enabled non-assertion rule watches exactly 2 of its literals.
/// When a watched literal becomes false, we try to find another
/// literal to watch. Watches never need restoring on backtrack.
#[derive(Debug, Default)]
pub struct WatchGraph {
    /// Literal index -> ids of rules watching it
    watches: Vec<Vec<u32>>,
    /// Rule id -> its two watched literals
    watched: Vec<Option<[Literal; 2]>>,
}

/// Outcome of propagating one decided literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagateResult {
    /// Literals that must now be decided, with the rule forcing each
    Units(Vec<(Literal, u32)>),
    /// Every literal of this rule is false
    Conflict(u32),
}

impl WatchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn literal_to_index(literal: Literal) -> usize {
        let abs = literal.unsigned_abs() as usize;
        if literal > 0 {
            abs * 2
        } else {
            abs * 2 + 1
        }
    }

    fn get_watches_mut(&mut self, literal: Literal) -> &mut Vec<u32> {
        let idx = Self::literal_to_index(literal);
        if idx >= self.watches.len() {
            self.watches.resize(idx + 1, Vec::new());
        }
        &mut self.watches[idx]
    }

    /// Build the watch graph from the enabled rules of a rule set
    pub fn from_rules(rules: &RuleSet) -> Self {
        let mut graph = Self::new();
        graph.watched.resize(rules.len(), None);

        for rule in rules.enabled() {
            graph.add_rule(rule);
        }

        graph
    }

    pub fn add_rule(&mut self, rule: &Rule) {
        let literals = rule.literals();
        if literals.len() < 2 {
            return; // Assertions don't need watches
        }

        let rule_id = rule.id();
        let pair = [literals[0], literals[1]];
        if rule_id as usize >= self.watched.len() {
            self.watched.resize(rule_id as usize + 1, None);
        }
        self.watched[rule_id as usize] = Some(pair);

        self.get_watches_mut(pair[0]).push(rule_id);
        self.get_watches_mut(pair[1]).push(rule_id);
    }

    /// Rules watching a literal
    pub fn get_watches(&self, literal: Literal) -> &[u32] {
        self.watches
            .get(Self::literal_to_index(literal))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Propagate a literal that has just been decided true.
    ///
    /// Rules watching its negation either move that watch to a literal that is not
    /// false, turn unit on their other watch, or are in conflict.
    pub fn propagate(&mut self, literal: Literal, rules: &RuleSet, decisions: &Decisions) -> PropagateResult {
        let false_literal = -literal;
        let idx = Self::literal_to_index(false_literal);
        if idx >= self.watches.len() {
            return PropagateResult::Units(Vec::new());
        }

        let watching = std::mem::take(&mut self.watches[idx]);
        let mut keep = Vec::with_capacity(watching.len());
        let mut units = Vec::new();
        let mut conflict = None;

        for rule_id in watching {
            if conflict.is_some() {
                keep.push(rule_id);
                continue;
            }

            let (Some(rule), Some(Some(pair))) = (rules.get(rule_id), self.watched.get(rule_id as usize).copied())
            else {
                continue;
            };

            let other = if pair[0] == false_literal { pair[1] } else { pair[0] };
            if decisions.satisfied(other) {
                keep.push(rule_id);
                continue;
            }

            let replacement = rule
                .literals()
                .iter()
                .copied()
                .find(|&l| l != pair[0] && l != pair[1] && !decisions.conflict(l));

            match replacement {
                Some(replacement) => {
                    self.watched[rule_id as usize] = Some([other, replacement]);
                    self.get_watches_mut(replacement).push(rule_id);
                }
                None => {
                    keep.push(rule_id);
                    if decisions.conflict(other) {
                        conflict = Some(rule_id);
                    } else {
                        units.push((other, rule_id));
                    }
                }
            }
        }

        self.watches[idx] = keep;

        match conflict {
            Some(rule_id) => PropagateResult::Conflict(rule_id),
            None => PropagateResult::Units(units),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::decisions::Reason;
    use crate::solver::rule::RuleType;

    #[test]
    fn test_watch_graph_watches_first_two_literals() {
        let mut rules = RuleSet::new();
        rules.add(Rule::requires(1, vec![2, 3]));
        rules.add(Rule::assertion(4, RuleType::Job));

        let graph = WatchGraph::from_rules(&rules);

        assert_eq!(graph.get_watches(-1), &[0]);
        assert_eq!(graph.get_watches(2), &[0]);
        assert!(graph.get_watches(3).is_empty());
        assert!(graph.get_watches(4).is_empty());
    }

    #[test]
    fn test_watch_moves_to_undecided_literal() {
        let mut rules = RuleSet::new();
        rules.add(Rule::requires(1, vec![2, 3]));
        let mut graph = WatchGraph::from_rules(&rules);

        let mut decisions = Decisions::new();
        decisions.decide(-2, Reason::Keep);

        assert_eq!(graph.propagate(-2, &rules, &decisions), PropagateResult::Units(vec![]));
        assert!(graph.get_watches(2).is_empty());
        assert_eq!(graph.get_watches(3), &[0]);
    }

    #[test]
    fn test_unit_propagation() {
        let mut rules = RuleSet::new();
        rules.add(Rule::requires(1, vec![2]));
        let mut graph = WatchGraph::from_rules(&rules);

        let mut decisions = Decisions::new();
        decisions.decide(1, Reason::Keep);

        assert_eq!(
            graph.propagate(1, &rules, &decisions),
            PropagateResult::Units(vec![(2, 0)])
        );
    }

    #[test]
    fn test_conflict_detection() {
        let mut rules = RuleSet::new();
        rules.add(Rule::conflict(1, 2));
        let mut graph = WatchGraph::from_rules(&rules);

        let mut decisions = Decisions::new();
        decisions.decide(1, Reason::Keep);
        decisions.decide(2, Reason::Keep);

        assert_eq!(graph.propagate(2, &rules, &decisions), PropagateResult::Conflict(0));
    }

    #[test]
    fn test_disabled_rules_are_not_watched() {
        let mut rules = RuleSet::new();
        let id = rules.add(Rule::conflict(1, 2));
        rules.disable(id);

        let graph = WatchGraph::from_rules(&rules);
        assert!(graph.get_watches(-1).is_empty());
    }
}

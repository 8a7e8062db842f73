use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Request kinds a goal has accumulated, and switches for `run`
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GoalActions(u32);

impl GoalActions {
    pub const INSTALL: GoalActions = GoalActions(1 << 0);
    pub const ERASE: GoalActions = GoalActions(1 << 1);
    pub const UPGRADE: GoalActions = GoalActions(1 << 2);
    pub const UPGRADE_ALL: GoalActions = GoalActions(1 << 3);
    pub const DISTUPGRADE: GoalActions = GoalActions(1 << 4);
    pub const DISTUPGRADE_ALL: GoalActions = GoalActions(1 << 5);
    pub const DOWNGRADE: GoalActions = GoalActions(1 << 6);
    /// Installed packages may be replaced by lower versions
    pub const ALLOW_DOWNGRADE: GoalActions = GoalActions(1 << 7);
    /// Every job entry must be satisfied by its best candidate
    pub const FORCE_BEST: GoalActions = GoalActions(1 << 8);
    pub const VERIFY: GoalActions = GoalActions(1 << 9);
    /// Drop optional requests instead of honoring them
    pub const IGNORE_WEAK: GoalActions = GoalActions(1 << 10);
    /// Do not pull in recommended packages
    pub const IGNORE_WEAK_DEPS: GoalActions = GoalActions(1 << 11);
    /// Any non-protected installed package may be removed
    pub const ALLOW_UNINSTALL: GoalActions = GoalActions(1 << 12);

    const NAMES: [(GoalActions, &'static str); 13] = [
        (GoalActions::INSTALL, "install"),
        (GoalActions::ERASE, "erase"),
        (GoalActions::UPGRADE, "upgrade"),
        (GoalActions::UPGRADE_ALL, "upgrade-all"),
        (GoalActions::DISTUPGRADE, "distupgrade"),
        (GoalActions::DISTUPGRADE_ALL, "distupgrade-all"),
        (GoalActions::DOWNGRADE, "downgrade"),
        (GoalActions::ALLOW_DOWNGRADE, "allow-downgrade"),
        (GoalActions::FORCE_BEST, "force-best"),
        (GoalActions::VERIFY, "verify"),
        (GoalActions::IGNORE_WEAK, "ignore-weak"),
        (GoalActions::IGNORE_WEAK_DEPS, "ignore-weak-deps"),
        (GoalActions::ALLOW_UNINSTALL, "allow-uninstall"),
    ];

    pub const fn empty() -> Self {
        GoalActions(0)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: GoalActions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether any of the bits of `other` are set
    pub fn intersects(&self, other: GoalActions) -> bool {
        self.0 & other.0 != 0
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

impl BitOr for GoalActions {
    type Output = GoalActions;

    fn bitor(self, rhs: GoalActions) -> GoalActions {
        GoalActions(self.0 | rhs.0)
    }
}

impl BitOrAssign for GoalActions {
    fn bitor_assign(&mut self, rhs: GoalActions) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for GoalActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GoalActions({})", self.names().join("|"))
    }
}

/// Why a package is part of the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Reason {
    /// Requested by the user
    User,
    /// Pulled in as a dependency
    Dep,
    /// Removed as an unused dependency
    Clean,
    /// Pulled in as a weak dependency
    WeakDep,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::User => "user",
            Reason::Dep => "dependency",
            Reason::Clean => "clean",
            Reason::WeakDep => "weak-dependency",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which packages a conflict or broken-dependency listing reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PackageState {
    /// Available packages, minus those identical to an installed one
    Available,
    Installed,
    #[default]
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions() {
        let mut actions = GoalActions::INSTALL | GoalActions::ALLOW_DOWNGRADE;
        actions |= GoalActions::FORCE_BEST;

        assert!(actions.contains(GoalActions::INSTALL | GoalActions::FORCE_BEST));
        assert!(!actions.contains(GoalActions::INSTALL | GoalActions::ERASE));
        assert!(actions.intersects(GoalActions::ERASE | GoalActions::INSTALL));
        assert_eq!(actions.names(), vec!["install", "allow-downgrade", "force-best"]);
        assert_eq!(GoalActions::from_name("allow-uninstall"), Some(GoalActions::ALLOW_UNINSTALL));
        assert_eq!(GoalActions::from_name("bogus"), None);
    }

    #[test]
    fn test_reason_display() {
        assert_eq!(Reason::WeakDep.to_string(), "weak-dependency");
        assert_eq!(serde_json::to_string(&Reason::WeakDep).unwrap(), "\"weak-dep\"");
    }
}

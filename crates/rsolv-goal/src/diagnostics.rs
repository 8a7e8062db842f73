//! Diagnostic events emitted while a goal resolves.
//!
//! A [`Goal`](crate::goal::Goal) reports what it does through the sink it was built
//! with. [`LogSink`] forwards everything to the `log` facade.

use std::cell::RefCell;
use std::fmt;
use std::path::PathBuf;

/// Kind of a goal event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Resolving,
    Resolved,
    Unsolvable,
    InstallonlyLimited,
    ProtectedRemoval,
    DebugDataWritten,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Resolving => "resolving",
            EventType::Resolved => "resolved",
            EventType::Unsolvable => "unsolvable",
            EventType::InstallonlyLimited => "installonly-limited",
            EventType::ProtectedRemoval => "protected-removal",
            EventType::DebugDataWritten => "debugdata-written",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalEvent {
    /// A solve is about to start with this many job entries
    Resolving { entries: usize },
    /// The transaction has this many steps
    Resolved { steps: usize },
    Unsolvable { problems: usize },
    /// Install-only limiting requested a second solve
    InstallonlyLimited { erasures: usize },
    /// The transaction would remove these protected packages
    ProtectedRemoval { packages: Vec<String> },
    DebugDataWritten { path: PathBuf },
}

impl GoalEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            GoalEvent::Resolving { .. } => EventType::Resolving,
            GoalEvent::Resolved { .. } => EventType::Resolved,
            GoalEvent::Unsolvable { .. } => EventType::Unsolvable,
            GoalEvent::InstallonlyLimited { .. } => EventType::InstallonlyLimited,
            GoalEvent::ProtectedRemoval { .. } => EventType::ProtectedRemoval,
            GoalEvent::DebugDataWritten { .. } => EventType::DebugDataWritten,
        }
    }
}

impl fmt::Display for GoalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalEvent::Resolving { entries } => write!(f, "resolving job with {} entries", entries),
            GoalEvent::Resolved { steps } => write!(f, "resolved into {} transaction steps", steps),
            GoalEvent::Unsolvable { problems } => write!(f, "no solution, {} problem(s)", problems),
            GoalEvent::InstallonlyLimited { erasures } => {
                write!(f, "install-only limit exceeded, re-resolving with {} erasures", erasures)
            }
            GoalEvent::ProtectedRemoval { packages } => {
                write!(f, "transaction would remove protected packages: {}", packages.join(", "))
            }
            GoalEvent::DebugDataWritten { path } => write!(f, "debug data written to {}", path.display()),
        }
    }
}

/// Receiver of goal events
pub trait DiagnosticSink {
    fn event(&self, event: &GoalEvent);
}

/// Forwards events to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn event(&self, event: &GoalEvent) {
        match event.event_type() {
            EventType::Resolving | EventType::DebugDataWritten => log::debug!("{}", event),
            EventType::Resolved | EventType::InstallonlyLimited => log::info!("{}", event),
            EventType::Unsolvable | EventType::ProtectedRemoval => log::warn!("{}", event),
        }
    }
}

/// Keeps every event, for callers that inspect them afterwards
#[derive(Debug, Default)]
pub struct MemorySink {
    events: RefCell<Vec<GoalEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GoalEvent> {
        self.events.borrow().clone()
    }

    pub fn has(&self, event_type: EventType) -> bool {
        self.events.borrow().iter().any(|e| e.event_type() == event_type)
    }
}

impl DiagnosticSink for MemorySink {
    fn event(&self, event: &GoalEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

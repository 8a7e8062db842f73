use rsolv_evr::EvrError;
use thiserror::Error;

/// Why a selector could not be turned into job entries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Ill-formed Selector. No name or provides or file in the selector.")]
    MissingRequiredFilter,

    #[error("Ill-formed Selector, presence of multiple match objects in the filter")]
    MultipleMatchObjects,

    #[error("Ill-formed Selector used for the operation, incorrect comparison type")]
    IncorrectComparisonType,

    #[error("Ill-formed Selector, no package matches {0}")]
    NoMatch(String),

    #[error("Ill-formed Selector, {key} cannot be combined with {other}")]
    ConflictingFilters { key: String, other: String },

    #[error("Ill-formed Selector, invalid relation: {0}")]
    InvalidRelation(#[from] EvrError),
}

#[derive(Error, Debug)]
pub enum GoalError {
    #[error(transparent)]
    IllFormedSelector(#[from] SelectorError),

    #[error("no solution possible")]
    NoSolutionPossible,

    #[error("no solution, cannot remove protected package")]
    RemovalOfProtectedPackage,

    #[error("{0}")]
    Internal(String),

    // Debug data errors
    #[error("{message}")]
    DebugData {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    // Universe errors
    #[error("Unknown package: {0}")]
    UnknownPackage(String),

    #[error("Invalid dependency: {0}")]
    Evr(#[from] EvrError),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // JSON/parsing errors
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GoalError>;

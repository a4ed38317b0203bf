//! Error types surfaced by the engine. Nothing here is retried or logged away;
//! every failure is returned to the caller.

use crate::data::UpgradeKey;
use crate::document::{DocPath, Scalar};
use thiserror::Error;

/// Malformed wheel document. Always aborts the whole load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: {violation}")]
pub struct SchemaError {
    pub location: DocPath,
    pub violation: SchemaViolation,
}

impl SchemaError {
    #[must_use]
    pub const fn new(location: DocPath, violation: SchemaViolation) -> Self {
        Self {
            location,
            violation,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("wheel file must begin with a wheel")]
    RootNotWheel,
    #[error("expected a map, found a {found}")]
    NotAMap { found: &'static str },
    #[error("unexpected key '{key}', only allows {allowed:?}")]
    UnexpectedKey {
        key: String,
        allowed: &'static [&'static str],
    },
    #[error("unexpected value for '{key}': found a {found}, must be {expected}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing required key '{key}'")]
    MissingKey { key: &'static str },
    #[error("wheel has no name")]
    MissingName,
    #[error("wheel lists game '{declared}' but is already downstream of game '{inherited}'")]
    GameConflict { declared: String, inherited: String },
    #[error("wheel choice has both wheel and upgrade")]
    AmbiguousChoice,
    #[error("wheel choice contains neither wheel nor upgrade")]
    EmptyChoice,
    #[error("upgrade does not belong to a listed game")]
    NoGame,
    #[error("manual upgrade must not declare a path")]
    ManualWithPath,
    #[error("progression '{0}' is not a recognized macro")]
    UnknownMacro(String),
    #[error("progression lists both atMost and limit, but only one is allowed")]
    AtMostWithLimit,
    #[error("progression listed more values than its limit of {limit} allows")]
    LimitValuesMismatch { limit: i64 },
    #[error("progression has neither `values` nor `increment`; at least one must be given")]
    NoValuesOrIncrement,
    #[error("{key} must be positive (got {value})")]
    NotPositive { key: &'static str, value: i64 },
    #[error("increment must be non-zero when combined with atMost")]
    ZeroIncrementWithAtMost,
    #[error("atMost needs a numeric last value, found a {found}")]
    NonNumericAtMostBase { found: &'static str },
    #[error("upgrade key '{0}' is used by more than one choice")]
    DuplicateUpgrade(String),
}

/// Failures of the progression value calculator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgressionError {
    #[error("upgrade {upgrade} was requested with count {count}; counts start at 1")]
    NonPositiveCount { upgrade: UpgradeKey, count: u32 },
    #[error("upgrade {upgrade} exceeded its limit of {limit} (count {count})")]
    LimitExceeded {
        upgrade: UpgradeKey,
        limit: f64,
        count: u32,
    },
    #[error("upgrade {upgrade} has neither values nor increment")]
    MissingValues { upgrade: UpgradeKey },
    #[error("upgrade {upgrade} has no increment to extend past its {len} values")]
    MissingIncrement { upgrade: UpgradeKey, len: usize },
    #[error("upgrade {upgrade} cannot increment non-numeric value {value}")]
    NonNumericBase { upgrade: UpgradeKey, value: Scalar },
    #[error("upgrade {upgrade} value overflowed at count {count}")]
    Overflow { upgrade: UpgradeKey, count: u32 },
}

/// Spins that the wheel can no longer satisfy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapacityError {
    #[error("wheel {wheel} has a limit of {capacity} and cannot spin {requested} times")]
    InsufficientCapacity {
        wheel: String,
        capacity: f64,
        requested: u32,
    },
    #[error("tried to spin wheel {wheel} with no valid choices")]
    Exhausted { wheel: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApplyError {
    #[error("results reference upgrade {0}, which is not on the wheel")]
    UnknownUpgrade(UpgradeKey),
    #[error(transparent)]
    Progression(#[from] ProgressionError),
}

/// Problems restoring previously saved results against a wheel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResultsError {
    #[error("results were produced by wheel {found:016x}, loaded wheel is {expected:016x}")]
    FingerprintMismatch { expected: u64, found: u64 },
    #[error("results reference upgrade {0}, which is not on the wheel")]
    UnknownUpgrade(UpgradeKey),
}

/// Failure to produce a wheel from a [`crate::DocumentLoader`].
#[derive(Debug, Error)]
pub enum LoadError<E>
where
    E: std::error::Error + 'static,
{
    #[error("failed to load wheel document")]
    Source(#[source] E),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

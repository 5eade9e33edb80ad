//! Error taxonomy for readiness probing.
//!
//! Probe operations return [`std::io::Result`]. Errors raised by a strategy
//! are sorted into a [`FailureClass`], which decides whether the prober
//! retries, falls back to the next strategy, or surfaces the error unchanged.

use crate::strategy::Strategy;
use std::io;
use std::os::fd::RawFd;
use thiserror::Error;

/// A descriptor does not fit in the fixed-size set of a multiplexing call.
///
/// Carried as the payload of an [`io::Error`] of kind
/// [`io::ErrorKind::InvalidInput`], so it travels through the same
/// `io::Result` paths as every other platform error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("descriptor {fd} is out of range for a set of capacity {limit}")]
pub struct CapacityExceeded {
    /// The first offending descriptor.
    pub fd: RawFd,
    /// The capacity that was exceeded.
    pub limit: usize,
}

impl From<CapacityExceeded> for io::Error {
    fn from(err: CapacityExceeded) -> Self {
        Self::new(io::ErrorKind::InvalidInput, err)
    }
}

/// Returns the capacity payload if `err` was produced by a capacity check.
#[must_use]
pub fn capacity_exceeded(err: &io::Error) -> Option<&CapacityExceeded> {
    err.get_ref()
        .and_then(|inner| inner.downcast_ref::<CapacityExceeded>())
}

/// How a strategy failure is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// The strategy cannot be used for this call; try the next one.
    StrategyUnavailable,
    /// The descriptor set is too large for the strategy; try the next one.
    CapacityExceeded,
    /// A signal interrupted the wait; retry the same strategy.
    Interrupted,
    /// Anything else; surfaced to the caller unchanged.
    Fatal,
}

impl FailureClass {
    /// Classifies an error raised by `strategy`.
    ///
    /// Only permission errors from [`Strategy::Notify`] and capacity errors
    /// from [`Strategy::Select`] fall through. The same error kinds from any
    /// other strategy are fatal.
    #[must_use]
    pub fn classify(strategy: Strategy, err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            return Self::Interrupted;
        }
        match strategy {
            Strategy::Notify if err.kind() == io::ErrorKind::PermissionDenied => {
                Self::StrategyUnavailable
            }
            Strategy::Select if capacity_exceeded(err).is_some() => Self::CapacityExceeded,
            _ => Self::Fatal,
        }
    }

    /// Returns true if the prober should move on to the next strategy.
    #[must_use]
    pub const fn falls_through(self) -> bool {
        matches!(self, Self::StrategyUnavailable | Self::CapacityExceeded)
    }

    /// Returns the class name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StrategyUnavailable => "strategy_unavailable",
            Self::CapacityExceeded => "capacity_exceeded",
            Self::Interrupted => "interrupted",
            Self::Fatal => "fatal",
        }
    }
}

/// Errors produced while building or loading a [`ProbeConfig`].
///
/// [`ProbeConfig`]: crate::config::ProbeConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A strategy name did not match any known strategy.
    #[error("unknown readiness strategy: {0:?}")]
    UnknownStrategy(String),
    /// The strategy chain has no entries.
    #[error("strategy chain is empty")]
    EmptyChain,
    /// A strategy appears more than once in the chain.
    #[error("strategy `{0}` listed more than once")]
    DuplicateStrategy(Strategy),
    /// The select capacity is zero or above the platform limit.
    #[error("select capacity {value} outside 1..={max}")]
    SelectCapacity {
        /// The rejected value.
        value: usize,
        /// The platform limit.
        max: usize,
    },
    /// An environment variable held an unparsable value.
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue {
        /// The variable name.
        key: &'static str,
        /// The raw value.
        value: String,
    },
    /// The TOML document could not be parsed.
    #[cfg(feature = "config-file")]
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

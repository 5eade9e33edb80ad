//! Platform polling strategies.
//!
//! A [`Backend`] performs one readiness wait over a set of raw descriptors
//! using a single OS mechanism. The prober walks a chain of backends and
//! moves to the next one when a backend reports a fall-through failure (see
//! [`FailureClass`](crate::error::FailureClass)).
//!
//! | Strategy | Mechanism | Fall-through condition |
//! |----------|-----------|------------------------|
//! | [`Strategy::Notify`] | epoll / kqueue / event ports | `PermissionDenied` |
//! | [`Strategy::Select`] | `select(2)` | descriptor above capacity |
//! | [`Strategy::Poll`]   | `poll(2)` | none |
//!
//! Backends report a signal interruption as an `Interrupted` error from
//! [`Backend::wait_once`]. Retrying is the job of [`retry_interrupted`].

#[allow(unsafe_code)]
mod notify;
#[allow(unsafe_code)]
mod poll;
#[allow(unsafe_code)]
mod select;

pub use notify::NotifyBackend;
pub use poll::PollBackend;
pub use select::{SELECT_CAPACITY_MAX, SelectBackend};

use crate::config::ProbeConfig;
use crate::error::ConfigError;
use crate::tracing_compat::trace;
use serde::Deserialize;
use std::fmt;
use std::io;
use std::os::fd::RawFd;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// An OS readiness mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Strategy {
    /// Event notification facility (epoll, kqueue, event ports).
    Notify,
    /// Classic `select(2)` over a fixed-size descriptor set.
    Select,
    /// `poll(2)`, insensitive to descriptor values.
    Poll,
}

impl Strategy {
    /// The default fallback chain.
    pub const DEFAULT_CHAIN: [Self; 3] = [Self::Notify, Self::Select, Self::Poll];

    /// Returns the strategy name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notify => "notify",
            Self::Select => "select",
            Self::Poll => "poll",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notify" | "epoll" | "kqueue" | "event-ports" => Ok(Self::Notify),
            "select" => Ok(Self::Select),
            "poll" => Ok(Self::Poll),
            _ => Err(ConfigError::UnknownStrategy(s.to_string())),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One readiness mechanism.
///
/// Implementations perform a single wait and release every OS resource they
/// acquired before returning, on success and on error. They must not retry
/// on `Interrupted` themselves.
pub trait Backend: fmt::Debug + Send + Sync {
    /// The strategy this backend implements. Drives error classification.
    fn strategy(&self) -> Strategy;

    /// Waits up to `timeout` for any of `fds` to become readable.
    ///
    /// `fds` holds no duplicates and no negative values. Returns the ready
    /// descriptors in the order the mechanism reported them.
    fn wait_once(&self, fds: &[RawFd], timeout: Option<Duration>) -> io::Result<Vec<RawFd>>;
}

/// Builds the OS backend for `strategy`.
#[must_use]
pub fn backend_for(strategy: Strategy, config: &ProbeConfig) -> Box<dyn Backend> {
    match strategy {
        Strategy::Notify => Box::new(NotifyBackend::new()),
        Strategy::Select => Box::new(SelectBackend::with_capacity(config.select_capacity)),
        Strategy::Poll => Box::new(PollBackend::new()),
    }
}

/// A fixed point in time derived from a caller's timeout.
///
/// `None` timeouts never expire. Timeouts too large to add to
/// [`Instant::now`] are passed through unchanged on every attempt.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    timeout: Option<Duration>,
    at: Option<Instant>,
}

impl Deadline {
    pub(crate) fn after(timeout: Option<Duration>) -> Self {
        let at = timeout.and_then(|t| Instant::now().checked_add(t));
        Self { timeout, at }
    }

    /// Time left before the deadline, saturating at zero.
    pub(crate) fn remaining(&self) -> Option<Duration> {
        match (self.timeout, self.at) {
            (None, _) => None,
            (Some(t), None) => Some(t),
            (Some(_), Some(at)) => Some(at.saturating_duration_since(Instant::now())),
        }
    }

    pub(crate) fn expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }
}

/// Runs `wait` until it completes with anything other than `Interrupted`.
///
/// Each attempt receives the time remaining before the deadline fixed on the
/// first attempt, so repeated signals cannot extend the total wait. There is
/// no attempt limit.
pub fn retry_interrupted<T, F>(timeout: Option<Duration>, mut wait: F) -> io::Result<T>
where
    F: FnMut(Option<Duration>) -> io::Result<T>,
{
    let deadline = Deadline::after(timeout);
    let mut attempt: u64 = 0;
    loop {
        match wait(deadline.remaining()) {
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                attempt += 1;
                trace!(attempt, "readiness wait interrupted, retrying");
            }
            other => return other,
        }
    }
}

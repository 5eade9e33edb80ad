//! Deterministic backends for testing.
//!
//! [`ScriptedBackend`] plays back a queue of [`ScriptStep`]s, one per
//! [`Backend::wait_once`] call. Once the script runs out it delegates to a
//! wrapped OS backend, or reports nothing ready if there is none. This makes
//! permission failures, capacity overflow and signal interruptions
//! reproducible without a sandbox, a descriptor flood or real signals.
//!
//! ```
//! use readyprobe::lab::{ScriptStep, ScriptedBackend};
//! use readyprobe::{Prober, SelectBackend};
//! use std::io;
//! use std::time::Duration;
//!
//! let (select, calls) = ScriptedBackend::wrapping(SelectBackend::new())
//!     .then(ScriptStep::Fail(io::ErrorKind::Interrupted))
//!     .counted();
//! let prober = Prober::with_backends(vec![Box::new(select)]).unwrap();
//!
//! let (left, _right) = std::os::unix::net::UnixStream::pair().unwrap();
//! let handles = [left];
//! let ready = prober.probe(&handles, Some(Duration::ZERO)).unwrap();
//! assert!(ready.is_empty());
//! assert_eq!(calls.get(), 2);
//! ```

use crate::error::CapacityExceeded;
use crate::strategy::{Backend, SELECT_CAPACITY_MAX, Strategy};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::os::fd::RawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// One scripted outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Fail with an error of this kind.
    Fail(io::ErrorKind),
    /// Fail with this raw OS error code.
    FailOs(i32),
    /// Fail with a capacity error for the highest descriptor in the set.
    CapacityExceeded,
    /// Report these descriptors as ready. Descriptors outside the set are
    /// reported too, so callers can check that they get filtered.
    Ready(Vec<RawFd>),
    /// Report every descriptor in the set as ready.
    AllReady,
    /// Delegate this call to the wrapped backend.
    Pass,
}

/// Shared count of `wait_once` calls on a [`ScriptedBackend`].
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    /// Calls so far.
    #[must_use]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A backend that follows a script.
#[derive(Debug)]
pub struct ScriptedBackend {
    strategy: Strategy,
    inner: Option<Box<dyn Backend>>,
    script: Mutex<VecDeque<ScriptStep>>,
    calls: CallCounter,
}

impl ScriptedBackend {
    /// A scripted backend with no OS backend behind it.
    #[must_use]
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            inner: None,
            script: Mutex::new(VecDeque::new()),
            calls: CallCounter::default(),
        }
    }

    /// A scripted backend in front of `inner`, reporting `inner`'s strategy.
    #[must_use]
    pub fn wrapping(inner: impl Backend + 'static) -> Self {
        Self {
            strategy: inner.strategy(),
            inner: Some(Box::new(inner)),
            script: Mutex::new(VecDeque::new()),
            calls: CallCounter::default(),
        }
    }

    /// Appends a step to the script.
    #[must_use]
    pub fn then(self, step: ScriptStep) -> Self {
        self.script.lock().push_back(step);
        self
    }

    /// Returns the backend together with a handle on its call count.
    #[must_use]
    pub fn counted(self) -> (Self, CallCounter) {
        let calls = self.calls.clone();
        (self, calls)
    }

    /// Steps not yet played.
    #[must_use]
    pub fn remaining_steps(&self) -> usize {
        self.script.lock().len()
    }

    fn delegate(&self, fds: &[RawFd], timeout: Option<Duration>) -> io::Result<Vec<RawFd>> {
        match &self.inner {
            Some(inner) => inner.wait_once(fds, timeout),
            None => Ok(Vec::new()),
        }
    }
}

impl Backend for ScriptedBackend {
    fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn wait_once(&self, fds: &[RawFd], timeout: Option<Duration>) -> io::Result<Vec<RawFd>> {
        self.calls.0.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().pop_front();
        match step {
            Some(ScriptStep::Fail(kind)) => Err(io::Error::from(kind)),
            Some(ScriptStep::FailOs(code)) => Err(io::Error::from_raw_os_error(code)),
            Some(ScriptStep::CapacityExceeded) => Err(CapacityExceeded {
                fd: fds.iter().copied().max().unwrap_or(0),
                limit: SELECT_CAPACITY_MAX,
            }
            .into()),
            Some(ScriptStep::Ready(ready)) => Ok(ready),
            Some(ScriptStep::AllReady) => Ok(fds.to_vec()),
            Some(ScriptStep::Pass) | None => self.delegate(fds, timeout),
        }
    }
}

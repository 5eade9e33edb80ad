//! The readiness prober.
//!
//! [`Prober::probe`] resolves the caller's handles to descriptors, walks the
//! strategy chain, and maps the ready descriptors back to the caller's own
//! handles.
//!
//! ```no_run
//! use readyprobe::{ProbeConfig, Prober};
//! use std::os::unix::net::UnixStream;
//! use std::time::Duration;
//!
//! let (left, right) = UnixStream::pair()?;
//! let prober = Prober::new(ProbeConfig::default())?;
//! let handles = [left, right];
//! let ready = prober.probe(&handles, Some(Duration::from_millis(100)))?;
//! assert!(ready.is_empty());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::config::ProbeConfig;
use crate::error::{ConfigError, FailureClass};
use crate::handle::{Descriptor, DescriptorMap};
use crate::strategy::{Backend, Strategy, backend_for, retry_interrupted};
use crate::tracing_compat::{debug, trace};
use std::io;
use std::time::Duration;

/// Waits for read readiness across a set of handles.
///
/// Holds only its strategy chain. Every OS resource is acquired and released
/// within a single [`probe`](Self::probe) call, so a `Prober` can be shared
/// freely between threads.
#[derive(Debug)]
pub struct Prober {
    chain: Vec<Box<dyn Backend>>,
}

impl Prober {
    /// Builds a prober with OS backends for the configured chain.
    pub fn new(config: ProbeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let chain = config
            .strategies
            .iter()
            .map(|&strategy| backend_for(strategy, &config))
            .collect();
        Ok(Self { chain })
    }

    /// Builds a prober over an explicit backend chain.
    pub fn with_backends(chain: Vec<Box<dyn Backend>>) -> Result<Self, ConfigError> {
        if chain.is_empty() {
            return Err(ConfigError::EmptyChain);
        }
        Ok(Self { chain })
    }

    /// The strategies in fallback order.
    #[must_use]
    pub fn strategies(&self) -> Vec<Strategy> {
        self.chain.iter().map(|backend| backend.strategy()).collect()
    }

    /// Blocks until at least one handle is readable, `timeout` elapses, or
    /// an unrecoverable error occurs.
    ///
    /// Returns references into `handles`, in the order the successful
    /// strategy reported them. `None` waits indefinitely; `Some(ZERO)` polls
    /// without blocking. An empty `handles` simply waits out the timeout.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a handle resolves to a negative descriptor.
    /// Otherwise returns the first fatal platform error unchanged, or the
    /// fall-through error of the last strategy when the chain is exhausted.
    pub fn probe<'a, H: Descriptor>(
        &self,
        handles: &'a [H],
        timeout: Option<Duration>,
    ) -> io::Result<Vec<&'a H>> {
        let map = DescriptorMap::resolve(handles)?;
        let fds = map.descriptors();

        let mut last_err = None;
        for backend in &self.chain {
            let strategy = backend.strategy();
            trace!(
                strategy = strategy.as_str(),
                fds = fds.len(),
                timeout = ?timeout,
                "readiness wait"
            );
            match retry_interrupted(timeout, |remaining| backend.wait_once(fds, remaining)) {
                Ok(ready) => return Ok(map.restore(handles, ready)),
                Err(err) => {
                    let class = FailureClass::classify(strategy, &err);
                    if !class.falls_through() {
                        debug!(
                            strategy = strategy.as_str(),
                            error = %err,
                            "readiness wait failed"
                        );
                        return Err(err);
                    }
                    debug!(
                        strategy = strategy.as_str(),
                        class = class.as_str(),
                        error = %err,
                        "falling back to next strategy"
                    );
                    last_err = Some(err);
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "no readiness strategy")))
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self {
            chain: Strategy::DEFAULT_CHAIN
                .iter()
                .map(|&strategy| backend_for(strategy, &ProbeConfig::default()))
                .collect(),
        }
    }
}

/// Probes `handles` with the default strategy chain.
///
/// See [`Prober::probe`].
pub fn probe_readiness<'a, H: Descriptor>(
    handles: &'a [H],
    timeout: Option<Duration>,
) -> io::Result<Vec<&'a H>> {
    Prober::default().probe(handles, timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lab::{ScriptStep, ScriptedBackend};
    use crate::strategy::SelectBackend;
    use crate::test_utils::{init_test_logging, pipe_pair};
    use std::io::Write;
    use std::os::fd::AsRawFd;
    use std::time::Instant;

    #[test]
    fn default_prober_finds_written_pipe() {
        init_test_logging();
        let (reader, mut writer) = pipe_pair();
        let (idle, _idle_writer) = pipe_pair();
        writer.write_all(b"ping").unwrap();

        let handles = [&idle, &reader];
        let ready = probe_readiness(&handles, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(ready.len(), 1);
        assert!(std::ptr::eq(ready[0], &handles[1]));
    }

    #[test]
    fn zero_timeout_with_nothing_pending_is_prompt() {
        init_test_logging();
        let (reader, _writer) = pipe_pair();
        let handles = [reader];
        let start = Instant::now();
        let ready = probe_readiness(&handles, Some(Duration::ZERO)).unwrap();
        assert!(ready.is_empty());
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn empty_set_waits_out_timeout() {
        init_test_logging();
        let handles: [i32; 0] = [];
        let ready = probe_readiness(&handles, Some(Duration::from_millis(10))).unwrap();
        assert!(ready.is_empty());
    }

    #[test]
    fn negative_descriptor_is_rejected_before_any_strategy() {
        init_test_logging();
        let (notify, notify_calls) = ScriptedBackend::new(Strategy::Notify).counted();
        let prober = Prober::with_backends(vec![Box::new(notify)]).unwrap();
        let err = prober.probe(&[-3], Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(notify_calls.get(), 0);
    }

    #[test]
    fn permission_denied_on_notify_falls_back() {
        init_test_logging();
        let (reader, mut writer) = pipe_pair();
        writer.write_all(b"x").unwrap();

        let notify = ScriptedBackend::new(Strategy::Notify)
            .then(ScriptStep::Fail(io::ErrorKind::PermissionDenied));
        let prober =
            Prober::with_backends(vec![Box::new(notify), Box::new(SelectBackend::new())]).unwrap();

        let handles = [reader];
        let ready = prober.probe(&handles, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(ready.len(), 1);
        assert!(std::ptr::eq(ready[0], &handles[0]));
    }

    #[test]
    fn permission_denied_on_select_is_fatal() {
        init_test_logging();
        let select = ScriptedBackend::new(Strategy::Select)
            .then(ScriptStep::Fail(io::ErrorKind::PermissionDenied));
        let (poll, poll_calls) = ScriptedBackend::new(Strategy::Poll).counted();
        let prober = Prober::with_backends(vec![Box::new(select), Box::new(poll)]).unwrap();

        let err = prober.probe(&[0], Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
        assert_eq!(poll_calls.get(), 0);
    }

    #[test]
    fn capacity_on_select_falls_back_to_poll() {
        init_test_logging();
        let (reader, mut writer) = pipe_pair();
        writer.write_all(b"x").unwrap();

        let prober = Prober::new(
            ProbeConfig::default()
                .with_strategies([Strategy::Select, Strategy::Poll])
                .with_select_capacity(1),
        )
        .unwrap();
        let handles = [reader];
        let ready = prober.probe(&handles, Some(Duration::from_secs(5))).unwrap();
        assert!(std::ptr::eq(ready[0], &handles[0]));
    }

    #[test]
    fn exhausted_chain_surfaces_last_fall_through_error() {
        init_test_logging();
        let prober = Prober::new(
            ProbeConfig::default()
                .with_strategies([Strategy::Select])
                .with_select_capacity(1),
        )
        .unwrap();
        let (reader, _writer) = pipe_pair();
        let err = prober.probe(&[reader], Some(Duration::ZERO)).unwrap_err();
        assert!(crate::error::capacity_exceeded(&err).is_some());
    }

    #[test]
    fn interruption_is_retried_on_the_same_strategy() {
        init_test_logging();
        let (reader, mut writer) = pipe_pair();
        writer.write_all(b"x").unwrap();
        let fd = reader.as_raw_fd();

        let (select, select_calls) = ScriptedBackend::wrapping(SelectBackend::new())
            .then(ScriptStep::Fail(io::ErrorKind::Interrupted))
            .counted();
        let (poll, poll_calls) = ScriptedBackend::new(Strategy::Poll).counted();
        let prober = Prober::with_backends(vec![Box::new(select), Box::new(poll)]).unwrap();

        let handles = [fd];
        let ready = prober.probe(&handles, Some(Duration::from_secs(5))).unwrap();
        assert_eq!(ready, vec![&fd]);
        assert_eq!(select_calls.get(), 2);
        assert_eq!(poll_calls.get(), 0);
    }

    #[test]
    fn fatal_error_is_surfaced_unchanged() {
        init_test_logging();
        let select = ScriptedBackend::new(Strategy::Select).then(ScriptStep::FailOs(libc::EBADF));
        let (poll, poll_calls) = ScriptedBackend::new(Strategy::Poll).counted();
        let prober = Prober::with_backends(vec![Box::new(select), Box::new(poll)]).unwrap();

        let err = prober.probe(&[4], Some(Duration::ZERO)).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
        assert_eq!(poll_calls.get(), 0);
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert!(matches!(
            Prober::with_backends(Vec::new()),
            Err(ConfigError::EmptyChain)
        ));
        assert!(Prober::new(ProbeConfig::default().with_strategies([])).is_err());
    }

    #[test]
    fn strategies_reflect_config() {
        let prober = Prober::new(ProbeConfig::default().without(Strategy::Select)).unwrap();
        assert_eq!(prober.strategies(), vec![Strategy::Notify, Strategy::Poll]);
        assert_eq!(
            Prober::default().strategies(),
            Strategy::DEFAULT_CHAIN.to_vec()
        );
    }
}

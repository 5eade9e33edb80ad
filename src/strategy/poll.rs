//! `poll(2)` backend.
//!
//! Registers each descriptor individually, so it has no capacity limit on
//! descriptor values. Every descriptor whose `revents` is non-empty counts as
//! ready, including hang-up and invalid-descriptor reports.

use super::{Backend, Deadline, Strategy};
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use std::io;
use std::os::fd::{BorrowedFd, RawFd};
use std::time::Duration;

/// Readiness via `poll(2)`.
#[derive(Debug, Clone, Default)]
pub struct PollBackend {
    _private: (),
}

impl PollBackend {
    /// Creates a poll backend.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

/// Milliseconds for one `poll` call, rounded up so a sub-millisecond timeout
/// never degrades into a busy loop. Long waits are split into chunks.
fn chunk_timeout(remaining: Option<Duration>) -> PollTimeout {
    match remaining {
        None => PollTimeout::NONE,
        Some(left) => {
            let millis = left.as_nanos().div_ceil(1_000_000);
            PollTimeout::from(u16::try_from(millis).unwrap_or(u16::MAX))
        }
    }
}

impl Backend for PollBackend {
    fn strategy(&self) -> Strategy {
        Strategy::Poll
    }

    fn wait_once(&self, fds: &[RawFd], timeout: Option<Duration>) -> io::Result<Vec<RawFd>> {
        // SAFETY: descriptors come from handles the caller keeps alive for
        // the duration of the probe, and negative values are rejected before
        // any backend runs.
        let borrowed: Vec<BorrowedFd<'_>> = fds
            .iter()
            .map(|&fd| unsafe { BorrowedFd::borrow_raw(fd) })
            .collect();
        let mut poll_fds: Vec<PollFd<'_>> = borrowed
            .iter()
            .map(|fd| PollFd::new(*fd, PollFlags::POLLIN))
            .collect();

        let deadline = Deadline::after(timeout);
        loop {
            let n = poll(&mut poll_fds, chunk_timeout(deadline.remaining()))?;
            if n > 0 {
                break;
            }
            if deadline.expired() {
                return Ok(Vec::new());
            }
        }

        Ok(fds
            .iter()
            .zip(&poll_fds)
            .filter(|(_, pfd)| pfd.revents().is_some_and(|revents| !revents.is_empty()))
            .map(|(&fd, _)| fd)
            .collect())
    }
}

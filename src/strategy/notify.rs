//! Event-notification backend (epoll, kqueue, event ports).
//!
//! Each wait creates a fresh [`polling::Poller`], registers every descriptor
//! for read interest, waits once and tears everything down again. The
//! [`Registrations`] guard deletes whatever was registered and closes the
//! poller on every exit path, including a registration that fails halfway
//! through the set.
//!
//! epoll refuses regular files with `EPERM`. That surfaces here as
//! `PermissionDenied`, which the prober treats as "strategy unavailable".

use super::{Backend, Strategy};
use polling::{Event, Events, Poller};
use std::io;
use std::num::NonZeroUsize;
use std::os::fd::{BorrowedFd, RawFd};
use std::time::Duration;

/// Readiness via the platform event-notification facility.
#[derive(Debug, Clone, Default)]
pub struct NotifyBackend {
    _private: (),
}

impl NotifyBackend {
    /// Creates a notify backend. No OS resources are held between waits.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

/// Owns a poller and the descriptors registered with it.
struct Registrations {
    poller: Poller,
    registered: Vec<RawFd>,
}

impl Registrations {
    fn new() -> io::Result<Self> {
        Ok(Self {
            poller: Poller::new()?,
            registered: Vec::new(),
        })
    }

    /// Registers `fd` for read interest under `key`.
    fn add(&mut self, fd: RawFd, key: usize) -> io::Result<()> {
        // SAFETY: `fd` belongs to a handle the caller keeps alive for the
        // whole probe, and it is deleted from the poller in `Drop` before the
        // probe returns.
        unsafe { self.poller.add(fd, Event::readable(key))? };
        self.registered.push(fd);
        Ok(())
    }
}

impl Drop for Registrations {
    fn drop(&mut self) {
        for &fd in &self.registered {
            // SAFETY: still open, see `add`.
            let source = unsafe { BorrowedFd::borrow_raw(fd) };
            let _ = self.poller.delete(source);
        }
    }
}

impl Backend for NotifyBackend {
    fn strategy(&self) -> Strategy {
        Strategy::Notify
    }

    fn wait_once(&self, fds: &[RawFd], timeout: Option<Duration>) -> io::Result<Vec<RawFd>> {
        let mut registrations = Registrations::new()?;
        for (key, &fd) in fds.iter().enumerate() {
            registrations.add(fd, key)?;
        }

        let capacity = NonZeroUsize::new(fds.len()).unwrap_or(NonZeroUsize::MIN);
        let mut events = Events::with_capacity(capacity);
        registrations.poller.wait(&mut events, timeout)?;

        Ok(events
            .iter()
            .filter(|event| event.readable)
            .filter_map(|event| fds.get(event.key).copied())
            .collect())
    }
}

//! `select(2)` backend.
//!
//! Waits on the whole set in one call. Descriptors at or above the set
//! capacity cannot be placed in an `fd_set`; the backend refuses them with
//! [`CapacityExceeded`] before the set is built.

use super::{Backend, Strategy};
use crate::error::CapacityExceeded;
use std::io;
use std::mem::MaybeUninit;
use std::os::fd::RawFd;
use std::ptr;
use std::time::Duration;

/// Largest capacity the platform `fd_set` supports.
pub const SELECT_CAPACITY_MAX: usize = libc::FD_SETSIZE as usize;

/// Darwin rejects longer timeouts with `EINVAL`.
const MAX_TIMEOUT_SECS: u64 = 100_000_000;

/// Readiness via `select(2)`.
#[derive(Debug, Clone)]
pub struct SelectBackend {
    capacity: usize,
}

impl SelectBackend {
    /// Creates a backend with the platform capacity.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            capacity: SELECT_CAPACITY_MAX,
        }
    }

    /// Creates a backend that treats descriptors at or above `capacity` as
    /// out of range. Clamped to [`SELECT_CAPACITY_MAX`].
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.min(SELECT_CAPACITY_MAX),
        }
    }

    /// The effective capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    fn check_capacity(&self, fds: &[RawFd]) -> Result<(), CapacityExceeded> {
        match fds
            .iter()
            .copied()
            .find(|&fd| usize::try_from(fd).map_or(true, |fd| fd >= self.capacity))
        {
            Some(fd) => Err(CapacityExceeded {
                fd,
                limit: self.capacity,
            }),
            None => Ok(()),
        }
    }
}

impl Default for SelectBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// An initialized, empty `fd_set`.
struct FdSet(libc::fd_set);

impl FdSet {
    fn new() -> Self {
        let mut raw = MaybeUninit::<libc::fd_set>::uninit();
        // SAFETY: FD_ZERO fully initializes the set it is given.
        unsafe {
            libc::FD_ZERO(raw.as_mut_ptr());
            Self(raw.assume_init())
        }
    }

    /// Caller guarantees `0 <= fd < FD_SETSIZE`.
    fn insert(&mut self, fd: RawFd) {
        // SAFETY: range checked by `check_capacity`.
        unsafe { libc::FD_SET(fd, &mut self.0) };
    }

    /// Caller guarantees `0 <= fd < FD_SETSIZE`.
    fn contains(&self, fd: RawFd) -> bool {
        // SAFETY: range checked by `check_capacity`.
        unsafe { libc::FD_ISSET(fd, &self.0) }
    }
}

fn to_timeval(timeout: Duration) -> libc::timeval {
    libc::timeval {
        tv_sec: libc::time_t::try_from(timeout.as_secs().min(MAX_TIMEOUT_SECS))
            .unwrap_or(libc::time_t::MAX),
        #[allow(clippy::cast_lossless, clippy::cast_possible_wrap)]
        tv_usec: timeout.subsec_micros() as libc::suseconds_t,
    }
}

impl Backend for SelectBackend {
    fn strategy(&self) -> Strategy {
        Strategy::Select
    }

    fn wait_once(&self, fds: &[RawFd], timeout: Option<Duration>) -> io::Result<Vec<RawFd>> {
        self.check_capacity(fds)?;

        let mut read_set = FdSet::new();
        for &fd in fds {
            read_set.insert(fd);
        }
        let nfds = fds.iter().copied().max().map_or(0, |fd| fd + 1);

        let mut tv = timeout.map(to_timeval);
        let tv_ptr = tv
            .as_mut()
            .map_or(ptr::null_mut(), |tv| tv as *mut libc::timeval);

        // SAFETY: the read set is initialized and only holds in-range
        // descriptors; the other sets are null; `tv_ptr` is null or points at
        // a live timeval.
        let rc = unsafe {
            libc::select(
                nfds,
                &mut read_set.0,
                ptr::null_mut(),
                ptr::null_mut(),
                tv_ptr,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        if rc == 0 {
            return Ok(Vec::new());
        }

        Ok(fds
            .iter()
            .copied()
            .filter(|&fd| read_set.contains(fd))
            .collect())
    }
}

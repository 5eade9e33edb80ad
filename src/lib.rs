//! readyprobe: interrupt-resilient readiness probing for interactive programs.
//!
//! # Overview
//!
//! An interactive terminal program spends most of its life waiting for
//! input on a handful of descriptors: stdin, a pipe from a pager, a socket.
//! [`probe_readiness`] performs that wait once. It blocks until at least one
//! handle is readable or the timeout elapses, and it returns the caller's own
//! handles, never normalized integers.
//!
//! Three OS mechanisms are tried in order:
//!
//! 1. **notify**: epoll / kqueue / event ports. Skipped for the call when
//!    registration is refused with `PermissionDenied`, as epoll does for
//!    regular files.
//! 2. **select**: `select(2)`. Skipped when a descriptor is above the
//!    `fd_set` capacity.
//! 3. **poll**: `poll(2)`.
//!
//! A signal that interrupts a wait (a terminal resize, say) is absorbed and
//! the wait resumes with whatever time is left. Any other failure is returned
//! unchanged.
//!
//! # Module Structure
//!
//! - [`prober`]: the fallback chain and [`probe_readiness`]
//! - [`strategy`]: the [`Backend`] trait, OS backends, retry discipline
//! - [`handle`]: the [`Descriptor`] abstraction
//! - [`config`]: [`ProbeConfig`], environment and TOML loading
//! - [`error`](mod@error): failure classification and config errors
//! - [`lab`]: scripted backends for tests (`test-internals` feature)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

#[cfg(not(unix))]
compile_error!("readyprobe supports Unix-family targets only.");

pub mod config;
pub mod error;
pub mod handle;
pub mod prober;
pub mod strategy;
mod tracing_compat;

// ── Test-only modules ───────────────────────────────────────────────────
#[cfg(any(test, feature = "test-internals"))]
pub mod lab;
#[cfg(any(test, feature = "test-internals"))]
pub mod test_utils;

pub use config::ProbeConfig;
pub use error::{CapacityExceeded, ConfigError, FailureClass};
pub use handle::{Descriptor, SourceFd};
pub use prober::{Prober, probe_readiness};
pub use strategy::{
    Backend, NotifyBackend, PollBackend, SelectBackend, Strategy, retry_interrupted,
};

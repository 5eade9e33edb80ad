//! Optional tracing integration.
//!
//! With the `tracing-integration` feature enabled this re-exports the
//! `tracing` event macros. Without it the same macro names expand to nothing,
//! so call sites never need their own `#[cfg]`.

#[cfg(feature = "tracing-integration")]
pub(crate) use tracing::{debug, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
macro_rules! noop_event {
    ($($arg:tt)*) => {{}};
}

#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop_event as debug;
#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop_event as trace;
#[cfg(not(feature = "tracing-integration"))]
pub(crate) use noop_event as warn;

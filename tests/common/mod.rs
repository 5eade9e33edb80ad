//! Shared fixtures and logging macros for readyprobe integration tests.

#![allow(dead_code, unused_imports, unused_macros)]

pub use readyprobe::test_utils::{init_test_logging, pipe_pair};

/// Marks the start of a test.
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(test = $name, "==== test start ====");
    };
}

/// Marks a section within a test.
macro_rules! test_section {
    ($name:expr) => {
        tracing::info!(section = $name, "---- section ----");
    };
}

/// Marks successful completion, with optional extra fields.
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = $name, "==== test complete ====");
    };
    ($name:expr, $($field:ident = $value:expr),+ $(,)?) => {
        tracing::info!(test = $name, $($field = $value),+, "==== test complete ====");
    };
}

/// Asserts `cond`, logging expected and actual values first.
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {{
        let ok = $cond;
        tracing::debug!(
            check = $msg,
            expected = ?$expected,
            actual = ?$actual,
            ok,
            "assertion"
        );
        assert!(ok, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    }};
}

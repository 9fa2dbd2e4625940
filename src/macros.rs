//! Diagnostics that only exist in test builds.
//!
//! Outside of `cfg(test)`, these expand to nothing (or, for `test_dbg!`, to
//! the expression itself), so they can be sprinkled through hot paths.
#![cfg_attr(not(test), allow(unused_macros))]

/// Evaluates an expression, logging its source text and value at `DEBUG` in
/// tests.
macro_rules! test_dbg {
    ($e:expr) => {{
        let value = $e;
        #[cfg(test)]
        tracing::debug!(
            location = %core::panic::Location::caller(),
            "{} = {:?}",
            stringify!($e),
            &value,
        );
        value
    }};
}

/// A `DEBUG` event that is only recorded in tests.
macro_rules! test_debug {
    ($($args:tt)+) => {
        #[cfg(test)]
        tracing::debug!($($args)+);
    };
}

/// A `TRACE` event, tagged with its source location, that is only recorded
/// in tests.
macro_rules! test_trace {
    ($($args:tt)+) => {
        #[cfg(test)]
        tracing::trace!(location = %core::panic::Location::caller(), $($args)+);
    };
}

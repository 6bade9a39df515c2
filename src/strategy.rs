//! Ordered fallback chains.
//!
//! Extraction and image resolution are both "try these in order, keep the
//! first one that produces something". Each step is a named function with the
//! same signature; [`first_success`] walks the list and reports which step won.

use tracing::debug;

/// A named step in a fallback chain.
pub type Strategy<I, T> = (&'static str, fn(&I) -> Option<T>);

/// Run `strategies` in order and return the first `Some`, tagged with the
/// name of the step that produced it.
pub fn first_success<I, T>(strategies: &[Strategy<I, T>], input: &I) -> Option<(&'static str, T)> {
    for &(name, strategy) in strategies {
        if let Some(value) = strategy(input) {
            debug!(strategy = name, "Strategy succeeded");
            return Some((name, value));
        }
        debug!(strategy = name, "Strategy produced nothing");
    }
    None
}

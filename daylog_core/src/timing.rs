//! Wall-clock measurement helper.

use std::time::{Duration, Instant};

/// Run `f` and return its result together with the elapsed time
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed())
}

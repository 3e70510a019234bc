use std::time::{Duration, Instant};

/// Runs `f` and returns its result together with the wall time it took.
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let out = f();
    (out, start.elapsed())
}

/// Milliseconds with sub-millisecond precision, for log lines.
pub fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1e3
}

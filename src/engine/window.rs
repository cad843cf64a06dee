use std::collections::HashMap;

/// Keyed sliding window over epoch-millisecond timestamps.
///
/// Prune-then-append-then-count is a single operation so callers cannot
/// observe a half-updated window. Keys are unbounded; values self-prune to
/// the trailing horizon on every access, and [`sweep`](Self::sweep) drops
/// keys whose windows have gone empty.
#[derive(Debug)]
pub struct KeyedWindow<T> {
    horizon_ms: i64,
    entries: HashMap<String, Vec<(i64, T)>>,
}

impl<T> KeyedWindow<T> {
    pub fn new(horizon_ms: i64) -> Self {
        Self {
            horizon_ms,
            entries: HashMap::new(),
        }
    }

    /// Records one observation for `key` at `now_ms` and returns the number
    /// of observations remaining inside the horizon, the new one included.
    pub fn record(&mut self, key: &str, now_ms: i64, value: T) -> usize {
        let window = self.entries.entry(key.to_string()).or_default();
        window.retain(|(t, _)| now_ms - *t < self.horizon_ms);
        window.push((now_ms, value));
        window.len()
    }

    /// Drops keys whose every observation has aged out. Memory bound only;
    /// correctness does not depend on it being called.
    pub fn sweep(&mut self, now_ms: i64) {
        let horizon = self.horizon_ms;
        self.entries.retain(|_, window| {
            window.retain(|(t, _)| now_ms - *t < horizon);
            !window.is_empty()
        });
    }

    #[cfg(test)]
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }
}

use crate::engine::window::KeyedWindow;

const WINDOW_MS: i64 = 60_000;
const MAX_PER_WINDOW: usize = 15;

/// Per-source sliding-window submission counter. Every call records the
/// attempt, rejected calls included, so sustained abuse keeps the window
/// saturated instead of draining it.
#[derive(Debug)]
pub struct RateLimiter {
    window: KeyedWindow<()>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            window: KeyedWindow::new(WINDOW_MS),
        }
    }

    pub fn allow(&mut self, source_key: &str, now_ms: i64) -> bool {
        self.window.record(source_key, now_ms, ()) <= MAX_PER_WINDOW
    }

    pub fn sweep(&mut self, now_ms: i64) {
        self.window.sweep(now_ms);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

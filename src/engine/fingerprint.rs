use crate::engine::window::KeyedWindow;

const WINDOW_MS: i64 = 60_000;
const CLUSTER_SIZE: usize = 6;
const UA_PREFIX_LEN: usize = 40;

/// Rolling per-fingerprint window catching many submissions from one
/// synthetic identity. The fingerprint is a truncated user-agent prefix
/// plus the declared battery level; two devices that collide on both are
/// treated as the same identity on purpose; the collision *is* the
/// detection mechanism.
#[derive(Debug)]
pub struct FingerprintTracker {
    window: KeyedWindow<(f64, f64)>,
}

impl FingerprintTracker {
    pub fn new() -> Self {
        Self {
            window: KeyedWindow::new(WINDOW_MS),
        }
    }

    /// Records the observation and reports whether this fingerprint has
    /// reached cluster size within the window.
    pub fn observe(
        &mut self,
        user_agent: &str,
        battery_level: Option<f64>,
        now_ms: i64,
        lat: f64,
        lng: f64,
    ) -> bool {
        let fp = fingerprint_of(user_agent, battery_level);
        self.window.record(&fp, now_ms, (lat, lng)) >= CLUSTER_SIZE
    }

    pub fn sweep(&mut self, now_ms: i64) {
        self.window.sweep(now_ms);
    }
}

impl Default for FingerprintTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn fingerprint_of(user_agent: &str, battery_level: Option<f64>) -> String {
    let prefix: String = user_agent.chars().take(UA_PREFIX_LEN).collect();
    let battery = battery_level.map(|b| b.to_string()).unwrap_or_default();
    format!("{prefix}|{battery}")
}

use std::collections::HashMap;
use std::sync::Mutex;

/// Device-session liveness tracker. Every request from a source address
/// refreshes its session; sessions idle past the TTL are pruned on the next
/// touch. The connected-population count floors at 1 so threshold policy
/// never divides the world by an empty room.
#[derive(Debug)]
pub struct SessionTracker {
    ttl_ms: i64,
    sessions: Mutex<HashMap<String, i64>>,
}

impl SessionTracker {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            ttl_ms,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn touch(&self, source_addr: &str, now_ms: i64) {
        let mut sessions = self.sessions.lock().expect("session tracker lock poisoned");
        sessions.retain(|_, last_seen| now_ms - *last_seen <= self.ttl_ms);
        sessions.insert(source_addr.to_string(), now_ms);
    }

    pub fn connected_count(&self) -> usize {
        let sessions = self.sessions.lock().expect("session tracker lock poisoned");
        sessions.len().max(1)
    }
}

pub mod bot;
pub mod fingerprint;
pub mod geo;
pub mod rate_limit;
pub mod triage;
pub mod trust;
pub mod window;

use crate::models::alert::{Alert, AlertKind, TrustLevel};
use crate::models::report::{IncomingReport, Provenance};
use crate::sessions::SessionTracker;
use chrono::Utc;
use fingerprint::FingerprintTracker;
use rate_limit::RateLimiter;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{info, warn};

/// Ambush flags older than this no longer count as "active" in snapshot
/// metadata (the flag on the alert itself is permanent).
const AMBUSH_ACTIVE_MS: i64 = 120_000;
/// Photo payloads above this decoded size are dropped, not rejected.
const MAX_PHOTO_BYTES: usize = 614_400;

const DEFAULT_LAT: f64 = 30.3522;
const DEFAULT_LNG: f64 = 76.3608;
const DEFAULT_LOCATION: &str = "Thapar Institute Campus";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RejectReason {
    #[error("Required fields: type, message")]
    MissingFields,
    #[error("Request flagged as synthetic: {0}")]
    BotSuspected(String),
    #[error("Too many requests. Slow down.")]
    RateLimited,
    #[error("Bot cluster signature detected")]
    BotCluster,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VouchReceipt {
    pub id: u64,
    pub vouches: u32,
    pub trust_score: u8,
    pub trust: TrustLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    pub connected_devices: usize,
    pub rural_mode: bool,
    pub verified_count: usize,
    pub ambush_active_flag: bool,
    pub server_time: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounters {
    pub total_alerts: usize,
    pub verified: usize,
    pub with_photo: usize,
    pub need_help: usize,
    pub safe: usize,
    pub ambush_active: bool,
    pub connected_devices: usize,
    pub rural_mode: bool,
}

struct EngineState {
    alerts: Vec<Alert>,
    next_id: u64,
    rate: RateLimiter,
    fingerprints: FingerprintTracker,
}

/// The Alert Integrity Engine: one instance per process, owning the alert
/// collection and all abuse-tracking windows. Transport hands in parsed
/// reports with provenance; the engine answers accept-with-classification or
/// reject-with-reason. Tracking windows are process-lifetime only and reset
/// on restart.
pub struct AlertEngine {
    state: Mutex<EngineState>,
    sessions: Arc<SessionTracker>,
}

impl AlertEngine {
    pub fn new(sessions: Arc<SessionTracker>) -> Self {
        Self::with_snapshot(sessions, Vec::new(), 1)
    }

    /// Rebuilds the engine from a persisted snapshot. The tracking windows
    /// start empty by design.
    pub fn with_snapshot(sessions: Arc<SessionTracker>, alerts: Vec<Alert>, next_id: u64) -> Self {
        let next_id = next_id.max(alerts.iter().map(|a| a.id + 1).max().unwrap_or(1));
        Self {
            state: Mutex::new(EngineState {
                alerts,
                next_id,
                rate: RateLimiter::new(),
                fingerprints: FingerprintTracker::new(),
            }),
            sessions,
        }
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().expect("engine state lock poisoned")
    }

    pub fn submit(&self, report: IncomingReport, prov: &Provenance) -> Result<Alert, RejectReason> {
        self.submit_at(report, prov, now_ms())
    }

    /// Full integrity pipeline for one submission. Runs synchronously under
    /// the state lock with no suspension points; the rate and fingerprint
    /// windows are mutated even on rejection so repeated abuse keeps
    /// accumulating toward detection.
    pub fn submit_at(
        &self,
        report: IncomingReport,
        prov: &Provenance,
        now_ms: i64,
    ) -> Result<Alert, RejectReason> {
        let kind = match report.kind.as_deref().filter(|s| !s.is_empty()) {
            Some(k) => AlertKind::parse_lossy(k),
            None => return Err(RejectReason::MissingFields),
        };
        let message = match report.message.as_deref().filter(|s| !s.is_empty()) {
            Some(m) => truncate(m, 300),
            None => return Err(RejectReason::MissingFields),
        };

        if !bot::is_local_addr(&prov.source_addr) {
            if let Some(reason) = bot::classify(&prov.user_agent, report.battery_level) {
                warn!("BOT BLOCKED [{}]: {}", prov.source_addr, reason);
                return Err(RejectReason::BotSuspected(reason));
            }
        }

        let mut state = self.state();

        if !state.rate.allow(&prov.source_addr, now_ms) {
            warn!("RATE LIMITED [{}]", prov.source_addr);
            return Err(RejectReason::RateLimited);
        }

        let lat = report.lat.unwrap_or(DEFAULT_LAT);
        let lng = report.lng.unwrap_or(DEFAULT_LNG);

        if state
            .fingerprints
            .observe(&prov.user_agent, report.battery_level, now_ms, lat, lng)
        {
            warn!("BOT CLUSTER [{}]: fingerprint burst within 60s", prov.source_addr);
            return Err(RejectReason::BotCluster);
        }

        let ambush_flag = geo::detect_ambush(&state.alerts, lat, lng, now_ms);
        if ambush_flag {
            warn!("AMBUSH: coordinated burst within 15s / 50m near ({lat}, {lng})");
        }

        let photo_data = report.photo_data.filter(|p| decoded_len(p) <= MAX_PHOTO_BYTES);
        let has_photo = photo_data.is_some();

        // Client-declared vouch counts are untrusted; every alert starts at
        // zero and only the vouch operation can raise it.
        let inputs = trust::TrustInputs {
            vouches: 0,
            has_photo,
            gps_accuracy: report.gps_accuracy,
            signal_dbm: report.signal_dbm,
            proxy: report.proxy,
        };
        let trust_score = trust::score(&inputs);
        let trust_level = trust::level(trust_score, self.sessions.connected_count());

        let (category, first_aid) = triage::classify(&message);

        let alert = Alert {
            id: state.next_id,
            kind,
            lat,
            lng,
            user: truncate(report.user.as_deref().unwrap_or("Anonymous"), 50),
            message,
            location: truncate(report.location.as_deref().unwrap_or(DEFAULT_LOCATION), 120),
            time: now_ms,
            trust: trust_level,
            trust_score,
            category,
            first_aid: first_aid.map(str::to_string),
            proxy: report.proxy,
            reported_by: report
                .proxy
                .then(|| truncate(report.reported_by.as_deref().unwrap_or(""), 60)),
            vouches: 0,
            has_photo,
            gps_accuracy: report.gps_accuracy,
            signal_dbm: report.signal_dbm,
            ambush_flag,
            photo_data,
            submitted_by: prov.source_addr.clone(),
            device_id: truncate(report.device_id.as_deref().unwrap_or(""), 36),
        };
        state.next_id += 1;
        state.alerts.push(alert.clone());

        info!(
            "{:?} | {} | {:?} | score:{}({:?}) | photo:{} {}| src:{}",
            alert.kind,
            alert.user,
            alert.category,
            alert.trust_score,
            alert.trust,
            has_photo,
            if ambush_flag { "AMBUSH " } else { "" },
            prov.source_addr,
        );

        Ok(alert)
    }

    pub fn vouch(&self, id: u64) -> Option<VouchReceipt> {
        self.vouch_at(id, self.sessions.connected_count())
    }

    /// Increments the vouch count and recomputes the full trust formula from
    /// the stored inputs, never an incremental delta.
    pub fn vouch_at(&self, id: u64, population: usize) -> Option<VouchReceipt> {
        let mut state = self.state();
        let alert = state.alerts.iter_mut().find(|a| a.id == id)?;
        alert.vouches += 1;
        let inputs = trust::TrustInputs {
            vouches: alert.vouches,
            has_photo: alert.has_photo,
            gps_accuracy: alert.gps_accuracy,
            signal_dbm: alert.signal_dbm,
            proxy: alert.proxy,
        };
        alert.trust_score = trust::score(&inputs);
        alert.trust = trust::level(alert.trust_score, population);
        Some(VouchReceipt {
            id,
            vouches: alert.vouches,
            trust_score: alert.trust_score,
            trust: alert.trust,
        })
    }

    /// Alerts sorted by submission time descending, plus population metadata.
    pub fn snapshot(&self) -> (Vec<Alert>, SnapshotMeta) {
        self.snapshot_at(now_ms())
    }

    pub fn snapshot_at(&self, now_ms: i64) -> (Vec<Alert>, SnapshotMeta) {
        let state = self.state();
        let mut alerts = state.alerts.clone();
        alerts.sort_by(|a, b| b.time.cmp(&a.time));
        let population = self.sessions.connected_count();
        let meta = SnapshotMeta {
            connected_devices: population,
            rural_mode: trust::rural_mode(population),
            verified_count: alerts.iter().filter(|a| a.trust == TrustLevel::Verified).count(),
            ambush_active_flag: alerts
                .iter()
                .any(|a| a.ambush_flag && now_ms - a.time < AMBUSH_ACTIVE_MS),
            server_time: now_ms,
        };
        (alerts, meta)
    }

    pub fn status(&self) -> StatusCounters {
        let state = self.state();
        let population = self.sessions.connected_count();
        StatusCounters {
            total_alerts: state.alerts.len(),
            verified: state
                .alerts
                .iter()
                .filter(|a| a.trust == TrustLevel::Verified)
                .count(),
            with_photo: state.alerts.iter().filter(|a| a.has_photo).count(),
            need_help: state
                .alerts
                .iter()
                .filter(|a| a.kind == AlertKind::NeedHelp)
                .count(),
            safe: state.alerts.iter().filter(|a| a.kind == AlertKind::Safe).count(),
            ambush_active: state.alerts.iter().any(|a| a.ambush_flag),
            connected_devices: population,
            rural_mode: trust::rural_mode(population),
        }
    }

    pub fn photo(&self, id: u64) -> Option<String> {
        let state = self.state();
        state
            .alerts
            .iter()
            .find(|a| a.id == id)
            .and_then(|a| a.photo_data.clone())
    }

    /// Administrative wipe. Durability is the persistence collaborator's
    /// problem; the caller is expected to follow up with a save.
    pub fn clear_all(&self) {
        let mut state = self.state();
        state.alerts.clear();
        state.next_id = 1;
        info!("All alerts cleared");
    }

    /// Clones the durable state for the persistence sink.
    pub fn persistable(&self) -> (Vec<Alert>, u64) {
        let state = self.state();
        (state.alerts.clone(), state.next_id)
    }

    /// Garbage-collects stale keys from the tracking windows.
    pub fn sweep_windows(&self) {
        let now = now_ms();
        let mut state = self.state();
        state.rate.sweep(now);
        state.fingerprints.sweep(now);
    }
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Decoded size of a base64 payload: three bytes per four-char block, minus
/// the trailing padding.
fn decoded_len(b64: &str) -> usize {
    let padding = b64.bytes().rev().take_while(|&b| b == b'=').count();
    (b64.len() / 4 * 3).saturating_sub(padding)
}

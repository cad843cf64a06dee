use crate::models::alert::Alert;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

static SAVE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub alerts: Vec<Alert>,
    #[serde(rename = "nextId")]
    pub next_id: u64,
}

/// Best-effort JSON snapshot sink. Writes never gate a response and a failed
/// write never touches in-memory state; failures are logged and swallowed.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn load(&self) -> Result<Option<SnapshotFile>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let snapshot: SnapshotFile = serde_json::from_str(&raw)?;
        Ok(Some(snapshot))
    }

    /// Writes the snapshot to a uniquely named sibling temp file, then
    /// renames it into place. Overlapping saves cannot tear the snapshot;
    /// whichever rename lands last wins whole.
    pub fn save(&self, alerts: &[Alert], next_id: u64) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let snapshot = SnapshotFile {
            alerts: alerts.to_vec(),
            next_id,
        };
        let tmp = self.temp_path();
        fs::write(&tmp, serde_json::to_string_pretty(&snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("snapshot");
        let seq = SAVE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.path.with_file_name(format!("{name}.{seq}.tmp"))
    }
}

/// Fire-and-forget persistence: hand the cloned state to a blocking task and
/// log the outcome without holding up the caller.
pub fn spawn_save(store: Arc<SnapshotStore>, alerts: Vec<Alert>, next_id: u64) {
    tokio::task::spawn_blocking(move || {
        if let Err(e) = store.save(&alerts, next_id) {
            error!("DISK ERROR: {e}");
        }
    });
}

/// Startup load, logging like a reload rather than failing the boot; a
/// corrupt or missing snapshot just means a fresh start.
pub fn load_or_fresh(store: &SnapshotStore) -> (Vec<Alert>, u64) {
    match store.load() {
        Ok(Some(snapshot)) => {
            info!("Reloaded {} alerts from disk", snapshot.alerts.len());
            (snapshot.alerts, snapshot.next_id)
        }
        Ok(None) => (Vec::new(), 1),
        Err(e) => {
            info!("Fresh start ({e})");
            (Vec::new(), 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::alert::{AlertKind, Category, TrustLevel};
    use tempfile::tempdir;

    fn sample_alert(id: u64) -> Alert {
        Alert {
            id,
            kind: AlertKind::Safe,
            lat: 30.35,
            lng: 76.36,
            user: "Dev P.".into(),
            message: "evacuated to sports ground".into(),
            location: "Sports Ground".into(),
            time: 1_700_000_000_000,
            trust: TrustLevel::Verified,
            trust_score: 70,
            category: Category::Safe,
            first_aid: None,
            proxy: false,
            reported_by: None,
            vouches: 2,
            has_photo: false,
            gps_accuracy: Some(12.0),
            signal_dbm: Some(-48.0),
            ambush_flag: false,
            photo_data: None,
            submitted_by: "192.168.1.7".into(),
            device_id: "d-7".into(),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("alerts_data.json"));

        store.save(&[sample_alert(1), sample_alert(2)], 3).unwrap();
        let snapshot = store.load().unwrap().unwrap();
        assert_eq!(snapshot.alerts.len(), 2);
        assert_eq!(snapshot.next_id, 3);
        assert_eq!(snapshot.alerts[0].trust_score, 70);
        assert_eq!(snapshot.alerts[0].gps_accuracy, Some(12.0));
    }

    #[test]
    fn save_renames_into_place_leaving_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("alerts_data.json"));

        store.save(&[sample_alert(1)], 2).unwrap();
        store.save(&[sample_alert(1), sample_alert(2)], 3).unwrap();

        let entries: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["alerts_data.json".to_string()]);

        // The last complete write wins whole.
        let snapshot = store.load().unwrap().unwrap();
        assert_eq!(snapshot.alerts.len(), 2);
        assert_eq!(snapshot.next_id, 3);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nope.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn corrupt_file_falls_back_to_fresh() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alerts_data.json");
        fs::write(&path, "{ not json").unwrap();
        let (alerts, next_id) = load_or_fresh(&SnapshotStore::new(path));
        assert!(alerts.is_empty());
        assert_eq!(next_id, 1);
    }
}

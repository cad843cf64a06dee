use crate::engine::{now_ms, AlertEngine, RejectReason};
use crate::models::alert::{Alert, PublicAlert};
use crate::models::report::{IncomingReport, Provenance};
use crate::sessions::SessionTracker;
use crate::storage::{self, SnapshotStore};
use axum::{
    extract::{ConnectInfo, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, SecondsFormat};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub struct AppState {
    pub engine: AlertEngine,
    pub sessions: Arc<SessionTracker>,
    pub store: Arc<SnapshotStore>,
    pub started_at: i64,
}

type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/alerts",
            get(list_alerts).post(submit_alert).delete(clear_alerts),
        )
        .route("/api/vouch/:id", post(vouch_alert))
        .route("/api/alert/:id/photo", get(get_photo))
        .route("/api/status", get(status))
        .route("/admin/export", get(export_csv))
        .route("/admin/json", get(export_json))
        .layer(middleware::from_fn_with_state(state.clone(), track_session))
        .layer(cors)
        .with_state(state)
}

/// Every request refreshes the caller's device session; the resulting
/// population count drives the adaptive verification threshold.
async fn track_session(
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let addr = client_addr(req.headers(), peer);
    state.sessions.touch(&addr, now_ms());
    next.run(req).await
}

/// Prefer the first X-Forwarded-For hop, fall back to the socket peer.
fn client_addr(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

async fn list_alerts(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let (alerts, meta) = state.engine.snapshot();
    let public: Vec<PublicAlert> = alerts.iter().map(PublicAlert::from).collect();
    Json(json!({
        "alerts": public,
        "meta": {
            "workerId": std::process::id(),
            "ruralMode": meta.rural_mode,
            "connectedDevices": meta.connected_devices,
            "verifiedCount": meta.verified_count,
            "ambushActiveFlag": meta.ambush_active_flag,
            "serverTime": meta.server_time,
        }
    }))
}

async fn submit_alert(
    State(state): State<SharedState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(report): Json<IncomingReport>,
) -> Response {
    let prov = Provenance {
        source_addr: client_addr(&headers, peer),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
    };

    match state.engine.submit(report, &prov) {
        Ok(alert) => {
            let (alerts, next_id) = state.engine.persistable();
            storage::spawn_save(state.store.clone(), alerts, next_id);
            (StatusCode::CREATED, Json(PublicAlert::from(&alert))).into_response()
        }
        Err(reason) => reject_response(&reason).into_response(),
    }
}

fn reject_response(reason: &RejectReason) -> (StatusCode, Json<serde_json::Value>) {
    match reason {
        RejectReason::MissingFields => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Required fields: type, message" })),
        ),
        RejectReason::BotSuspected(detail) => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Request flagged as synthetic", "reason": detail })),
        ),
        RejectReason::RateLimited => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests. Slow down." })),
        ),
        RejectReason::BotCluster => (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Bot cluster signature detected" })),
        ),
    }
}

async fn vouch_alert(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    match state.engine.vouch(id) {
        Some(receipt) => {
            let (alerts, next_id) = state.engine.persistable();
            storage::spawn_save(state.store.clone(), alerts, next_id);
            Json(receipt).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Alert not found" })),
        )
            .into_response(),
    }
}

async fn get_photo(State(state): State<SharedState>, Path(id): Path<u64>) -> Response {
    match state.engine.photo(id) {
        Some(photo) => Json(json!({ "id": id, "photoData": photo })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No photo for this alert" })),
        )
            .into_response(),
    }
}

async fn status(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let counters = state.engine.status();
    let uptime_secs = (now_ms() - state.started_at) / 1000;
    let mut body = serde_json::to_value(counters).unwrap_or_default();
    if let Some(map) = body.as_object_mut() {
        map.insert("worker".into(), json!(std::process::id()));
        map.insert("uptime".into(), json!(uptime_secs));
    }
    Json(body)
}

async fn export_csv(State(state): State<SharedState>) -> Response {
    let (alerts, _) = state.engine.snapshot();
    let csv = to_csv(&alerts);
    let disposition = format!("attachment; filename=\"cec_alerts_{}.csv\"", now_ms());
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response()
}

async fn export_json(State(state): State<SharedState>) -> Response {
    let (alerts, _) = state.engine.snapshot();
    let public: Vec<PublicAlert> = alerts.iter().map(PublicAlert::from).collect();
    let disposition = format!("attachment; filename=\"cec_alerts_{}.json\"", now_ms());
    (
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        serde_json::to_string_pretty(&public).unwrap_or_default(),
    )
        .into_response()
}

async fn clear_alerts(State(state): State<SharedState>) -> Json<serde_json::Value> {
    state.engine.clear_all();
    let (alerts, next_id) = state.engine.persistable();
    storage::spawn_save(state.store.clone(), alerts, next_id);
    Json(json!({ "ok": true, "message": "All alerts cleared" }))
}

const CSV_COLS: [&str; 16] = [
    "id", "type", "category", "trust", "trustScore", "vouches", "user", "message", "location",
    "lat", "lng", "proxy", "reportedBy", "hasPhoto", "ambushFlag", "time",
];

fn to_csv(alerts: &[Alert]) -> String {
    let mut rows = vec![CSV_COLS.join(",")];
    for a in alerts {
        let time_iso = DateTime::from_timestamp_millis(a.time)
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();
        let fields = [
            a.id.to_string(),
            a.kind.as_str().to_string(),
            a.category.as_str().to_string(),
            a.trust.as_str().to_string(),
            a.trust_score.to_string(),
            a.vouches.to_string(),
            a.user.clone(),
            a.message.clone(),
            a.location.clone(),
            a.lat.to_string(),
            a.lng.to_string(),
            a.proxy.to_string(),
            a.reported_by.clone().unwrap_or_default(),
            a.has_photo.to_string(),
            a.ambush_flag.to_string(),
            time_iso,
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        rows.push(row.join(","));
    }
    rows.join("\r\n")
}

fn csv_escape(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

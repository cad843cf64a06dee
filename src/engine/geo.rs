use crate::models::alert::Alert;

const EARTH_RADIUS_M: f64 = 6_371_000.0;
const AMBUSH_WINDOW_MS: i64 = 15_000;
const AMBUSH_RADIUS_M: f64 = 50.0;
const AMBUSH_MIN_NEARBY: usize = 3;

/// Great-circle distance in meters, haversine on a spherical Earth.
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Scans the accepted-alert collection for a spatial/temporal burst around
/// (lat, lng): 3+ alerts within the last 15 seconds and 50 meters flag the
/// incoming submission as a potential coordinated or copy-cat wave. Advisory
/// only: it cannot catch the first wave, and a flagged alert is still
/// accepted.
pub fn detect_ambush(alerts: &[Alert], lat: f64, lng: f64, now_ms: i64) -> bool {
    let cutoff = now_ms - AMBUSH_WINDOW_MS;
    let nearby = alerts
        .iter()
        .filter(|a| a.time >= cutoff && haversine_m(lat, lng, a.lat, a.lng) <= AMBUSH_RADIUS_M)
        .count();
    nearby >= AMBUSH_MIN_NEARBY
}

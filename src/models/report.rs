use serde::{Deserialize, Deserializer};

/// A candidate report as submitted by an untrusted device, before any
/// integrity checks. Numeric fields arrive as numbers or strings depending
/// on the client; all of them go through [`parse_f64_option`] so the
/// defaulting policy lives in one place.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingReport {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub user: Option<String>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub lng: Option<f64>,
    /// Client-declared battery charge in [0,1].
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub battery_level: Option<f64>,
    /// GPS horizontal accuracy in meters.
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub gps_accuracy: Option<f64>,
    /// Radio signal strength in dBm.
    #[serde(rename = "wifiRssi", default, deserialize_with = "parse_f64_option")]
    pub signal_dbm: Option<f64>,
    #[serde(default)]
    pub proxy: bool,
    pub reported_by: Option<String>,
    pub photo_data: Option<String>,
    pub device_id: Option<String>,
}

/// Request provenance supplied by the transport layer, not the client body.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub source_addr: String,
    pub user_agent: String,
}

/// Accepts a float, a numeric string, or nothing. Empty and unparseable
/// strings coerce to `None`; malformed numbers never reject a report.
fn parse_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrFloat {
        String(String),
        Float(f64),
    }

    let v: Option<StringOrFloat> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrFloat::Float(f)) => Ok(Some(f)),
        Some(StringOrFloat::String(s)) => Ok(s.trim().parse::<f64>().ok()),
        None => Ok(None),
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "NEED_HELP")]
    NeedHelp,
    #[serde(rename = "SAFE")]
    Safe,
}

impl AlertKind {
    /// Unknown wire values coerce to `NeedHelp` rather than rejecting the
    /// report; a life-safety submission is never dropped over a bad enum tag.
    pub fn parse_lossy(raw: &str) -> Self {
        match raw {
            "SAFE" => AlertKind::Safe,
            _ => AlertKind::NeedHelp,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AlertKind::NeedHelp => "NEED_HELP",
            AlertKind::Safe => "SAFE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Verified,
    Unverified,
}

impl TrustLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            TrustLevel::Verified => "verified",
            TrustLevel::Unverified => "unverified",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "MEDICAL")]
    Medical,
    #[serde(rename = "FIRE")]
    Fire,
    #[serde(rename = "TRAPPED")]
    Trapped,
    #[serde(rename = "FLOOD")]
    Flood,
    #[serde(rename = "MISSING")]
    Missing,
    #[serde(rename = "FOOD_WATER")]
    FoodWater,
    #[serde(rename = "SAFE")]
    Safe,
    #[serde(rename = "GENERAL")]
    General,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Category::Medical => "MEDICAL",
            Category::Fire => "FIRE",
            Category::Trapped => "TRAPPED",
            Category::Flood => "FLOOD",
            Category::Missing => "MISSING",
            Category::FoodWater => "FOOD_WATER",
            Category::Safe => "SAFE",
            Category::General => "GENERAL",
        }
    }
}

/// The unit of record. This is the full shape persisted in the disk
/// snapshot; API responses go through [`PublicAlert`], which drops the
/// photo payload and the submitting address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub lat: f64,
    pub lng: f64,
    pub user: String,
    pub message: String,
    pub location: String,
    /// Server clock, epoch milliseconds.
    pub time: i64,
    pub trust: TrustLevel,
    pub trust_score: u8,
    pub category: Category,
    pub first_aid: Option<String>,
    pub proxy: bool,
    pub reported_by: Option<String>,
    pub vouches: u32,
    pub has_photo: bool,
    /// Stored so the vouch path can recompute the full trust formula.
    pub gps_accuracy: Option<f64>,
    #[serde(rename = "wifiRssi")]
    pub signal_dbm: Option<f64>,
    pub ambush_flag: bool,
    #[serde(default)]
    pub photo_data: Option<String>,
    #[serde(default)]
    pub submitted_by: String,
    #[serde(default)]
    pub device_id: String,
}

/// API-facing view of an [`Alert`]: same fields minus the photo payload and
/// the submitting source address.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicAlert {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub lat: f64,
    pub lng: f64,
    pub user: String,
    pub message: String,
    pub location: String,
    pub time: i64,
    pub trust: TrustLevel,
    pub trust_score: u8,
    pub category: Category,
    pub first_aid: Option<String>,
    pub proxy: bool,
    pub reported_by: Option<String>,
    pub vouches: u32,
    pub has_photo: bool,
    pub ambush_flag: bool,
    pub device_id: String,
}

impl From<&Alert> for PublicAlert {
    fn from(a: &Alert) -> Self {
        Self {
            id: a.id,
            kind: a.kind,
            lat: a.lat,
            lng: a.lng,
            user: a.user.clone(),
            message: a.message.clone(),
            location: a.location.clone(),
            time: a.time,
            trust: a.trust,
            trust_score: a.trust_score,
            category: a.category,
            first_aid: a.first_aid.clone(),
            proxy: a.proxy,
            reported_by: a.reported_by.clone(),
            vouches: a.vouches,
            has_photo: a.has_photo,
            ambush_flag: a.ambush_flag,
            device_id: a.device_id.clone(),
        }
    }
}

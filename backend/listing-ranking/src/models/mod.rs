mod lenient;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

/// WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One row of a pharmacy's weekly opening-hours table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHoursRule {
    /// 0 = Sunday .. 6 = Saturday
    pub day: Option<u8>,
    /// `HH:MM`
    pub open: Option<String>,
    /// `HH:MM`
    pub close: Option<String>,
    #[serde(default)]
    pub closed: bool,
}

impl OpeningHoursRule {
    pub fn hours(day: u8, open: &str, close: &str) -> Self {
        Self {
            day: Some(day),
            open: Some(open.to_string()),
            close: Some(close.to_string()),
            closed: false,
        }
    }

    pub fn closed_on(day: u8) -> Self {
        Self {
            day: Some(day),
            closed: true,
            ..Default::default()
        }
    }
}

/// Pharmacy storefront record as delivered by the record store.
///
/// Field names follow the store's columns; every column except `id` may be
/// missing or malformed and degrades to "absent".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    #[serde(deserialize_with = "lenient::id_string")]
    pub id: String,

    #[serde(default, deserialize_with = "lenient::lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient::lenient_f64")]
    pub longitude: Option<f64>,

    #[serde(
        default,
        rename = "opening_hours",
        deserialize_with = "lenient::lenient_schedule"
    )]
    pub schedule: Vec<OpeningHoursRule>,
    /// Forces the open state when set, bypassing the schedule. Decoded store
    /// rows only ever carry `Some(true)` here.
    #[serde(
        default,
        rename = "is_open",
        deserialize_with = "lenient::open_override"
    )]
    pub manual_open_override: Option<bool>,
    #[serde(
        default,
        rename = "auto_open_status",
        deserialize_with = "lenient::lenient_flag"
    )]
    pub auto_schedule_enabled: bool,

    #[serde(
        default,
        rename = "plan",
        deserialize_with = "lenient::lenient_string"
    )]
    pub plan_tier: Option<String>,
    #[serde(
        default,
        rename = "is_featured",
        deserialize_with = "lenient::lenient_bool"
    )]
    pub featured_flag: Option<bool>,
    #[serde(
        default,
        rename = "is_sponsored",
        deserialize_with = "lenient::lenient_bool"
    )]
    pub sponsored_flag: Option<bool>,

    #[serde(default, deserialize_with = "lenient::lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(
        default,
        rename = "delivery_time_min",
        deserialize_with = "lenient::lenient_f64"
    )]
    pub delivery_time_min_minutes: Option<f64>,
    #[serde(
        default,
        rename = "delivery_time_max",
        deserialize_with = "lenient::lenient_f64"
    )]
    pub delivery_time_max_minutes: Option<f64>,
    /// Operational SLA, 0-100
    #[serde(default, deserialize_with = "lenient::lenient_f64")]
    pub sla_score: Option<f64>,
    /// Customer rating, 0-5
    #[serde(default, deserialize_with = "lenient::lenient_f64")]
    pub rating: Option<f64>,
}

impl RawListing {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Geocoded position, if the record has a usable one.
    ///
    /// A zero latitude or longitude is the store's placeholder for
    /// "address not geocoded" and is treated as missing.
    pub fn coordinates(&self) -> Option<GeoPoint> {
        let usable = |v: Option<f64>| v.filter(|x| x.is_finite() && *x != 0.0);
        Some(GeoPoint::new(
            usable(self.latitude)?,
            usable(self.longitude)?,
        ))
    }
}

/// Decode a batch of store rows.
///
/// Anything other than a JSON array yields no listings; rows that cannot be
/// decoded at all (no usable `id`) are skipped.
pub fn decode_listings(rows: Value) -> Vec<RawListing> {
    let Value::Array(rows) = rows else {
        warn!("Listing payload is not an array; ranking nothing");
        return Vec::new();
    };

    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<RawListing>(row) {
            Ok(listing) => Some(listing),
            Err(e) => {
                warn!(row = index, error = %e, "Skipping undecodable listing row");
                None
            }
        })
        .collect()
}

/// Per-request viewer state
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerContext {
    /// Falls back to the configured reference point when absent
    pub location: Option<GeoPoint>,
    /// Evaluation instant in the viewer's local offset
    pub now: DateTime<FixedOffset>,
}

impl ViewerContext {
    pub fn new(location: Option<GeoPoint>, now: DateTime<FixedOffset>) -> Self {
        Self { location, now }
    }

    /// Viewer without a known position
    pub fn at(now: DateTime<FixedOffset>) -> Self {
        Self {
            location: None,
            now,
        }
    }
}

/// Which rule decided a listing's open state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenSource {
    ManualOverride,
    Schedule,
    Closed,
}

impl OpenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpenSource::ManualOverride => "manual_override",
            OpenSource::Schedule => "schedule",
            OpenSource::Closed => "closed",
        }
    }
}

/// Listing with viewer-relative derived facts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedListing {
    #[serde(flatten)]
    pub listing: RawListing,
    /// `f64::INFINITY` when the listing has no coordinates
    #[serde(serialize_with = "finite_or_null")]
    pub distance_meters: f64,
    pub is_open: bool,
    pub open_source: OpenSource,
    pub is_new: bool,
    pub is_featured: bool,
}

impl EnrichedListing {
    pub fn distance_km(&self) -> f64 {
        self.distance_meters / 1000.0
    }

    pub fn is_sponsored(&self) -> bool {
        self.listing.sponsored_flag == Some(true)
    }
}

/// Every term that went into a listing's score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub proximity: f64,
    pub delivery_speed: f64,
    pub sla: f64,
    pub rating: f64,
    pub promotion: f64,
    /// Weighted sum of the five sub-scores
    pub base: f64,
    pub featured_boost: f64,
    pub sponsored_boost: f64,
    /// Positive when open, negative when closed
    pub open_adjustment: f64,
    pub new_bonus: f64,
    pub jitter: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.base
            + self.featured_boost
            + self.sponsored_boost
            + self.open_adjustment
            + self.new_bonus
            + self.jitter
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredListing {
    #[serde(flatten)]
    pub listing: EnrichedListing,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl ScoredListing {
    pub fn id(&self) -> &str {
        &self.listing.listing.id
    }

    pub fn is_featured(&self) -> bool {
        self.listing.is_featured
    }
}

fn finite_or_null<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if value.is_finite() {
        serializer.serialize_some(value)
    } else {
        serializer.serialize_none()
    }
}

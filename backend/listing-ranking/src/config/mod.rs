use crate::models::GeoPoint;
use crate::services::ranking::{BoostConfig, ScoreWeights};
use chrono::FixedOffset;
use serde::Deserialize;
use std::env;
use thiserror::Error;

const ENV_PREFIX: &str = "RANKING_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read ranking environment: {0}")]
    Env(#[from] envy::Error),

    #[error("{name} must be a non-negative finite number, got {value}")]
    InvalidMagnitude { name: &'static str, value: f64 },

    #[error("Fallback location ({lat}, {lng}) is not a valid coordinate")]
    InvalidLocation { lat: f64, lng: f64 },

    #[error("Rotation period must be between 1 and 24 hours, got {0}")]
    InvalidRotationPeriod(u32),

    #[error("New listing window must be between 1 and 36500 days, got {0}")]
    InvalidNewListingWindow(i64),

    #[error("UTC offset of {0} minutes is out of range")]
    InvalidUtcOffset(i32),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub ranking: RankingConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service_name: String,
}

/// Everything tunable about listing ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankingConfig {
    pub weights: ScoreWeights,
    pub boosts: BoostConfig,
    pub rotation: RotationConfig,
    /// Output positions reserved for featured listings
    pub featured_slots: Vec<usize>,
    /// Viewer position assumed when the viewer shares none
    pub fallback_location: GeoPoint,
    /// Listings younger than this are "new"
    pub new_listing_days: i64,
    /// Plan tiers that make a listing featured (lowercase)
    pub paid_tiers: Vec<String>,
    /// Local offset used to build `now` for viewers (Brasília by default)
    pub utc_offset_minutes: i32,
}

/// Hourly tie rotation among near-equal listings
#[derive(Debug, Clone, PartialEq)]
pub struct RotationConfig {
    /// Jitter is drawn from `[0, jitter_magnitude)`
    pub jitter_magnitude: f64,
    /// Bucket width; the jitter reseeds when the bucket changes
    pub period_hours: u32,
    /// Prefixed to the hash key when non-empty
    pub salt: String,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            jitter_magnitude: 10.0,
            period_hours: 1,
            salt: String::new(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            boosts: BoostConfig::default(),
            rotation: RotationConfig::default(),
            featured_slots: default_featured_slots(),
            fallback_location: GeoPoint::new(
                default_fallback_latitude(),
                default_fallback_longitude(),
            ),
            new_listing_days: default_new_listing_days(),
            paid_tiers: default_paid_tiers(),
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

/// Flat `RANKING_*` view of [`RankingConfig`]
#[derive(Debug, Deserialize)]
struct RankingEnv {
    #[serde(default = "default_weight_proximity")]
    weight_proximity: f64,
    #[serde(default = "default_weight_delivery")]
    weight_delivery: f64,
    #[serde(default = "default_weight_sla")]
    weight_sla: f64,
    #[serde(default = "default_weight_rating")]
    weight_rating: f64,
    #[serde(default = "default_weight_promotion")]
    weight_promotion: f64,

    #[serde(default = "default_featured_boost")]
    featured_boost: f64,
    #[serde(default = "default_sponsored_boost")]
    sponsored_boost: f64,
    #[serde(default = "default_open_boost")]
    open_boost: f64,
    #[serde(default = "default_closed_penalty")]
    closed_penalty: f64,
    #[serde(default = "default_new_listing_bonus")]
    new_listing_bonus: f64,

    #[serde(default = "default_jitter_magnitude")]
    jitter_magnitude: f64,
    #[serde(default = "default_rotation_period_hours")]
    rotation_period_hours: u32,
    #[serde(default)]
    rotation_salt: String,

    #[serde(default = "default_featured_slots")]
    featured_slots: Vec<usize>,
    #[serde(default = "default_fallback_latitude")]
    fallback_latitude: f64,
    #[serde(default = "default_fallback_longitude")]
    fallback_longitude: f64,
    #[serde(default = "default_new_listing_days")]
    new_listing_days: i64,
    #[serde(default = "default_paid_tiers")]
    paid_tiers: Vec<String>,
    #[serde(default = "default_utc_offset_minutes")]
    utc_offset_minutes: i32,
}

fn default_weight_proximity() -> f64 {
    ScoreWeights::default().proximity
}

fn default_weight_delivery() -> f64 {
    ScoreWeights::default().delivery_speed
}

fn default_weight_sla() -> f64 {
    ScoreWeights::default().sla
}

fn default_weight_rating() -> f64 {
    ScoreWeights::default().rating
}

fn default_weight_promotion() -> f64 {
    ScoreWeights::default().promotion
}

fn default_featured_boost() -> f64 {
    BoostConfig::default().featured
}

fn default_sponsored_boost() -> f64 {
    BoostConfig::default().sponsored
}

fn default_open_boost() -> f64 {
    BoostConfig::default().open
}

fn default_closed_penalty() -> f64 {
    BoostConfig::default().closed_penalty
}

fn default_new_listing_bonus() -> f64 {
    BoostConfig::default().new_listing
}

fn default_jitter_magnitude() -> f64 {
    RotationConfig::default().jitter_magnitude
}

fn default_rotation_period_hours() -> u32 {
    RotationConfig::default().period_hours
}

fn default_featured_slots() -> Vec<usize> {
    vec![0, 3, 7]
}

fn default_fallback_latitude() -> f64 {
    -22.8269
}

fn default_fallback_longitude() -> f64 {
    -43.0539
}

fn default_new_listing_days() -> i64 {
    90
}

fn default_paid_tiers() -> Vec<String> {
    vec!["premium".to_string(), "pro".to_string(), "destaque".to_string()]
}

fn default_utc_offset_minutes() -> i32 {
    -180
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            service: ServiceConfig {
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "listing-ranking".to_string()),
            },
            ranking: RankingConfig::from_vars(env::vars())?,
        })
    }
}

impl RankingConfig {
    /// Build from `RANKING_*` pairs; unset keys keep their defaults
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let raw: RankingEnv = envy::prefixed(ENV_PREFIX).from_iter(vars)?;

        let config = RankingConfig {
            weights: ScoreWeights {
                proximity: raw.weight_proximity,
                delivery_speed: raw.weight_delivery,
                sla: raw.weight_sla,
                rating: raw.weight_rating,
                promotion: raw.weight_promotion,
            },
            boosts: BoostConfig {
                featured: raw.featured_boost,
                sponsored: raw.sponsored_boost,
                open: raw.open_boost,
                closed_penalty: raw.closed_penalty,
                new_listing: raw.new_listing_bonus,
            },
            rotation: RotationConfig {
                jitter_magnitude: raw.jitter_magnitude,
                period_hours: raw.rotation_period_hours,
                salt: raw.rotation_salt,
            },
            featured_slots: raw.featured_slots,
            fallback_location: GeoPoint::new(raw.fallback_latitude, raw.fallback_longitude),
            new_listing_days: raw.new_listing_days,
            paid_tiers: raw
                .paid_tiers
                .iter()
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            utc_offset_minutes: raw.utc_offset_minutes,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let magnitudes = [
            ("weight_proximity", self.weights.proximity),
            ("weight_delivery", self.weights.delivery_speed),
            ("weight_sla", self.weights.sla),
            ("weight_rating", self.weights.rating),
            ("weight_promotion", self.weights.promotion),
            ("featured_boost", self.boosts.featured),
            ("sponsored_boost", self.boosts.sponsored),
            ("open_boost", self.boosts.open),
            ("closed_penalty", self.boosts.closed_penalty),
            ("new_listing_bonus", self.boosts.new_listing),
            ("jitter_magnitude", self.rotation.jitter_magnitude),
        ];
        for (name, value) in magnitudes {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidMagnitude { name, value });
            }
        }

        let GeoPoint { lat, lng } = self.fallback_location;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(ConfigError::InvalidLocation { lat, lng });
        }

        if !(1..=24).contains(&self.rotation.period_hours) {
            return Err(ConfigError::InvalidRotationPeriod(self.rotation.period_hours));
        }

        if !(1..=36_500).contains(&self.new_listing_days) {
            return Err(ConfigError::InvalidNewListingWindow(self.new_listing_days));
        }

        self.utc_offset()?;
        Ok(())
    }

    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::InvalidUtcOffset(self.utc_offset_minutes))
    }
}

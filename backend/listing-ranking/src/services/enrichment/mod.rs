// ============================================
// Enrichment Layer
// ============================================
//
// Derives viewer-relative facts for each raw listing:
// - distance to the viewer (or the fallback reference point)
// - open/closed right now
// - "new" status
// - resolved featured flag (operator flag or paid plan tier)
//
// Open status priority:
// 1. manual override, verbatim
// 2. weekly schedule, when auto scheduling is enabled
// 3. closed

pub mod schedule;

use crate::config::RankingConfig;
use crate::models::{EnrichedListing, GeoPoint, OpenSource, RawListing, ViewerContext};
use crate::utils::{haversine_meters, minutes_since_midnight};
use chrono::{Datelike, Duration};

pub use schedule::{open_by_schedule, parse_clock};

pub struct EnrichmentLayer {
    fallback_location: GeoPoint,
    new_listing_window: Duration,
    /// Lowercase
    paid_tiers: Vec<String>,
}

impl Default for EnrichmentLayer {
    fn default() -> Self {
        Self::new(&RankingConfig::default())
    }
}

impl EnrichmentLayer {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            fallback_location: config.fallback_location,
            new_listing_window: Duration::try_days(config.new_listing_days)
                .unwrap_or(Duration::MAX),
            paid_tiers: config
                .paid_tiers
                .iter()
                .map(|t| t.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn enrich(&self, raw: &RawListing, viewer: &ViewerContext) -> EnrichedListing {
        let (is_open, open_source) = self.resolve_open(raw, viewer);

        EnrichedListing {
            listing: raw.clone(),
            distance_meters: self.distance_meters(raw, viewer),
            is_open,
            open_source,
            is_new: self.is_new(raw, viewer),
            is_featured: self.is_featured(raw),
        }
    }

    pub fn enrich_all(&self, raws: &[RawListing], viewer: &ViewerContext) -> Vec<EnrichedListing> {
        raws.iter().map(|raw| self.enrich(raw, viewer)).collect()
    }

    /// `f64::INFINITY` when the listing is not geocoded
    fn distance_meters(&self, raw: &RawListing, viewer: &ViewerContext) -> f64 {
        let origin = viewer.location.unwrap_or(self.fallback_location);
        raw.coordinates()
            .map(|target| haversine_meters(origin, target))
            .unwrap_or(f64::INFINITY)
    }

    fn resolve_open(&self, raw: &RawListing, viewer: &ViewerContext) -> (bool, OpenSource) {
        if let Some(forced) = raw.manual_open_override {
            return (forced, OpenSource::ManualOverride);
        }

        if raw.auto_schedule_enabled {
            let weekday = viewer.now.weekday().num_days_from_sunday() as u8;
            let minutes = minutes_since_midnight(&viewer.now);
            if open_by_schedule(&raw.id, &raw.schedule, weekday, minutes) {
                return (true, OpenSource::Schedule);
            }
        }

        (false, OpenSource::Closed)
    }

    /// Future creation dates count as new; unknown ones do not
    fn is_new(&self, raw: &RawListing, viewer: &ViewerContext) -> bool {
        raw.created_at
            .map(|created| viewer.now.signed_duration_since(created) < self.new_listing_window)
            .unwrap_or(false)
    }

    fn is_featured(&self, raw: &RawListing) -> bool {
        if raw.featured_flag == Some(true) {
            return true;
        }
        raw.plan_tier
            .as_deref()
            .map(|tier| tier.trim().to_lowercase())
            .is_some_and(|tier| self.paid_tiers.contains(&tier))
    }
}

// ============================================
// Listing Scorer
// ============================================
//
// score = base + business boosts + rotation jitter
//
// base: weighted sum of five 0-100 sub-scores
//   proximity       max(0, 100 - km * 6)
//   delivery speed  max(0, 100 - avg_minutes * 1.5)
//   sla             sla_score
//   rating          rating * 20
//   promotion       100 if featured
//
// Boosts are flat and additive, sized so that business tiers
// (open > closed, featured > organic) are never crossed by relevance.

use crate::config::{RankingConfig, RotationConfig};
use crate::models::{EnrichedListing, ScoreBreakdown, ScoredListing, ViewerContext};
use crate::utils::{hash_to_unit, rotation_bucket};
use tracing::debug;

const PROXIMITY_PENALTY_PER_KM: f64 = 6.0;
const DELIVERY_PENALTY_PER_MINUTE: f64 = 1.5;

const DEFAULT_DELIVERY_MIN_MINUTES: f64 = 30.0;
const DEFAULT_DELIVERY_MAX_MINUTES: f64 = 60.0;
const DEFAULT_SLA_SCORE: f64 = 100.0;
const DEFAULT_RATING: f64 = 5.0;
const MAX_RATING: f64 = 5.0;

/// Weights of the five relevance sub-scores
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub proximity: f64,
    pub delivery_speed: f64,
    pub sla: f64,
    pub rating: f64,
    pub promotion: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            proximity: 0.35,
            delivery_speed: 0.25,
            sla: 0.20,
            rating: 0.15,
            promotion: 0.05,
        }
    }
}

/// Flat score adjustments for business placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoostConfig {
    pub featured: f64,
    pub sponsored: f64,
    pub open: f64,
    /// Subtracted from closed listings
    pub closed_penalty: f64,
    pub new_listing: f64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            featured: 3000.0,
            sponsored: 1500.0,
            open: 5000.0,
            closed_penalty: 1000.0,
            new_listing: 50.0,
        }
    }
}

/// Scoring layer: turns enriched listings into scored ones
#[derive(Debug, Clone)]
pub struct ScoringLayer {
    weights: ScoreWeights,
    boosts: BoostConfig,
    rotation: RotationConfig,
}

impl Default for ScoringLayer {
    fn default() -> Self {
        Self::new(&RankingConfig::default())
    }
}

impl ScoringLayer {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            weights: config.weights,
            boosts: config.boosts,
            rotation: config.rotation.clone(),
        }
    }

    /// Score every listing against the same rotation bucket
    pub fn score_all(
        &self,
        listings: Vec<EnrichedListing>,
        viewer: &ViewerContext,
    ) -> Vec<ScoredListing> {
        let bucket = rotation_bucket(&viewer.now, self.rotation.period_hours);
        listings
            .into_iter()
            .map(|listing| self.score_in_bucket(listing, &bucket))
            .collect()
    }

    pub fn score(&self, listing: EnrichedListing, viewer: &ViewerContext) -> ScoredListing {
        let bucket = rotation_bucket(&viewer.now, self.rotation.period_hours);
        self.score_in_bucket(listing, &bucket)
    }

    fn score_in_bucket(&self, listing: EnrichedListing, bucket: &str) -> ScoredListing {
        let breakdown = self.compute_breakdown(&listing, bucket);
        let score = breakdown.total();

        debug!(
            listing_id = %listing.listing.id,
            base = breakdown.base,
            is_open = listing.is_open,
            open_source = listing.open_source.as_str(),
            is_featured = listing.is_featured,
            jitter = breakdown.jitter,
            score = score,
            "Listing score computed"
        );

        ScoredListing {
            listing,
            score,
            breakdown,
        }
    }

    fn compute_breakdown(&self, listing: &EnrichedListing, bucket: &str) -> ScoreBreakdown {
        let raw = &listing.listing;

        let proximity = proximity_score(listing.distance_km());
        let delivery_speed = delivery_speed_score(
            raw.delivery_time_min_minutes,
            raw.delivery_time_max_minutes,
        );
        let sla = sla_score(raw.sla_score);
        let rating = rating_score(raw.rating);
        let promotion = if listing.is_featured { 100.0 } else { 0.0 };

        let base = self.weights.proximity * proximity
            + self.weights.delivery_speed * delivery_speed
            + self.weights.sla * sla
            + self.weights.rating * rating
            + self.weights.promotion * promotion;

        ScoreBreakdown {
            proximity,
            delivery_speed,
            sla,
            rating,
            promotion,
            base,
            featured_boost: if listing.is_featured {
                self.boosts.featured
            } else {
                0.0
            },
            sponsored_boost: if listing.is_sponsored() {
                self.boosts.sponsored
            } else {
                0.0
            },
            open_adjustment: if listing.is_open {
                self.boosts.open
            } else {
                -self.boosts.closed_penalty
            },
            new_bonus: if listing.is_new {
                self.boosts.new_listing
            } else {
                0.0
            },
            jitter: self.rotation_jitter(&raw.id, bucket),
        }
    }

    /// Deterministic value in `[0, jitter_magnitude)`, stable within a bucket
    fn rotation_jitter(&self, listing_id: &str, bucket: &str) -> f64 {
        let key = if self.rotation.salt.is_empty() {
            format!("{}-{}", listing_id, bucket)
        } else {
            format!("{}:{}-{}", self.rotation.salt, listing_id, bucket)
        };
        hash_to_unit(&key) * self.rotation.jitter_magnitude
    }
}

/// Unknown distance scores zero
fn proximity_score(distance_km: f64) -> f64 {
    if !distance_km.is_finite() {
        return 0.0;
    }
    (100.0 - distance_km * PROXIMITY_PENALTY_PER_KM).max(0.0)
}

fn delivery_speed_score(min_minutes: Option<f64>, max_minutes: Option<f64>) -> f64 {
    let min = positive_or(min_minutes, DEFAULT_DELIVERY_MIN_MINUTES);
    let max = positive_or(max_minutes, DEFAULT_DELIVERY_MAX_MINUTES);
    let avg = (min + max) / 2.0;
    (100.0 - avg * DELIVERY_PENALTY_PER_MINUTE).max(0.0)
}

/// An explicit SLA of 0 is a real measurement, unlike a rating of 0
fn sla_score(sla: Option<f64>) -> f64 {
    sla.filter(|s| s.is_finite())
        .unwrap_or(DEFAULT_SLA_SCORE)
        .clamp(0.0, 100.0)
}

/// Unrated listings (no reviews yet) count as top rated
fn rating_score(rating: Option<f64>) -> f64 {
    positive_or(rating, DEFAULT_RATING).min(MAX_RATING) * 20.0
}

/// Missing, zero, negative or non-finite values fall back to `default`
fn positive_or(value: Option<f64>, default: f64) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OpenSource, RawListing};
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn now(hour: u32, minute: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, hour, minute, 0)
            .unwrap()
    }

    fn enriched(id: &str, distance_km: f64, is_open: bool, is_featured: bool) -> EnrichedListing {
        EnrichedListing {
            listing: RawListing {
                delivery_time_min_minutes: Some(30.0),
                delivery_time_max_minutes: Some(50.0),
                sla_score: Some(100.0),
                rating: Some(5.0),
                ..RawListing::new(id)
            },
            distance_meters: distance_km * 1000.0,
            is_open,
            open_source: if is_open {
                OpenSource::Schedule
            } else {
                OpenSource::Closed
            },
            is_new: false,
            is_featured,
        }
    }

    #[test]
    fn test_sub_scores() {
        assert!((proximity_score(0.0) - 100.0).abs() < 1e-9);
        assert!((proximity_score(1.0) - 94.0).abs() < 1e-9);
        assert_eq!(proximity_score(20.0), 0.0);
        assert_eq!(proximity_score(f64::INFINITY), 0.0);

        // Defaults 30/60 => avg 45 => 100 - 67.5
        assert!((delivery_speed_score(None, None) - 32.5).abs() < 1e-9);
        assert!((delivery_speed_score(Some(20.0), Some(40.0)) - 55.0).abs() < 1e-9);
        assert!((delivery_speed_score(Some(0.0), Some(f64::NAN)) - 32.5).abs() < 1e-9);
        assert_eq!(delivery_speed_score(Some(90.0), Some(120.0)), 0.0);

        assert_eq!(sla_score(None), 100.0);
        assert_eq!(sla_score(Some(0.0)), 0.0);
        assert_eq!(sla_score(Some(250.0)), 100.0);

        assert_eq!(rating_score(None), 100.0);
        assert_eq!(rating_score(Some(0.0)), 100.0);
        assert!((rating_score(Some(4.5)) - 90.0).abs() < 1e-9);
        assert_eq!(rating_score(Some(9.0)), 100.0);
    }

    #[test]
    fn test_base_score_weights() {
        let layer = ScoringLayer::default();
        let viewer = ViewerContext::at(now(10, 0));

        // distance 0, avg delivery 40, sla 100, rating 5, not featured
        let scored = layer.score(enriched("a", 0.0, true, false), &viewer);
        let expected_base = 0.35 * 100.0 + 0.25 * 40.0 + 0.20 * 100.0 + 0.15 * 100.0;
        assert!((scored.breakdown.base - expected_base).abs() < 1e-9);
        assert!((scored.breakdown.open_adjustment - 5000.0).abs() < 1e-9);
        assert_eq!(scored.breakdown.featured_boost, 0.0);
        assert!((scored.score - scored.breakdown.total()).abs() < 1e-9);
    }

    #[test]
    fn test_boosts_are_additive() {
        let layer = ScoringLayer::default();
        let viewer = ViewerContext::at(now(10, 0));

        let mut listing = enriched("a", 2.0, false, true);
        listing.is_new = true;
        listing.listing.sponsored_flag = Some(true);

        let b = layer.score(listing, &viewer).breakdown;
        assert_eq!(b.featured_boost, 3000.0);
        assert_eq!(b.sponsored_boost, 1500.0);
        assert_eq!(b.open_adjustment, -1000.0);
        assert_eq!(b.new_bonus, 50.0);
        assert_eq!(b.promotion, 100.0);
    }

    #[test]
    fn test_jitter_is_bounded_and_stable_within_hour() {
        let layer = ScoringLayer::default();

        for id in ["a", "b", "pharmacy-42", "ççç"] {
            let early = layer.score(enriched(id, 1.0, true, true), &ViewerContext::at(now(14, 1)));
            let late = layer.score(enriched(id, 1.0, true, true), &ViewerContext::at(now(14, 59)));

            assert!((0.0..10.0).contains(&early.breakdown.jitter));
            assert_eq!(early.breakdown.jitter, late.breakdown.jitter);
            assert_eq!(early.score, late.score);
        }
    }

    #[test]
    fn test_jitter_key_matches_rotation_bucket() {
        let layer = ScoringLayer::default();
        let scored = layer.score(enriched("ph-7", 1.0, true, false), &ViewerContext::at(now(9, 30)));

        let expected = hash_to_unit("ph-7-2026-10-19-9") * 10.0;
        assert!((scored.breakdown.jitter - expected).abs() < 1e-12);
    }

    #[test]
    fn test_salt_changes_jitter() {
        let config = RankingConfig {
            rotation: RotationConfig {
                salt: "experiment-b".to_string(),
                ..RotationConfig::default()
            },
            ..RankingConfig::default()
        };
        let salted = ScoringLayer::new(&config);
        let plain = ScoringLayer::default();
        let viewer = ViewerContext::at(now(9, 30));

        let a = salted.score(enriched("ph-7", 1.0, true, false), &viewer);
        let b = plain.score(enriched("ph-7", 1.0, true, false), &viewer);

        let expected = hash_to_unit("experiment-b:ph-7-2026-10-19-9") * 10.0;
        assert!((a.breakdown.jitter - expected).abs() < 1e-12);
        assert_ne!(a.breakdown.jitter, b.breakdown.jitter);
    }

    #[test]
    fn test_zero_jitter_magnitude() {
        let config = RankingConfig {
            rotation: RotationConfig {
                jitter_magnitude: 0.0,
                ..RotationConfig::default()
            },
            ..RankingConfig::default()
        };
        let layer = ScoringLayer::new(&config);
        let scored = layer.score(enriched("a", 1.0, true, false), &ViewerContext::at(now(9, 0)));
        assert_eq!(scored.breakdown.jitter, 0.0);
    }

    #[test]
    fn test_custom_weights() {
        let config = RankingConfig {
            weights: ScoreWeights {
                proximity: 1.0,
                delivery_speed: 0.0,
                sla: 0.0,
                rating: 0.0,
                promotion: 0.0,
            },
            ..RankingConfig::default()
        };
        let layer = ScoringLayer::new(&config);
        let scored = layer.score(enriched("a", 5.0, true, false), &ViewerContext::at(now(9, 0)));
        assert!((scored.breakdown.base - 70.0).abs() < 1e-9);
    }
}

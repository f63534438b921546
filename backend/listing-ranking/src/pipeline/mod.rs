use crate::config::RankingConfig;
use crate::models::{EnrichedListing, RawListing, ScoredListing, ViewerContext};
use crate::services::{EnrichmentLayer, ScoringLayer, TieredInterleaver};
use tracing::info;

/// Storefront ranking: enrichment → scoring → interleaving.
///
/// Pure and synchronous; one pipeline can serve any number of concurrent
/// callers. `now` comes from the viewer, never from the wall clock.
pub struct RankingPipeline {
    enrichment_layer: EnrichmentLayer,
    scoring_layer: ScoringLayer,
    interleaver: TieredInterleaver,
}

impl Default for RankingPipeline {
    fn default() -> Self {
        Self::new(&RankingConfig::default())
    }
}

impl RankingPipeline {
    pub fn new(config: &RankingConfig) -> Self {
        Self {
            enrichment_layer: EnrichmentLayer::new(config),
            scoring_layer: ScoringLayer::new(config),
            interleaver: TieredInterleaver::new(config.featured_slots.iter().copied()),
        }
    }

    /// Ranked storefront list
    pub fn rank(&self, listings: &[RawListing], viewer: &ViewerContext) -> Vec<ScoredListing> {
        if listings.is_empty() {
            return Vec::new();
        }

        // 1. Enrichment
        let enriched = self.enrichment_layer.enrich_all(listings, viewer);

        // 2. Scoring
        let scored = self.scoring_layer.score_all(enriched, viewer);
        let featured_count = scored.iter().filter(|s| s.is_featured()).count();

        // 3. Interleaving
        let ordered = self.interleaver.order(scored);

        info!(
            input_count = listings.len(),
            featured_count = featured_count,
            organic_count = ordered.len() - featured_count,
            "Listing ranking completed"
        );

        ordered
    }

    /// Nearest first; listings without coordinates go last in input order
    pub fn nearby(&self, listings: &[RawListing], viewer: &ViewerContext) -> Vec<EnrichedListing> {
        let mut enriched = self.enrichment_layer.enrich_all(listings, viewer);
        enriched.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
        enriched
    }
}

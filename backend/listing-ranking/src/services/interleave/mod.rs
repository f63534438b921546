use crate::models::ScoredListing;
use std::collections::BTreeSet;

/// Tiered Interleaver - sponsored/organic merge
///
/// Featured listings take the reserved output positions, organic listings fill
/// the rest. When either pool runs dry the other supplies every remaining
/// position, so the output always has exactly as many items as the input.
pub struct TieredInterleaver {
    featured_slots: BTreeSet<usize>,
}

impl Default for TieredInterleaver {
    fn default() -> Self {
        Self::new([0, 3, 7])
    }
}

impl TieredInterleaver {
    pub fn new(featured_slots: impl IntoIterator<Item = usize>) -> Self {
        Self {
            featured_slots: featured_slots.into_iter().collect(),
        }
    }

    pub fn is_reserved(&self, position: usize) -> bool {
        self.featured_slots.contains(&position)
    }

    /// Split into featured/organic pools, sort each by score (descending,
    /// input order on ties) and merge them by slot.
    pub fn order(&self, scored: Vec<ScoredListing>) -> Vec<ScoredListing> {
        let total = scored.len();
        let (mut featured, mut organic): (Vec<_>, Vec<_>) =
            scored.into_iter().partition(ScoredListing::is_featured);

        sort_by_score_desc(&mut featured);
        sort_by_score_desc(&mut organic);

        let mut featured = featured.into_iter().peekable();
        let mut organic = organic.into_iter().peekable();
        let mut ordered = Vec::with_capacity(total);

        for position in 0..total {
            let take_featured = if self.is_reserved(position) {
                featured.peek().is_some()
            } else {
                organic.peek().is_none()
            };

            let next = if take_featured {
                featured.next()
            } else {
                organic.next()
            };
            ordered.extend(next);
        }

        ordered
    }
}

/// Stable, so equal scores keep their input order
fn sort_by_score_desc(listings: &mut [ScoredListing]) {
    listings.sort_by(|a, b| b.score.total_cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EnrichedListing, OpenSource, RawListing, ScoreBreakdown};

    fn scored(id: &str, score: f64, is_featured: bool) -> ScoredListing {
        ScoredListing {
            listing: EnrichedListing {
                listing: RawListing::new(id),
                distance_meters: 1000.0,
                is_open: true,
                open_source: OpenSource::ManualOverride,
                is_new: false,
                is_featured,
            },
            score,
            breakdown: ScoreBreakdown::default(),
        }
    }

    fn ids(listings: &[ScoredListing]) -> Vec<&str> {
        listings.iter().map(ScoredListing::id).collect()
    }

    #[test]
    fn test_featured_take_reserved_slots() {
        let interleaver = TieredInterleaver::default();

        let input = vec![
            scored("o1", 90.0, false),
            scored("o2", 80.0, false),
            scored("f1", 70.0, true),
            scored("o3", 60.0, false),
            scored("f2", 50.0, true),
            scored("o4", 40.0, false),
            scored("o5", 30.0, false),
            scored("o6", 20.0, false),
            scored("f3", 10.0, true),
            scored("o7", 5.0, false),
        ];

        let ordered = interleaver.order(input);

        assert_eq!(
            ids(&ordered),
            vec!["f1", "o1", "o2", "f2", "o3", "o4", "o5", "f3", "o6", "o7"]
        );
    }

    #[test]
    fn test_featured_pool_exhausted() {
        let interleaver = TieredInterleaver::default();

        let input = vec![
            scored("o1", 9.0, false),
            scored("f1", 1.0, true),
            scored("o2", 8.0, false),
            scored("o3", 7.0, false),
            scored("o4", 6.0, false),
        ];

        let ordered = interleaver.order(input);
        // Slot 3 has no featured listing left, organic fills it
        assert_eq!(ids(&ordered), vec!["f1", "o1", "o2", "o3", "o4"]);
    }

    #[test]
    fn test_organic_pool_exhausted() {
        let interleaver = TieredInterleaver::default();

        let input = vec![
            scored("f1", 9.0, true),
            scored("o1", 5.0, false),
            scored("f2", 8.0, true),
            scored("f3", 7.0, true),
        ];

        let ordered = interleaver.order(input);
        assert_eq!(ids(&ordered), vec!["f1", "o1", "f2", "f3"]);
    }

    #[test]
    fn test_all_organic() {
        let interleaver = TieredInterleaver::default();
        let input = vec![
            scored("a", 1.0, false),
            scored("b", 3.0, false),
            scored("c", 2.0, false),
        ];
        assert_eq!(ids(&interleaver.order(input)), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_all_featured() {
        let interleaver = TieredInterleaver::default();
        let input: Vec<_> = (0..9)
            .map(|i| scored(&format!("f{}", i), i as f64, true))
            .collect();

        let ordered = interleaver.order(input);
        assert_eq!(ordered.len(), 9);
        assert_eq!(ordered[0].id(), "f8");
        assert_eq!(ordered[8].id(), "f0");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let interleaver = TieredInterleaver::new([]);
        let input = vec![
            scored("a", 5.0, false),
            scored("b", 5.0, false),
            scored("c", 7.0, false),
            scored("d", 5.0, false),
        ];
        assert_eq!(ids(&interleaver.order(input)), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_custom_slots() {
        let interleaver = TieredInterleaver::new([1, 2]);
        let input = vec![
            scored("o1", 2.0, false),
            scored("o2", 1.0, false),
            scored("f1", 2.0, true),
            scored("f2", 1.0, true),
        ];
        assert_eq!(ids(&interleaver.order(input)), vec!["o1", "f1", "f2", "o2"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(TieredInterleaver::default().order(Vec::new()).is_empty());
    }
}

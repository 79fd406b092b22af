use crate::core::{
    diversity::{apply_diversity_caps, CapStats},
    dispensaries::DISPENSARIES,
    filters::{matches_filter, matches_search, tokenize_query, DealFilter},
    normalize::{apply_save_counts, normalize_all, normalize_for_search, normalize_product},
    personalization::rank_deals,
};
use crate::models::{
    Deal, DispensarySummary, DiversityCaps, PersonalizedDeal, RawProduct, ScoringWeights,
    UserPreferences,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Result of building a feed
#[derive(Debug)]
pub struct FeedResult {
    pub deals: Vec<Deal>,
    pub total_rows: usize,
    pub dropped_rows: usize,
    pub capped: CapStats,
}

/// Deal feed orchestrator
///
/// # Pipeline Stages
/// 1. Normalize rows, dropping unusable ones
/// 2. Merge save counts
/// 3. Apply user filters
/// 4. Order by deal score
/// 5. Diversity caps
/// 6. Truncate
#[derive(Debug, Clone)]
pub struct DealFeed {
    caps: DiversityCaps,
    weights: ScoringWeights,
}

impl DealFeed {
    pub fn new(caps: DiversityCaps, weights: ScoringWeights) -> Self {
        Self { caps, weights }
    }

    pub fn with_defaults() -> Self {
        Self {
            caps: DiversityCaps::default(),
            weights: ScoringWeights::default(),
        }
    }

    pub fn caps(&self) -> &DiversityCaps {
        &self.caps
    }

    /// Normalize rows into deals without capping; used for lookups
    pub fn catalog(&self, rows: &[RawProduct], save_counts: &HashMap<String, u32>) -> Vec<Deal> {
        let (mut deals, _) = normalize_all(rows, normalize_product);
        apply_save_counts(&mut deals, save_counts);
        deals
    }

    /// Build the capped, filtered feed
    pub fn build_feed(
        &self,
        rows: &[RawProduct],
        save_counts: &HashMap<String, u32>,
        filter: &DealFilter,
        limit: usize,
    ) -> FeedResult {
        let total_rows = rows.len();
        let (mut deals, dropped_rows) = normalize_all(rows, normalize_product);
        apply_save_counts(&mut deals, save_counts);

        let filtered: Vec<Deal> = deals
            .into_iter()
            .filter(|deal| matches_filter(deal, filter))
            .collect();

        let (mut capped_deals, capped) = apply_diversity_caps(filtered, &self.caps);
        capped_deals.truncate(limit);

        FeedResult {
            deals: capped_deals,
            total_rows,
            dropped_rows,
            capped,
        }
    }

    /// Free-text search, ordered by deal score. Not diversity capped.
    pub fn search(&self, rows: &[RawProduct], query: &str, limit: usize) -> Vec<Deal> {
        let tokens = tokenize_query(query);
        let (deals, _) = normalize_all(rows, normalize_for_search);

        let mut results: Vec<Deal> = deals
            .into_iter()
            .filter(|deal| matches_search(deal, &tokens))
            .collect();

        results.sort_by(|a, b| {
            b.deal_score
                .partial_cmp(&a.deal_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);
        results
    }

    /// Re-rank deals for one user
    pub fn personalize(
        &self,
        deals: Vec<Deal>,
        prefs: &UserPreferences,
        now: DateTime<Utc>,
    ) -> Vec<PersonalizedDeal> {
        rank_deals(deals, prefs, &self.weights, now)
    }

    /// Reference dispensaries with live deal counts, followed by any
    /// dispensary that has deals but isn't in the reference list
    pub fn dispensary_summaries(deals: &[Deal]) -> Vec<DispensarySummary> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for deal in deals {
            *counts.entry(deal.dispensary.id.as_str()).or_insert(0) += 1;
        }

        let mut summaries: Vec<DispensarySummary> = DISPENSARIES
            .iter()
            .map(|known| DispensarySummary {
                dispensary: known.to_ref(),
                deal_count: counts.get(known.id).copied().unwrap_or(0),
            })
            .collect();

        let mut seen: Vec<&str> = DISPENSARIES.iter().map(|d| d.id).collect();
        for deal in deals {
            let id = deal.dispensary.id.as_str();
            if !seen.contains(&id) {
                seen.push(id);
                summaries.push(DispensarySummary {
                    dispensary: deal.dispensary.clone(),
                    deal_count: counts.get(id).copied().unwrap_or(0),
                });
            }
        }

        summaries
    }
}

impl Default for DealFeed {
    fn default() -> Self {
        Self::with_defaults()
    }
}

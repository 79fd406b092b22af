use crate::core::dispensaries::chain_key;
use crate::models::{Category, Deal, DiversityCaps};
use std::collections::HashMap;

/// Why deals were turned away by the diversity filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapStats {
    pub admitted: usize,
    pub rejected_dispensary: usize,
    pub rejected_chain: usize,
    pub rejected_brand: usize,
}

impl CapStats {
    pub fn rejected(&self) -> usize {
        self.rejected_dispensary + self.rejected_chain + self.rejected_brand
    }
}

#[inline]
fn under(count: usize, cap: usize) -> bool {
    cap == 0 || count < cap
}

/// Bound how many deals from one dispensary, chain or brand share a feed.
///
/// Greedy single pass in `deal_score`-descending order; equal scores keep
/// their input order. Every distinct dispensary gets at least one slot even
/// when its chain is already full.
pub fn apply_diversity_caps(deals: Vec<Deal>, caps: &DiversityCaps) -> (Vec<Deal>, CapStats) {
    let mut deals = deals;
    deals.sort_by(|a, b| {
        b.deal_score
            .partial_cmp(&a.deal_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut per_dispensary: HashMap<String, usize> = HashMap::new();
    let mut per_chain: HashMap<String, usize> = HashMap::new();
    let mut per_brand: HashMap<String, usize> = HashMap::new();
    let mut per_brand_category: HashMap<(String, Category), usize> = HashMap::new();
    let mut stats = CapStats::default();

    let admitted: Vec<Deal> = deals
        .into_iter()
        .filter(|deal| {
            let dispensary_count = per_dispensary.get(&deal.dispensary.id).copied().unwrap_or(0);
            if !under(dispensary_count, caps.per_dispensary) {
                stats.rejected_dispensary += 1;
                return false;
            }

            let chain = chain_key(&deal.dispensary);
            let chain_count = per_chain.get(&chain).copied().unwrap_or(0);
            if dispensary_count > 0 && !under(chain_count, caps.per_chain) {
                stats.rejected_chain += 1;
                return false;
            }

            let brand = deal.brand.to_lowercase();
            let brand_count = per_brand.get(&brand).copied().unwrap_or(0);
            let brand_category_key = (brand.clone(), deal.category);
            let brand_category_count = per_brand_category
                .get(&brand_category_key)
                .copied()
                .unwrap_or(0);
            if !under(brand_category_count, caps.per_brand_per_category)
                || !under(brand_count, caps.per_brand_total)
            {
                stats.rejected_brand += 1;
                return false;
            }

            *per_dispensary.entry(deal.dispensary.id.clone()).or_insert(0) += 1;
            *per_chain.entry(chain).or_insert(0) += 1;
            *per_brand.entry(brand).or_insert(0) += 1;
            *per_brand_category.entry(brand_category_key).or_insert(0) += 1;
            stats.admitted += 1;
            true
        })
        .collect();

    tracing::debug!(
        "Diversity caps admitted {} deals (dispensary: -{}, chain: -{}, brand: -{})",
        stats.admitted,
        stats.rejected_dispensary,
        stats.rejected_chain,
        stats.rejected_brand
    );

    (admitted, stats)
}

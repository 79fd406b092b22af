use crate::models::{
    Category, Deal, PersonalizedDeal, PriceRange, ScoreReason, ScoringWeights, UserPreferences,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Saves needed before preferences are derived from history
pub const MIN_SAVES_FOR_PREFERENCES: usize = 5;

/// Discount threshold assumed when nothing is known
pub const DEFAULT_DISCOUNT_THRESHOLD: f64 = 20.0;

/// Saves at which the popularity factor maxes out
const POPULARITY_SATURATION: f64 = 20.0;

/// Hours over which the recency factor decays by 1/e
const RECENCY_DECAY_HOURS: f64 = 24.0;

impl UserPreferences {
    /// Uniform preferences for users without enough history
    pub fn cold_start() -> Self {
        let ratio = 1.0 / Category::ALL.len() as f64;
        Self {
            category_ratios: Category::ALL.iter().map(|c| (*c, ratio)).collect(),
            price_range: None,
            discount_threshold: DEFAULT_DISCOUNT_THRESHOLD,
            brand_affinity: HashMap::new(),
            dispensary_affinity: HashMap::new(),
            sample_size: 0,
            is_cold_start: true,
        }
    }
}

/// Derive preferences from the deals a user saved
pub fn derive_preferences(saved: &[Deal]) -> UserPreferences {
    if saved.len() < MIN_SAVES_FOR_PREFERENCES {
        return UserPreferences {
            sample_size: saved.len(),
            ..UserPreferences::cold_start()
        };
    }

    let total = saved.len() as f64;

    let mut category_counts: HashMap<Category, usize> = HashMap::new();
    let mut brand_counts: HashMap<String, usize> = HashMap::new();
    let mut dispensary_counts: HashMap<String, usize> = HashMap::new();
    for deal in saved {
        *category_counts.entry(deal.category).or_insert(0) += 1;
        *brand_counts.entry(deal.brand.to_lowercase()).or_insert(0) += 1;
        *dispensary_counts.entry(deal.dispensary.id.clone()).or_insert(0) += 1;
    }

    let category_ratios = category_counts
        .into_iter()
        .map(|(c, n)| (c, n as f64 / total))
        .collect();

    let mut prices: Vec<f64> = saved.iter().map(|d| d.deal_price).collect();
    prices.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let price_range = Some(PriceRange {
        min: percentile(&prices, 10.0),
        max: percentile(&prices, 90.0),
    });

    let discounts: Vec<f64> = saved.iter().filter_map(|d| d.discount_percent).collect();
    let discount_threshold = if discounts.is_empty() {
        DEFAULT_DISCOUNT_THRESHOLD
    } else {
        discounts.iter().sum::<f64>() / discounts.len() as f64
    };

    UserPreferences {
        category_ratios,
        price_range,
        discount_threshold,
        brand_affinity: normalize_counts(brand_counts),
        dispensary_affinity: normalize_counts(dispensary_counts),
        sample_size: saved.len(),
        is_cold_start: false,
    }
}

/// Nearest-rank percentile over sorted values
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Scale counts so the most frequent key is 1.0
fn normalize_counts(counts: HashMap<String, usize>) -> HashMap<String, f64> {
    let max = counts.values().copied().max().unwrap_or(0);
    if max == 0 {
        return HashMap::new();
    }
    counts
        .into_iter()
        .map(|(k, n)| (k, n as f64 / max as f64))
        .collect()
}

/// Score a deal (0-100) for a user and report the factor that contributed most
pub fn score_deal(
    deal: &Deal,
    prefs: &UserPreferences,
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> (f64, Option<ScoreReason>) {
    let contributions = [
        (ScoreReason::Category, weights.category * category_score(deal.category, prefs)),
        (ScoreReason::PriceRange, weights.price * price_score(deal.deal_price, prefs.price_range)),
        (
            ScoreReason::Discount,
            weights.discount * discount_score(deal.discount_percent, prefs.discount_threshold),
        ),
        (
            ScoreReason::Brand,
            weights.brand * prefs.brand_affinity.get(&deal.brand.to_lowercase()).copied().unwrap_or(0.0),
        ),
        (
            ScoreReason::Dispensary,
            weights.dispensary
                * prefs.dispensary_affinity.get(&deal.dispensary.id).copied().unwrap_or(0.0),
        ),
        (ScoreReason::Recency, weights.recency * recency_score(deal.first_seen_at, now)),
        (ScoreReason::Popularity, weights.popularity * popularity_score(deal.save_count)),
    ];

    let total: f64 = contributions.iter().map(|(_, points)| points).sum();

    // First factor wins ties
    let reason = contributions
        .iter()
        .fold(None::<(ScoreReason, f64)>, |best, &(reason, points)| match best {
            Some((_, best_points)) if best_points >= points => best,
            _ if points > 0.0 => Some((reason, points)),
            _ => best,
        })
        .map(|(reason, _)| reason);

    (total.clamp(0.0, 100.0), reason)
}

/// Category ratio relative to the user's favourite category (0-1)
#[inline]
fn category_score(category: Category, prefs: &UserPreferences) -> f64 {
    let max = prefs.category_ratios.values().copied().fold(0.0, f64::max);
    if max <= 0.0 {
        return 0.0;
    }
    prefs.category_ratios.get(&category).copied().unwrap_or(0.0) / max
}

/// 1 inside the range, falling linearly to 0 one range-width outside it
#[inline]
fn price_score(price: f64, range: Option<PriceRange>) -> f64 {
    let Some(range) = range else {
        return 1.0;
    };

    if price >= range.min && price <= range.max {
        return 1.0;
    }

    let mut width = range.max - range.min;
    if width <= 0.0 {
        // Every saved deal had the same price
        width = (range.max * 0.25).max(1.0);
    }
    let distance = if price < range.min {
        range.min - price
    } else {
        price - range.max
    };

    (1.0 - distance / width).max(0.0)
}

/// 1 at or above the usual discount, proportional below it
#[inline]
fn discount_score(discount: Option<f64>, threshold: f64) -> f64 {
    let discount = discount.unwrap_or(0.0);
    if threshold <= 0.0 || discount >= threshold {
        return 1.0;
    }
    (discount / threshold).max(0.0)
}

/// Exponential decay on how long the deal has been listed
#[inline]
fn recency_score(first_seen_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(seen) = first_seen_at else {
        return 0.0;
    };
    let age_hours = (now - seen).num_minutes().max(0) as f64 / 60.0;
    (-age_hours / RECENCY_DECAY_HOURS).exp()
}

#[inline]
fn popularity_score(save_count: u32) -> f64 {
    (save_count as f64).min(POPULARITY_SATURATION) / POPULARITY_SATURATION
}

/// Score every deal and order by personal score, then by deal score
pub fn rank_deals(
    deals: Vec<Deal>,
    prefs: &UserPreferences,
    weights: &ScoringWeights,
    now: DateTime<Utc>,
) -> Vec<PersonalizedDeal> {
    let mut ranked: Vec<PersonalizedDeal> = deals
        .into_iter()
        .map(|deal| {
            let (score, reason) = score_deal(&deal, prefs, weights, now);
            PersonalizedDeal {
                deal,
                personal_score: score,
                reason,
                reason_label: reason.map(|r| r.label().to_string()),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.personal_score
            .partial_cmp(&a.personal_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                b.deal
                    .deal_score
                    .partial_cmp(&a.deal.deal_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    });

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DispensaryRef;
    use chrono::Duration;

    fn create_test_deal(id: &str, category: Category, brand: &str, price: f64, dispensary: &str) -> Deal {
        Deal {
            id: id.to_string(),
            name: format!("Deal {}", id),
            brand: brand.to_string(),
            category,
            weight: None,
            original_price: Some(price * 1.5),
            deal_price: price,
            discount_percent: Some(33.0),
            strain_type: None,
            deal_score: 50.0,
            save_count: 0,
            social_proof: None,
            dispensary: DispensaryRef {
                id: dispensary.to_string(),
                name: dispensary.to_string(),
                chain: None,
                address: None,
                zone: None,
            },
            product_url: None,
            first_seen_at: None,
        }
    }

    fn saved_history() -> Vec<Deal> {
        vec![
            create_test_deal("s1", Category::Vape, "STIIIZY", 25.0, "planet13"),
            create_test_deal("s2", Category::Vape, "STIIIZY", 30.0, "planet13"),
            create_test_deal("s3", Category::Vape, "Select", 20.0, "oasis"),
            create_test_deal("s4", Category::Flower, "Cookies", 35.0, "planet13"),
            create_test_deal("s5", Category::Vape, "stiiizy", 28.0, "the-grove"),
        ]
    }

    #[test]
    fn test_cold_start_below_five_saves() {
        let saved = &saved_history()[..4];
        let prefs = derive_preferences(saved);
        assert!(prefs.is_cold_start);
        assert_eq!(prefs.sample_size, 4);
        assert!(prefs.brand_affinity.is_empty());
        assert_eq!(prefs.category_ratios.len(), 5);
        assert!(prefs.category_ratios.values().all(|r| (*r - 0.2).abs() < 1e-9));
    }

    #[test]
    fn test_derived_preferences() {
        let prefs = derive_preferences(&saved_history());

        assert!(!prefs.is_cold_start);
        assert!((prefs.category_ratios[&Category::Vape] - 0.8).abs() < 1e-9);
        assert!((prefs.category_ratios[&Category::Flower] - 0.2).abs() < 1e-9);
        assert_eq!(prefs.brand_affinity["stiiizy"], 1.0);
        assert!((prefs.brand_affinity["select"] - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(prefs.dispensary_affinity["planet13"], 1.0);

        let range = prefs.price_range.expect("price range");
        assert_eq!(range.min, 20.0);
        assert_eq!(range.max, 35.0);
        assert!((prefs.discount_threshold - 33.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_nearest_rank() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(percentile(&values, 10.0), 1.0);
        assert_eq!(percentile(&values, 90.0), 9.0);
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn test_affine_deal_scores_higher() {
        let prefs = derive_preferences(&saved_history());
        let weights = ScoringWeights::default();
        let now = Utc::now();

        let liked = create_test_deal("a", Category::Vape, "STIIIZY", 27.0, "planet13");
        let other = create_test_deal("b", Category::Edible, "Wyld", 80.0, "jardin");

        let (liked_score, liked_reason) = score_deal(&liked, &prefs, &weights, now);
        let (other_score, _) = score_deal(&other, &prefs, &weights, now);

        assert!(liked_score > other_score);
        assert_eq!(liked_reason, Some(ScoreReason::Category));
    }

    #[test]
    fn test_score_clamped() {
        let prefs = derive_preferences(&saved_history());
        let weights = ScoringWeights {
            category: 90.0,
            price: 90.0,
            ..ScoringWeights::default()
        };
        let deal = create_test_deal("a", Category::Vape, "STIIIZY", 27.0, "planet13");
        let (score, _) = score_deal(&deal, &prefs, &weights, Utc::now());
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_recency_decay() {
        let now = Utc::now();
        assert!(recency_score(Some(now), now) > 0.99);
        let day_old = recency_score(Some(now - Duration::hours(24)), now);
        assert!((day_old - (-1.0f64).exp()).abs() < 0.01);
        assert_eq!(recency_score(None, now), 0.0);
    }

    #[test]
    fn test_price_falloff() {
        let range = Some(PriceRange { min: 20.0, max: 40.0 });
        assert_eq!(price_score(30.0, range), 1.0);
        assert!((price_score(50.0, range) - 0.5).abs() < 1e-9);
        assert_eq!(price_score(100.0, range), 0.0);
        assert_eq!(price_score(500.0, None), 1.0);
    }

    #[test]
    fn test_price_falloff_narrow_range() {
        let range = Some(PriceRange { min: 20.0, max: 24.0 });
        assert!((price_score(26.0, range) - 0.5).abs() < 1e-9);
        assert_eq!(price_score(28.0, range), 0.0);
        assert_eq!(price_score(16.0, range), 0.0);

        let weights = ScoringWeights {
            category: 0.0,
            price: 15.0,
            discount: 0.0,
            brand: 0.0,
            dispensary: 0.0,
            recency: 0.0,
            popularity: 0.0,
        };
        let prefs = UserPreferences {
            category_ratios: HashMap::new(),
            price_range: range,
            discount_threshold: 30.0,
            brand_affinity: HashMap::new(),
            dispensary_affinity: HashMap::new(),
            sample_size: 5,
            is_cold_start: false,
        };
        let deal = create_test_deal("a", Category::Vape, "X", 28.0, "d");
        let (score, _) = score_deal(&deal, &prefs, &weights, Utc::now());
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_price_falloff_single_price() {
        let range = Some(PriceRange { min: 40.0, max: 40.0 });
        assert_eq!(price_score(40.0, range), 1.0);
        assert!((price_score(45.0, range) - 0.5).abs() < 1e-9);
        assert_eq!(price_score(50.0, range), 0.0);
    }

    #[test]
    fn test_discount_and_popularity() {
        assert_eq!(discount_score(Some(40.0), 30.0), 1.0);
        assert!((discount_score(Some(15.0), 30.0) - 0.5).abs() < 1e-9);
        assert_eq!(discount_score(None, 30.0), 0.0);
        assert_eq!(popularity_score(40), 1.0);
        assert_eq!(popularity_score(10), 0.5);
    }

    #[test]
    fn test_zero_score_has_no_reason() {
        let prefs = UserPreferences {
            category_ratios: HashMap::new(),
            price_range: Some(PriceRange { min: 10.0, max: 12.0 }),
            discount_threshold: 50.0,
            brand_affinity: HashMap::new(),
            dispensary_affinity: HashMap::new(),
            sample_size: 5,
            is_cold_start: false,
        };
        let mut deal = create_test_deal("a", Category::Vape, "X", 500.0, "d");
        deal.discount_percent = None;
        let (score, reason) = score_deal(&deal, &prefs, &ScoringWeights::default(), Utc::now());
        assert_eq!(score, 0.0);
        assert_eq!(reason, None);
    }

    #[test]
    fn test_rank_deals_orders_by_score() {
        let prefs = derive_preferences(&saved_history());
        let deals = vec![
            create_test_deal("edible", Category::Edible, "Wyld", 80.0, "jardin"),
            create_test_deal("vape", Category::Vape, "STIIIZY", 27.0, "planet13"),
        ];
        let ranked = rank_deals(deals, &prefs, &ScoringWeights::default(), Utc::now());
        assert_eq!(ranked[0].deal.id, "vape");
        assert!(ranked[0].reason_label.is_some());
        assert!(ranked.iter().all(|d| (0.0..=100.0).contains(&d.personal_score)));
    }
}

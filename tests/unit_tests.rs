// Unit tests for Clouded Deals

use chrono::{NaiveDate, TimeZone, Utc};
use clouded_deals::core::{
    badges::{compute_streaks, evaluate_badges, BADGES},
    diversity::apply_diversity_caps,
    filters::{matches_filter, matches_search, tokenize_query, DealFilter},
    normalize::{normalize_for_search, normalize_product, UNKNOWN_BRAND},
    personalization::{derive_preferences, score_deal},
    social::{format_deal_tweet, social_proof_label, TWEET_MAX_CHARS},
    weight::normalize_weight_str,
};
use clouded_deals::models::{
    Category, Deal, DispensaryRef, DiversityCaps, RawProduct, ScoringWeights, UserPreferences,
    UserStats,
};
use serde_json::json;

fn create_test_deal(id: &str, dispensary: &str, brand: &str, score: f64) -> Deal {
    Deal {
        id: id.to_string(),
        name: format!("Deal {}", id),
        brand: brand.to_string(),
        category: Category::Flower,
        weight: Some("3.5g".to_string()),
        original_price: Some(40.0),
        deal_price: 25.0,
        discount_percent: Some(38.0),
        strain_type: Some("hybrid".to_string()),
        deal_score: score,
        save_count: 0,
        social_proof: None,
        dispensary: DispensaryRef {
            id: dispensary.to_string(),
            name: format!("Dispensary {}", dispensary),
            chain: None,
            address: None,
            zone: None,
        },
        product_url: None,
        first_seen_at: None,
    }
}

fn create_test_row(id: &str, name: &str, sale_price: Option<f64>) -> RawProduct {
    RawProduct {
        id: id.to_string(),
        name: Some(name.to_string()),
        sale_price,
        dispensary: Some(json!({"id": "planet13", "name": "Planet 13"})),
        ..Default::default()
    }
}

#[test]
fn test_stiiizy_row_normalizes() {
    let row = RawProduct {
        id: "p1".to_string(),
        name: Some("STIIIZY - Blue Dream 1g Vape".to_string()),
        category: Some("vape".to_string()),
        weight_value: Some(1.0),
        weight_unit: Some("g".to_string()),
        sale_price: Some(25.0),
        dispensary: Some(json!({"id": "planet13", "name": "Planet 13"})),
        ..Default::default()
    };

    let deal = normalize_product(&row).unwrap();
    assert_eq!(deal.weight.as_deref(), Some("1g"));
    assert_eq!(deal.category, Category::Vape);
    assert_eq!(deal.brand, "STIIIZY");
}

#[test]
fn test_half_gram_cart_row_keeps_weight() {
    let row = RawProduct {
        category: Some("vape".to_string()),
        ..create_test_row("p2", "Select - Cart 1/2g", Some(22.0))
    };

    let deal = normalize_product(&row).unwrap();
    assert_eq!(deal.weight.as_deref(), Some("0.5g"));
    assert_eq!(deal.brand, "Select");
}

#[test]
fn test_non_positive_prices_never_survive() {
    for price in [None, Some(0.0), Some(-5.0), Some(f64::NAN), Some(f64::INFINITY)] {
        let row = create_test_row("p", "Blue Dream 3.5g", price);
        assert!(normalize_product(&row).is_none(), "price {:?} should be dropped", price);
    }
    assert!(normalize_product(&create_test_row("p", "Blue Dream 3.5g", Some(0.01))).is_some());
}

#[test]
fn test_malformed_dispensary_join_drops_row() {
    let mut row = create_test_row("p", "Blue Dream", Some(20.0));
    for join in [json!(null), json!("planet13"), json!({"name": "No id"}), json!([])] {
        row.dispensary = Some(join);
        assert!(normalize_product(&row).is_none());
    }

    row.dispensary = Some(json!([{"id": "oasis"}]));
    let deal = normalize_product(&row).unwrap();
    assert_eq!(deal.dispensary.name, "Oasis Cannabis");
}

#[test]
fn test_short_names_never_in_search() {
    let row = create_test_row("p", "OG", Some(10.0));
    assert!(normalize_product(&row).is_some());
    assert!(normalize_for_search(&row).is_none());
}

#[test]
fn test_unknown_brand_fallback() {
    let deal = normalize_product(&create_test_row("p", "Blue Dream 3.5g", Some(20.0))).unwrap();
    assert_eq!(deal.brand, UNKNOWN_BRAND);
}

#[test]
fn test_weight_normalization_idempotent() {
    let cases = [
        ("3.5g", Category::Flower),
        ("1/8 oz", Category::Flower),
        ("0.85 grams", Category::Vape),
        ("100mg", Category::Edible),
        ("0.1g", Category::Edible),
        ("1 oz", Category::Flower),
        ("2.5g", Category::Preroll),
    ];

    for (text, category) in cases {
        let once = normalize_weight_str(text, category).unwrap();
        let twice = normalize_weight_str(&once, category).unwrap();
        assert_eq!(once, twice, "{} ({})", text, category);
    }
}

#[test]
fn test_weight_conversions() {
    assert_eq!(normalize_weight_str("1/8", Category::Flower).as_deref(), Some("3.5g"));
    assert_eq!(normalize_weight_str("1 oz", Category::Flower).as_deref(), Some("28g"));
    assert_eq!(normalize_weight_str("0.1g", Category::Edible).as_deref(), Some("100mg"));
    assert_eq!(normalize_weight_str("500mg", Category::Vape).as_deref(), Some("0.5g"));
    // Nothing sensible near 9g for a vape
    assert_eq!(normalize_weight_str("9g", Category::Vape), None);
}

#[test]
fn test_one_dispensary_cap_keeps_best() {
    let deals: Vec<Deal> = (0..20)
        .map(|i| create_test_deal(&i.to_string(), "planet13", &format!("brand{}", i), i as f64))
        .collect();
    let caps = DiversityCaps {
        per_dispensary: 5,
        ..DiversityCaps::unlimited()
    };

    let (kept, stats) = apply_diversity_caps(deals, &caps);

    assert_eq!(kept.len(), 5);
    let scores: Vec<f64> = kept.iter().map(|d| d.deal_score).collect();
    assert_eq!(scores, vec![19.0, 18.0, 17.0, 16.0, 15.0]);
    assert_eq!(stats.rejected_dispensary, 15);
}

#[test]
fn test_brand_caps_hold_for_any_input() {
    let mut deals = Vec::new();
    for i in 0..30 {
        let mut deal = create_test_deal(&format!("d{}", i), &format!("disp{}", i % 7), "Cookies", 100.0 - i as f64);
        deal.category = Category::ALL[i % Category::ALL.len()];
        if i % 2 == 0 {
            deal.brand = "COOKIES".to_string();
        }
        deals.push(deal);
    }

    let caps = DiversityCaps::default();
    let (kept, _) = apply_diversity_caps(deals, &caps);

    assert_eq!(kept.len(), caps.per_brand_total);
    for category in Category::ALL {
        let in_category = kept.iter().filter(|d| d.category == category).count();
        assert!(in_category <= caps.per_brand_per_category);
    }
}

#[test]
fn test_chain_cap_leaves_one_slot_per_dispensary() {
    let mut deals = Vec::new();
    for (i, dispensary) in ["a", "b", "c"].iter().enumerate() {
        for j in 0..2 {
            let score = 100.0 - (i * 2 + j) as f64;
            let mut deal = create_test_deal(&format!("{}{}", dispensary, j), dispensary, &format!("brand{}{}", i, j), score);
            deal.dispensary.chain = Some("curaleaf".to_string());
            deals.push(deal);
        }
    }

    let caps = DiversityCaps {
        per_chain: 2,
        ..DiversityCaps::unlimited()
    };
    let (kept, stats) = apply_diversity_caps(deals, &caps);

    let ids: Vec<&str> = kept.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["a0", "a1", "b0", "c0"]);
    assert_eq!(stats.rejected_chain, 2);
}

#[test]
fn test_unlimited_caps_keep_everything() {
    let deals: Vec<Deal> = (0..10)
        .map(|i| create_test_deal(&i.to_string(), "planet13", "Same", 50.0))
        .collect();
    let (kept, _) = apply_diversity_caps(deals, &DiversityCaps::unlimited());
    assert_eq!(kept.len(), 10);
    // Equal scores keep their input order
    assert_eq!(kept[0].id, "0");
    assert_eq!(kept[9].id, "9");
}

#[test]
fn test_filter_and_search() {
    let deal = create_test_deal("1", "planet13", "Cookies", 80.0);

    let filter = DealFilter {
        categories: vec![Category::Flower],
        max_price: Some(30.0),
        brand: Some("cookies".to_string()),
        ..Default::default()
    };
    assert!(matches_filter(&deal, &filter));

    let too_cheap = DealFilter {
        max_price: Some(20.0),
        ..Default::default()
    };
    assert!(!matches_filter(&deal, &too_cheap));

    assert!(matches_search(&deal, &tokenize_query("COOKIES flower")));
    assert!(!matches_search(&deal, &tokenize_query("cookies vape")));
}

#[test]
fn test_cold_start_below_five_saves() {
    let saved: Vec<Deal> = (0..4)
        .map(|i| create_test_deal(&i.to_string(), "planet13", "Cookies", 50.0))
        .collect();
    let prefs = derive_preferences(&saved);
    assert!(prefs.is_cold_start);
    assert_eq!(prefs.sample_size, 4);

    let mut saved = saved;
    saved.push(create_test_deal("4", "planet13", "Cookies", 50.0));
    assert!(!derive_preferences(&saved).is_cold_start);
}

#[test]
fn test_personal_score_bounds() {
    let weights = ScoringWeights::default();
    let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();

    let saved: Vec<Deal> = (0..6)
        .map(|i| create_test_deal(&i.to_string(), "planet13", "Cookies", 50.0))
        .collect();
    let warm = derive_preferences(&saved);

    for prefs in [UserPreferences::cold_start(), warm] {
        for (price, saves) in [(1.0, 0), (25.0, 100), (500.0, 3)] {
            let mut deal = create_test_deal("x", "planet13", "Cookies", 90.0);
            deal.deal_price = price;
            deal.save_count = saves;
            deal.first_seen_at = Some(now);
            let (score, _) = score_deal(&deal, &prefs, &weights, now);
            assert!((0.0..=100.0).contains(&score), "score {} out of range", score);
        }
    }
}

#[test]
fn test_preferred_category_scores_higher() {
    let weights = ScoringWeights::default();
    let now = Utc::now();
    let saved: Vec<Deal> = (0..5)
        .map(|i| create_test_deal(&i.to_string(), "planet13", "Cookies", 50.0))
        .collect();
    let prefs = derive_preferences(&saved);

    let flower = create_test_deal("f", "oasis", "Other", 50.0);
    let mut vape = flower.clone();
    vape.category = Category::Vape;

    let (flower_score, _) = score_deal(&flower, &prefs, &weights, now);
    let (vape_score, _) = score_deal(&vape, &prefs, &weights, now);
    assert!(flower_score > vape_score);
}

#[test]
fn test_badge_earned_iff_target_reached() {
    let stats = UserStats {
        total_saves: 10,
        longest_streak_days: 4,
        shares: 0,
        ..Default::default()
    };

    let badges = evaluate_badges(&stats);
    assert_eq!(badges.len(), BADGES.len());
    for badge in &badges {
        assert_eq!(badge.earned, badge.current >= badge.target, "{}", badge.id);
    }

    let earned: Vec<&str> = badges.iter().filter(|b| b.earned).map(|b| b.id.as_str()).collect();
    assert_eq!(earned, vec!["first_save", "deal_hunter", "streak_3"]);
}

#[test]
fn test_streaks() {
    let day = |d: u32| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
    let dates = vec![day(1), day(2), day(3), day(3), day(8), day(9)];

    assert_eq!(compute_streaks(&dates, day(10)), (2, 3));
    assert_eq!(compute_streaks(&dates, day(12)), (0, 3));
    assert_eq!(compute_streaks(&[], day(12)), (0, 0));
}

#[test]
fn test_tweet_fits_limit() {
    let mut deal = create_test_deal("1", "cookies-strip", "Cookies", 90.0);
    deal.name = "Gary Payton ".repeat(40);
    deal.dispensary.name = "Cookies on the Strip".to_string();

    let text = format_deal_tweet(&deal, "https://clouded.deals");
    assert!(text.chars().count() <= TWEET_MAX_CHARS);
    assert!(text.contains('…'));
    assert!(text.ends_with("#LasVegas #CannabisDeals"));
}

#[test]
fn test_social_proof_thresholds() {
    assert_eq!(social_proof_label(2), None);
    assert_eq!(social_proof_label(3).as_deref(), Some("3 people saved this"));
    assert_eq!(social_proof_label(25).as_deref(), Some("🔥 Trending"));
}

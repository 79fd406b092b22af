// Criterion benchmarks for Clouded Deals

use chrono::Utc;
use clouded_deals::core::{
    diversity::apply_diversity_caps,
    normalize::{normalize_all, normalize_product},
    personalization::derive_preferences,
    weight::normalize_weight_str,
    DealFeed, DealFilter,
};
use clouded_deals::models::{Category, DiversityCaps, RawProduct};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;
use std::collections::HashMap;

const DISPENSARIES: [&str; 6] = ["planet13", "curaleaf-strip", "thrive-sahara", "oasis", "the-grove", "rise-durango"];
const BRANDS: [&str; 8] = ["Cookies", "STIIIZY", "Jeeter", "Kiva", "Cannabiotix", "Matrix", "Wyld", "Old Pal"];
const CATEGORIES: [&str; 5] = ["flower", "vape", "edible", "concentrate", "preroll"];

fn create_row(id: usize) -> RawProduct {
    let brand = BRANDS[id % BRANDS.len()];
    RawProduct {
        id: format!("p{}", id),
        name: Some(format!("{} - Strain {} {}g", brand, id, [1.0, 3.5, 7.0][id % 3])),
        category: Some(CATEGORIES[id % CATEGORIES.len()].to_string()),
        original_price: Some(40.0 + (id % 20) as f64),
        sale_price: Some(20.0 + (id % 15) as f64),
        deal_score: Some(((id * 37) % 100) as f64),
        created_at: Some(Utc::now()),
        dispensary: Some(json!({"id": DISPENSARIES[id % DISPENSARIES.len()]})),
        ..Default::default()
    }
}

fn bench_normalize_weight(c: &mut Criterion) {
    c.bench_function("normalize_weight_str", |b| {
        b.iter(|| {
            normalize_weight_str(black_box("Blue Dream 1/8 oz"), black_box(Category::Flower))
        });
    });
}

fn bench_normalization(c: &mut Criterion) {
    let rows: Vec<RawProduct> = (0..1000).map(create_row).collect();

    c.bench_function("normalize_1000_rows", |b| {
        b.iter(|| normalize_all(black_box(&rows), normalize_product));
    });
}

fn bench_diversity_caps(c: &mut Criterion) {
    let mut group = c.benchmark_group("diversity_caps");

    for row_count in [100, 500, 1000, 5000].iter() {
        let rows: Vec<RawProduct> = (0..*row_count).map(create_row).collect();
        let (deals, _) = normalize_all(&rows, normalize_product);
        let caps = DiversityCaps::default();

        group.bench_with_input(BenchmarkId::new("apply", row_count), row_count, |b, _| {
            b.iter(|| apply_diversity_caps(black_box(deals.clone()), black_box(&caps)));
        });
    }

    group.finish();
}

fn bench_feed_pipeline(c: &mut Criterion) {
    let feed = DealFeed::with_defaults();
    let rows: Vec<RawProduct> = (0..1000).map(create_row).collect();
    let save_counts: HashMap<String, u32> = (0..200).map(|i| (format!("p{}", i), (i % 30) as u32)).collect();

    let catalog = feed.catalog(&rows, &save_counts);
    let saved: Vec<_> = catalog.iter().take(25).cloned().collect();
    let prefs = derive_preferences(&saved);

    c.bench_function("feed_pipeline_1000_rows", |b| {
        b.iter(|| {
            let result = feed.build_feed(
                black_box(&rows),
                black_box(&save_counts),
                black_box(&DealFilter::default()),
                black_box(50),
            );
            feed.personalize(result.deals, &prefs, Utc::now())
        });
    });

    c.bench_function("search_1000_rows", |b| {
        b.iter(|| feed.search(black_box(&rows), black_box("kiva strain"), black_box(20)));
    });
}

criterion_group!(
    benches,
    bench_normalize_weight,
    bench_normalization,
    bench_diversity_caps,
    bench_feed_pipeline
);

criterion_main!(benches);

use crate::core::{dispensaries, social::social_proof_label, weight::infer_weight};
use crate::models::{Category, Deal, DispensaryRef, RawProduct};
use serde_json::Value;
use std::collections::HashMap;

/// Brand used when neither the row nor the name carries one
pub const UNKNOWN_BRAND: &str = "Unknown";

/// Product names shorter than this are scraper noise on the search path
pub const MIN_SEARCH_NAME_LEN: usize = 5;

/// Map free-form category text onto one of the five categories.
/// Anything unrecognised is flower.
pub fn infer_category(raw: Option<&str>) -> Category {
    raw.and_then(parse_category).unwrap_or(Category::Flower)
}

/// Recognised category names and their plurals
pub fn parse_category(raw: &str) -> Option<Category> {
    match raw.trim().to_lowercase().as_str() {
        "flower" | "flowers" => Some(Category::Flower),
        "vape" | "vapes" => Some(Category::Vape),
        "edible" | "edibles" => Some(Category::Edible),
        "concentrate" | "concentrates" => Some(Category::Concentrate),
        "preroll" | "prerolls" | "pre-roll" | "pre-rolls" | "pre_roll" => Some(Category::Preroll),
        _ => None,
    }
}

/// Structured brand, else the leading token of "BRAND - Product", else "Unknown"
pub fn infer_brand(brand: Option<&str>, name: &str) -> String {
    if let Some(brand) = brand.map(str::trim).filter(|b| !b.is_empty()) {
        return brand.to_string();
    }

    [" - ", " | "]
        .iter()
        .filter_map(|sep| name.split_once(*sep).map(|(head, _)| head.trim()))
        .find(|head| {
            let len = head.chars().count();
            (2..=40).contains(&len) && head.chars().any(char::is_alphabetic)
        })
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_BRAND.to_string())
}

/// Read the embedded dispensary join.
///
/// PostgREST returns either an object or a one-element array depending on
/// the relationship; anything without an id is malformed.
pub fn parse_dispensary(value: Option<&Value>) -> Option<DispensaryRef> {
    let obj = match value? {
        Value::Object(obj) => obj,
        Value::Array(items) => items.first()?.as_object()?,
        _ => return None,
    };

    let id = match obj.get("id")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if id.is_empty() {
        return None;
    }

    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let known = dispensaries::find(&id);
    let name = text("name")
        .or_else(|| known.map(|k| k.name.to_string()))
        .unwrap_or_else(|| id.clone());

    Some(DispensaryRef {
        name,
        chain: text("chain").or_else(|| known.and_then(|k| k.chain).map(str::to_string)),
        address: text("address"),
        zone: text("zone").or_else(|| known.map(|k| k.zone.to_string())),
        id,
    })
}

/// Discount from the row, or derived from the two prices
pub fn compute_discount(original: Option<f64>, sale: f64, given: Option<f64>) -> Option<f64> {
    if let Some(pct) = given.filter(|p| p.is_finite() && *p >= 0.0) {
        return Some(pct.min(100.0));
    }

    original
        .filter(|o| o.is_finite() && *o > sale)
        .map(|o| ((o - sale) / o * 100.0).round())
}

/// Convert one row into a deal, or `None` when the row is unusable
pub fn normalize_product(raw: &RawProduct) -> Option<Deal> {
    let name = raw.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
    let sale_price = raw.sale_price.filter(|p| p.is_finite() && *p > 0.0)?;
    let dispensary = parse_dispensary(raw.dispensary.as_ref())?;

    let category = infer_category(raw.category.as_deref());
    let original_price = raw.original_price.filter(|p| p.is_finite() && *p > 0.0);

    Some(Deal {
        id: raw.id.clone(),
        name: name.to_string(),
        brand: infer_brand(raw.brand.as_deref(), name),
        category,
        weight: infer_weight(raw, category),
        original_price,
        deal_price: sale_price,
        discount_percent: compute_discount(original_price, sale_price, raw.discount_percent),
        strain_type: raw
            .strain_type
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty()),
        deal_score: raw
            .deal_score
            .filter(|s| s.is_finite())
            .map(|s| s.clamp(0.0, 100.0))
            .unwrap_or(0.0),
        save_count: 0,
        social_proof: None,
        dispensary,
        product_url: raw.product_url.clone(),
        first_seen_at: raw.created_at,
    })
}

/// Search results additionally require a name of at least five characters
pub fn normalize_for_search(raw: &RawProduct) -> Option<Deal> {
    normalize_product(raw).filter(|d| d.name.chars().count() >= MIN_SEARCH_NAME_LEN)
}

/// Normalize every row, returning the survivors and how many were dropped
pub fn normalize_all(rows: &[RawProduct], normalize: fn(&RawProduct) -> Option<Deal>) -> (Vec<Deal>, usize) {
    let deals: Vec<Deal> = rows.iter().filter_map(normalize).collect();
    let dropped = rows.len() - deals.len();

    if dropped > 0 {
        tracing::debug!("Dropped {} of {} product rows during normalization", dropped, rows.len());
    }

    (deals, dropped)
}

/// Fill in how many users saved each deal
pub fn apply_save_counts(deals: &mut [Deal], counts: &HashMap<String, u32>) {
    for deal in deals.iter_mut() {
        deal.save_count = counts.get(&deal.id).copied().unwrap_or(0);
        deal.social_proof = social_proof_label(deal.save_count);
    }
}

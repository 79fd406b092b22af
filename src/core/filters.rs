use crate::core::normalize::parse_category;
use crate::models::{Category, Deal, FeedQuery};

/// User-selected feed filters. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealFilter {
    pub categories: Vec<Category>,
    pub dispensary_ids: Vec<String>,
    pub max_price: Option<f64>,
    pub min_discount: Option<f64>,
    pub strain_type: Option<String>,
    pub brand: Option<String>,
    pub weight: Option<String>,
}

impl DealFilter {
    /// Build a filter from the feed query string.
    /// `category` and `dispensary` accept comma-separated lists.
    pub fn from_query(query: &FeedQuery) -> Self {
        let list = |value: &Option<String>| -> Vec<String> {
            value
                .as_deref()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };

        // Unrecognised names are ignored
        let mut categories: Vec<Category> = list(&query.category)
            .iter()
            .filter_map(|c| parse_category(c))
            .collect();
        categories.sort();
        categories.dedup();

        Self {
            categories,
            dispensary_ids: list(&query.dispensary),
            max_price: query.max_price,
            min_discount: query.min_discount,
            strain_type: query.strain_type.clone().filter(|s| !s.trim().is_empty()),
            brand: query.brand.clone().filter(|s| !s.trim().is_empty()),
            weight: query.weight.clone().filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Check a deal against every provided criterion
#[inline]
pub fn matches_filter(deal: &Deal, filter: &DealFilter) -> bool {
    if !filter.categories.is_empty() && !filter.categories.contains(&deal.category) {
        return false;
    }

    if !filter.dispensary_ids.is_empty()
        && !filter
            .dispensary_ids
            .iter()
            .any(|id| id.eq_ignore_ascii_case(&deal.dispensary.id))
    {
        return false;
    }

    if let Some(max) = filter.max_price {
        if deal.deal_price > max {
            return false;
        }
    }

    if let Some(min) = filter.min_discount {
        if deal.discount_percent.unwrap_or(0.0) < min {
            return false;
        }
    }

    if let Some(strain) = &filter.strain_type {
        if !deal
            .strain_type
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(strain.trim()))
        {
            return false;
        }
    }

    if let Some(brand) = &filter.brand {
        if !deal.brand.eq_ignore_ascii_case(brand.trim()) {
            return false;
        }
    }

    if let Some(weight) = &filter.weight {
        if !deal
            .weight
            .as_deref()
            .is_some_and(|w| w.eq_ignore_ascii_case(weight.trim()))
        {
            return false;
        }
    }

    true
}

/// Split a search query into lowercase tokens
pub fn tokenize_query(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

/// Every token must appear somewhere in the deal's searchable text
#[inline]
pub fn matches_search(deal: &Deal, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }

    let haystack = format!(
        "{} {} {} {} {}",
        deal.name,
        deal.brand,
        deal.category,
        deal.dispensary.name,
        deal.strain_type.as_deref().unwrap_or("")
    )
    .to_lowercase();

    tokens.iter().all(|t| haystack.contains(t.as_str()))
}

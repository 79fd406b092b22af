use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Product category. Only these five are shown in the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Flower,
    Vape,
    Edible,
    Concentrate,
    Preroll,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Flower,
        Category::Vape,
        Category::Edible,
        Category::Concentrate,
        Category::Preroll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Flower => "flower",
            Category::Vape => "vape",
            Category::Edible => "edible",
            Category::Concentrate => "concentrate",
            Category::Preroll => "preroll",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product row as returned by the hosted database
///
/// Every field is optional because the scraper output is not trusted;
/// `core::normalize` decides what survives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawProduct {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub sale_price: Option<f64>,
    #[serde(default)]
    pub discount_percent: Option<f64>,
    #[serde(default)]
    pub weight_value: Option<f64>,
    #[serde(default)]
    pub weight_unit: Option<String>,
    #[serde(default)]
    pub strain_type: Option<String>,
    #[serde(default)]
    pub deal_score: Option<f64>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Embedded `dispensaries` join, kept loose so a malformed join drops the row
    /// instead of failing the whole response
    #[serde(default)]
    pub dispensary: Option<serde_json::Value>,
}

/// Product ids are text in some tables and bigint in others
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}

/// Dispensary attached to a deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispensaryRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub chain: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
}

/// Display-ready deal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: String,
    pub name: String,
    pub brand: String,
    pub category: Category,
    pub weight: Option<String>,
    pub original_price: Option<f64>,
    pub deal_price: f64,
    pub discount_percent: Option<f64>,
    pub strain_type: Option<String>,
    pub deal_score: f64,
    #[serde(default)]
    pub save_count: u32,
    /// "12 people saved this" style label, absent for quiet deals
    #[serde(default)]
    pub social_proof: Option<String>,
    pub dispensary: DispensaryRef,
    pub product_url: Option<String>,
    pub first_seen_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Limits on how many deals from one source may share a feed.
/// A value of 0 disables that check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityCaps {
    pub per_dispensary: usize,
    pub per_chain: usize,
    pub per_brand_per_category: usize,
    pub per_brand_total: usize,
}

impl Default for DiversityCaps {
    fn default() -> Self {
        Self {
            per_dispensary: 5,
            per_chain: 8,
            per_brand_per_category: 2,
            per_brand_total: 4,
        }
    }
}

impl DiversityCaps {
    /// No limits at all
    pub fn unlimited() -> Self {
        Self {
            per_dispensary: 0,
            per_chain: 0,
            per_brand_per_category: 0,
            per_brand_total: 0,
        }
    }
}

/// Points available to each personalization factor (sum to 100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub category: f64,
    pub price: f64,
    pub discount: f64,
    pub brand: f64,
    pub dispensary: f64,
    pub recency: f64,
    pub popularity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            category: 25.0,
            price: 15.0,
            discount: 15.0,
            brand: 20.0,
            dispensary: 10.0,
            recency: 10.0,
            popularity: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Preferences derived from a user's save history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub category_ratios: HashMap<Category, f64>,
    /// `None` means any price fits
    pub price_range: Option<PriceRange>,
    pub discount_threshold: f64,
    /// Keyed by lowercased brand
    pub brand_affinity: HashMap<String, f64>,
    pub dispensary_affinity: HashMap<String, f64>,
    pub sample_size: usize,
    pub is_cold_start: bool,
}

/// Why a deal was recommended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreReason {
    Category,
    PriceRange,
    Discount,
    Brand,
    Dispensary,
    Recency,
    Popularity,
}

impl ScoreReason {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreReason::Category => "Matches your favorite category",
            ScoreReason::PriceRange => "In your price range",
            ScoreReason::Discount => "Bigger discount than you usually grab",
            ScoreReason::Brand => "From a brand you love",
            ScoreReason::Dispensary => "At a dispensary you shop",
            ScoreReason::Recency => "Just dropped",
            ScoreReason::Popularity => "Popular right now",
        }
    }
}

/// A deal with its personalization score
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizedDeal {
    #[serde(flatten)]
    pub deal: Deal,
    pub personal_score: f64,
    pub reason: Option<ScoreReason>,
    pub reason_label: Option<String>,
}

/// Row from `user_saved_deals`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDeal {
    pub anon_id: String,
    pub deal_id: String,
    pub saved_at: chrono::DateTime<chrono::Utc>,
}

/// Row from `analytics_events`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub id: uuid::Uuid,
    pub anon_id: String,
    pub event_name: String,
    pub properties: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Email or SMS capture
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactCapture {
    pub anon_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
}

/// A list of saved deals shared by link
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSave {
    pub share_id: String,
    pub anon_id: String,
    pub deal_ids: Vec<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Dispensary with the number of live deals it currently has
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispensarySummary {
    #[serde(flatten)]
    pub dispensary: DispensaryRef,
    pub deal_count: usize,
}

/// Counters that badges are checked against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_saves: u32,
    pub deals_used: u32,
    pub shares: u32,
    pub searches: u32,
    pub current_streak_days: u32,
    pub longest_streak_days: u32,
    pub categories_saved: HashSet<Category>,
    pub dispensaries_saved: HashSet<String>,
    pub top_brand_saves: u32,
}

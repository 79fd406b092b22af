use serde::{Deserialize, Serialize};
use crate::core::badges::BadgeProgress;
use crate::models::domain::{Deal, DispensarySummary, UserStats};

/// Response for the deal feed and search endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedResponse<T> {
    pub deals: Vec<T>,
    pub total_results: usize,
    pub personalized: bool,
    /// Served from cache (or empty) because the database was unreachable
    pub stale: bool,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub cache: CacheStats,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub l1_size: u64,
    pub redis_enabled: bool,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl ErrorResponse {
    /// Generic failure shown to users; details stay in the logs
    pub fn internal(error: &str) -> Self {
        Self {
            error: error.to_string(),
            message: "Something went wrong".to_string(),
            status_code: 500,
        }
    }

    pub fn bad_request(error: &str, message: String) -> Self {
        Self {
            error: error.to_string(),
            message,
            status_code: 400,
        }
    }

    pub fn not_found(message: String) -> Self {
        Self {
            error: "Not found".to_string(),
            message,
            status_code: 404,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDealsResponse {
    pub anon_id: String,
    pub deal_ids: Vec<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    pub save_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventResponse {
    pub success: bool,
    pub event_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub share_id: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedDealsResponse {
    pub share_id: String,
    pub deals: Vec<Deal>,
    /// Shared deals that are no longer live
    pub expired_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgesResponse {
    pub anon_id: String,
    pub stats: UserStats,
    pub badges: Vec<BadgeProgress>,
    pub challenges: Vec<BadgeProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetResponse {
    pub deal_id: String,
    pub text: String,
    pub length: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispensariesResponse {
    pub dispensaries: Vec<DispensarySummary>,
}

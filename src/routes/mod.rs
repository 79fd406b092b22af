// Route exports
pub mod deals;
pub mod shares;
pub mod users;

use crate::config::{BadgeSettings, Settings};
use crate::core::{derive_preferences, DealFeed};
use crate::models::{Deal, ErrorResponse, RawProduct, UserPreferences};
use crate::services::{CacheKey, CacheManager, PostgresClient, SupabaseClient};
use actix_web::{web, HttpResponse};
use chrono::FixedOffset;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

/// Request-independent knobs the handlers need
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub default_limit: usize,
    pub max_limit: usize,
    pub fetch_limit: usize,
    pub catalog_ttl_secs: u64,
    pub preferences_ttl_secs: u64,
    pub badges_ttl_secs: u64,
    pub site_url: String,
    pub day_offset: FixedOffset,
}

impl ServiceOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            default_limit: settings.feed.default_limit,
            max_limit: settings.feed.max_limit,
            fetch_limit: settings.feed.fetch_limit,
            catalog_ttl_secs: settings.cache.catalog_ttl(),
            preferences_ttl_secs: settings.cache.preferences_ttl(),
            badges_ttl_secs: settings.cache.badges_ttl(),
            site_url: settings.social.site_url.clone(),
            day_offset: settings.badges.day_offset(),
        }
    }

    /// Requested limit, defaulted and clamped
    pub fn limit(&self, requested: Option<u16>) -> usize {
        requested
            .map(|l| l as usize)
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
            fetch_limit: 1000,
            catalog_ttl_secs: 86_400,
            preferences_ttl_secs: 1800,
            badges_ttl_secs: 300,
            site_url: "https://clouded.deals".to_string(),
            day_offset: BadgeSettings::default().day_offset(),
        }
    }
}

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub supabase: Arc<SupabaseClient>,
    pub postgres: Arc<PostgresClient>,
    pub cache: Arc<CacheManager>,
    pub feed: DealFeed,
    pub options: Arc<ServiceOptions>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(deals::configure)
            .configure(users::configure)
            .configure(shares::configure),
    );
}

/// Log the underlying error and answer with a generic 500
pub(crate) fn internal_error(context: &str, err: impl Display) -> HttpResponse {
    tracing::error!("{}: {}", context, err);
    HttpResponse::InternalServerError().json(ErrorResponse::internal(context))
}

pub(crate) fn validation_error(errors: validator::ValidationErrors) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::bad_request("Validation failed", errors.to_string()))
}

/// Anonymous ids are client generated; only their shape is checked
pub(crate) fn valid_anon_id(anon_id: &str) -> bool {
    !anon_id.trim().is_empty() && anon_id.len() <= 64
}

/// Live catalog rows, plus whether they came from the fallback path
///
/// A successful read refreshes the last-good snapshot. When the database is
/// unreachable the snapshot is served instead, and failing that an empty
/// catalog; both are flagged stale.
pub(crate) async fn load_catalog(state: &AppState) -> (Vec<RawProduct>, bool) {
    match state.supabase.fetch_active_products(state.options.fetch_limit).await {
        Ok(rows) => {
            let key = CacheKey::last_good_catalog();
            if let Err(e) = state.cache.set(&key, &rows, state.options.catalog_ttl_secs).await {
                tracing::warn!("Failed to cache catalog snapshot: {}", e);
            }
            (rows, false)
        }
        Err(e) => {
            tracing::error!("Failed to fetch catalog, falling back to snapshot: {}", e);
            match state.cache.get::<Vec<RawProduct>>(&CacheKey::last_good_catalog()).await {
                Ok(rows) => {
                    tracing::warn!("Serving {} rows from catalog snapshot", rows.len());
                    (rows, true)
                }
                Err(e) => {
                    tracing::warn!("No catalog snapshot available ({}), serving empty feed", e);
                    (vec![], true)
                }
            }
        }
    }
}

/// Save counts for the given rows. Failures degrade to zero counts.
pub(crate) async fn load_save_counts(state: &AppState, rows: &[RawProduct]) -> HashMap<String, u32> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    match state.postgres.get_save_counts(&ids).await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::warn!("Failed to fetch save counts, proceeding without: {}", e);
            HashMap::new()
        }
    }
}

/// Resolve deal ids against the live catalog, looking up the rest directly
/// so saves of expired deals still count
pub(crate) async fn resolve_deals(state: &AppState, ids: &[String], live: &[Deal]) -> HashMap<String, Deal> {
    let mut resolved: HashMap<String, Deal> = live
        .iter()
        .filter(|deal| ids.contains(&deal.id))
        .map(|deal| (deal.id.clone(), deal.clone()))
        .collect();

    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !resolved.contains_key(*id))
        .cloned()
        .collect();

    if !missing.is_empty() {
        match state.supabase.fetch_products_by_ids(&missing).await {
            Ok(rows) => {
                for deal in state.feed.catalog(&rows, &HashMap::new()) {
                    resolved.insert(deal.id.clone(), deal);
                }
            }
            Err(e) => tracing::warn!("Failed to look up {} saved deals: {}", missing.len(), e),
        }
    }

    resolved
}

/// Preferences for a user, from cache or derived from their saves
pub(crate) async fn load_preferences(state: &AppState, anon_id: &str, live: &[Deal]) -> UserPreferences {
    let key = CacheKey::preferences(anon_id);
    if let Ok(prefs) = state.cache.get::<UserPreferences>(&key).await {
        return prefs;
    }

    let saved_ids = match state.postgres.get_saved_deals(anon_id).await {
        Ok(saves) => saves.into_iter().map(|s| s.deal_id).collect::<Vec<_>>(),
        Err(e) => {
            tracing::warn!("Failed to fetch saves for {}, using cold start: {}", anon_id, e);
            return UserPreferences::cold_start();
        }
    };

    let resolved = resolve_deals(state, &saved_ids, live).await;
    let saved: Vec<Deal> = saved_ids.iter().filter_map(|id| resolved.get(id).cloned()).collect();
    let prefs = derive_preferences(&saved);

    tracing::debug!(
        "Derived preferences for {} from {} saves (cold start: {})",
        anon_id,
        prefs.sample_size,
        prefs.is_cold_start
    );

    if let Err(e) = state.cache.set(&key, &prefs, state.options.preferences_ttl_secs).await {
        tracing::warn!("Failed to cache preferences: {}", e);
    }

    prefs
}

/// Drop derived per-user state after the user's history changes
pub(crate) async fn invalidate_user(state: &AppState, anon_id: &str) {
    for key in [CacheKey::preferences(anon_id), CacheKey::badges(anon_id)] {
        if let Err(e) = state.cache.delete(&key).await {
            tracing::warn!("Failed to invalidate cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_defaults_and_clamps() {
        let options = ServiceOptions::default();
        assert_eq!(options.limit(None), 50);
        assert_eq!(options.limit(Some(10)), 10);
        assert_eq!(options.limit(Some(1000)), 200);
        assert_eq!(options.limit(Some(0)), 1);
    }

    #[test]
    fn test_valid_anon_id() {
        assert!(valid_anon_id("a1b2c3"));
        assert!(!valid_anon_id("  "));
        assert!(!valid_anon_id(&"x".repeat(65)));
    }
}

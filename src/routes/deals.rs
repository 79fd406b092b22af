use super::{internal_error, load_catalog, load_preferences, load_save_counts, validation_error, AppState};
use crate::core::{format_deal_tweet, DealFeed, DealFilter};
use crate::models::{
    DispensariesResponse, ErrorResponse, FeedQuery, FeedResponse, HealthResponse, SearchQuery,
    TweetResponse,
};
use actix_web::{web, HttpResponse, Responder};
use std::collections::HashMap;
use validator::Validate;

/// Configure deal browsing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/deals", web::get().to(get_deals))
        .route("/deals/search", web::get().to(search_deals))
        .route("/deals/{id}/tweet", web::get().to(deal_tweet))
        .route("/dispensaries", web::get().to(list_dispensaries));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);
    let supabase_healthy = state.supabase.health_check().await;

    let status = if pg_healthy && supabase_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        cache: state.cache.stats(),
    })
}

/// Today's deal feed
///
/// GET /api/v1/deals?category=flower,vape&dispensary=planet13&maxPrice=40&anonId=...
///
/// Filters are optional. With `anonId` the capped feed is re-ranked for that
/// user and each deal carries the reason it was picked.
async fn get_deals(state: web::Data<AppState>, query: web::Query<FeedQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    let limit = state.options.limit(query.limit);
    let filter = DealFilter::from_query(&query);

    let (rows, stale) = load_catalog(&state).await;
    let save_counts = load_save_counts(&state, &rows).await;

    let result = state.feed.build_feed(&rows, &save_counts, &filter, limit);

    tracing::info!(
        "Feed: {} deals from {} rows ({} dropped, {} capped, stale: {})",
        result.deals.len(),
        result.total_rows,
        result.dropped_rows,
        result.capped.rejected(),
        stale
    );

    let Some(anon_id) = query.anon_id.as_deref() else {
        return HttpResponse::Ok().json(FeedResponse {
            total_results: result.deals.len(),
            deals: result.deals,
            personalized: false,
            stale,
        });
    };

    let live = state.feed.catalog(&rows, &save_counts);
    let prefs = load_preferences(&state, anon_id, &live).await;
    let ranked = state.feed.personalize(result.deals, &prefs, chrono::Utc::now());

    HttpResponse::Ok().json(FeedResponse {
        total_results: ranked.len(),
        deals: ranked,
        personalized: !prefs.is_cold_start,
        stale,
    })
}

/// Free-text search over today's deals
///
/// GET /api/v1/deals/search?q=blue+dream&limit=20
async fn search_deals(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    let limit = state.options.limit(query.limit);
    let (rows, stale) = load_catalog(&state).await;
    let deals = state.feed.search(&rows, &query.q, limit);

    tracing::debug!("Search '{}' matched {} deals", query.q, deals.len());

    HttpResponse::Ok().json(FeedResponse {
        total_results: deals.len(),
        deals,
        personalized: false,
        stale,
    })
}

/// Ready-to-post text for one deal
///
/// GET /api/v1/deals/{id}/tweet
async fn deal_tweet(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let deal_id = path.into_inner();

    let rows = match state.supabase.fetch_products_by_ids(std::slice::from_ref(&deal_id)).await {
        Ok(rows) => rows,
        Err(e) => return internal_error("Failed to fetch deal", e),
    };

    let Some(deal) = state.feed.catalog(&rows, &HashMap::new()).into_iter().next() else {
        return HttpResponse::NotFound().json(ErrorResponse::not_found(format!("Deal {} not found", deal_id)));
    };

    let text = format_deal_tweet(&deal, &state.options.site_url);

    HttpResponse::Ok().json(TweetResponse {
        deal_id: deal.id,
        length: text.chars().count(),
        text,
    })
}

/// Dispensaries with their live deal counts
///
/// GET /api/v1/dispensaries
async fn list_dispensaries(state: web::Data<AppState>) -> impl Responder {
    let (rows, _) = load_catalog(&state).await;
    let deals = state.feed.catalog(&rows, &HashMap::new());

    HttpResponse::Ok().json(DispensariesResponse {
        dispensaries: DealFeed::dispensary_summaries(&deals),
    })
}

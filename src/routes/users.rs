use super::{
    internal_error, invalidate_user, load_catalog, load_preferences, load_save_counts, resolve_deals,
    valid_anon_id, validation_error, AppState,
};
use crate::core::badges::{
    evaluate_badges, evaluate_challenges, local_day, EVENT_DEAL_USED, EVENT_SEARCH, EVENT_SHARE,
};
use crate::models::requests::normalize_phone;
use crate::models::{
    AnalyticsEvent, AnonQuery, BadgesResponse, ContactCapture, ContactRequest, ContactResponse,
    ErrorResponse, RecordEventRequest, RecordEventResponse, SaveDealRequest, SaveResponse,
    SavedDealsResponse, UserStats,
};
use crate::services::{CacheKey, PostgresError};
use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

/// Configure per-user routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/saves", web::post().to(save_deal))
        .route("/saves", web::delete().to(unsave_deal))
        .route("/saves", web::get().to(get_saved_deals))
        .route("/events", web::post().to(record_event))
        .route("/contacts", web::post().to(capture_contact))
        .route("/users/{anon_id}/preferences", web::get().to(get_preferences))
        .route("/users/{anon_id}/badges", web::get().to(get_badges));
}

fn invalid_anon_id() -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse::bad_request(
        "Invalid anonId",
        "anonId must be 1-64 characters".to_string(),
    ))
}

/// Save a deal
///
/// POST /api/v1/saves
///
/// Request body:
/// ```json
/// { "anonId": "string", "dealId": "string" }
/// ```
async fn save_deal(state: web::Data<AppState>, req: web::Json<SaveDealRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.postgres.save_deal(&req.anon_id, &req.deal_id).await {
        Ok(save_count) => {
            invalidate_user(&state, &req.anon_id).await;
            HttpResponse::Ok().json(SaveResponse { success: true, save_count })
        }
        Err(e) => internal_error("Failed to save deal", e),
    }
}

/// Remove a saved deal
///
/// DELETE /api/v1/saves
async fn unsave_deal(state: web::Data<AppState>, req: web::Json<SaveDealRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.postgres.unsave_deal(&req.anon_id, &req.deal_id).await {
        Ok(save_count) => {
            invalidate_user(&state, &req.anon_id).await;
            HttpResponse::Ok().json(SaveResponse { success: true, save_count })
        }
        Err(PostgresError::NotFound(message)) => {
            HttpResponse::NotFound().json(ErrorResponse::not_found(message))
        }
        Err(e) => internal_error("Failed to remove saved deal", e),
    }
}

/// Saved deal ids for a user, newest first
///
/// GET /api/v1/saves?anonId={anonId}
async fn get_saved_deals(state: web::Data<AppState>, query: web::Query<AnonQuery>) -> impl Responder {
    if let Err(errors) = query.validate() {
        return validation_error(errors);
    }

    match state.postgres.get_saved_deals(&query.anon_id).await {
        Ok(saves) => {
            let deal_ids: Vec<String> = saves.into_iter().map(|s| s.deal_id).collect();
            HttpResponse::Ok().json(SavedDealsResponse {
                anon_id: query.anon_id.clone(),
                count: deal_ids.len(),
                deal_ids,
            })
        }
        Err(e) => internal_error("Failed to fetch saved deals", e),
    }
}

/// Record an analytics event
///
/// POST /api/v1/events
///
/// Request body:
/// ```json
/// { "anonId": "string", "eventName": "deal_used", "properties": {} }
/// ```
async fn record_event(state: web::Data<AppState>, req: web::Json<RecordEventRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let req = req.into_inner();
    let event = AnalyticsEvent {
        id: uuid::Uuid::new_v4(),
        anon_id: req.anon_id,
        event_name: req.event_name.trim().to_lowercase(),
        properties: req.properties,
        created_at: chrono::Utc::now(),
    };

    if let Err(e) = state.postgres.record_event(&event).await {
        return internal_error("Failed to record event", e);
    }

    // Only these events move badge progress
    if [EVENT_DEAL_USED, EVENT_SHARE, EVENT_SEARCH].contains(&event.event_name.as_str()) {
        if let Err(e) = state.cache.delete(&CacheKey::badges(&event.anon_id)).await {
            tracing::warn!("Failed to invalidate cache: {}", e);
        }
    }

    HttpResponse::Ok().json(RecordEventResponse {
        success: true,
        event_id: event.id.to_string(),
    })
}

/// Email / SMS capture
///
/// POST /api/v1/contacts
async fn capture_contact(state: web::Data<AppState>, req: web::Json<ContactRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let req = req.into_inner();
    let contact = ContactCapture {
        anon_id: req.anon_id,
        email: req
            .email
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty()),
        phone: req.phone.as_deref().and_then(normalize_phone),
        source: req.source,
    };

    match state.postgres.upsert_contact(&contact).await {
        Ok(()) => HttpResponse::Ok().json(ContactResponse { success: true }),
        Err(e) => internal_error("Failed to save contact", e),
    }
}

/// Preferences derived from a user's saves
///
/// GET /api/v1/users/{anonId}/preferences
async fn get_preferences(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let anon_id = path.into_inner();
    if !valid_anon_id(&anon_id) {
        return invalid_anon_id();
    }

    let (rows, _) = load_catalog(&state).await;
    let save_counts = load_save_counts(&state, &rows).await;
    let live = state.feed.catalog(&rows, &save_counts);
    let prefs = load_preferences(&state, &anon_id, &live).await;

    HttpResponse::Ok().json(prefs)
}

/// Badge and daily challenge progress
///
/// GET /api/v1/users/{anonId}/badges
async fn get_badges(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let anon_id = path.into_inner();
    if !valid_anon_id(&anon_id) {
        return invalid_anon_id();
    }

    let key = CacheKey::badges(&anon_id);
    if let Ok(cached) = state.cache.get::<BadgesResponse>(&key).await {
        return HttpResponse::Ok().json(cached);
    }

    let saves = match state.postgres.get_saved_deals(&anon_id).await {
        Ok(saves) => saves,
        Err(e) => return internal_error("Failed to fetch saved deals", e),
    };
    let events = match state
        .postgres
        .get_events(&anon_id, &[EVENT_DEAL_USED, EVENT_SHARE, EVENT_SEARCH])
        .await
    {
        Ok(events) => events,
        Err(e) => return internal_error("Failed to fetch events", e),
    };

    let saved_ids: Vec<String> = saves.iter().map(|s| s.deal_id.clone()).collect();
    let catalog = resolve_deals(&state, &saved_ids, &[]).await;

    let offset = state.options.day_offset;
    let today = local_day(&chrono::Utc::now(), &offset);
    let stats = UserStats::from_activity(&saves, &events, &catalog, today, &offset);
    let day_stats = UserStats::for_day(&saves, &events, &catalog, today, &offset);

    let response = BadgesResponse {
        anon_id,
        badges: evaluate_badges(&stats),
        challenges: evaluate_challenges(&day_stats),
        stats,
    };

    if let Err(e) = state.cache.set(&key, &response, state.options.badges_ttl_secs).await {
        tracing::warn!("Failed to cache badges: {}", e);
    }

    HttpResponse::Ok().json(response)
}

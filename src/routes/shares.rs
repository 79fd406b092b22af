use super::{internal_error, invalidate_user, load_catalog, validation_error, AppState};
use crate::core::badges::EVENT_SHARE;
use crate::models::{
    AnalyticsEvent, CreateShareRequest, Deal, ErrorResponse, ShareResponse, SharedDealsResponse,
    SharedSave,
};
use crate::services::PostgresError;
use actix_web::{web, HttpResponse, Responder};
use std::collections::HashMap;
use validator::Validate;

/// Length of the public share id
const SHARE_ID_LEN: usize = 10;

/// Configure shared save list routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/shares", web::post().to(create_share))
        .route("/shares/{share_id}", web::get().to(get_share));
}

/// Short, URL-safe share id
pub fn new_share_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(SHARE_ID_LEN);
    id
}

/// Link a shared list is opened with
pub fn share_url(site_url: &str, share_id: &str) -> String {
    format!("{}/s/{}", site_url.trim_end_matches('/'), share_id)
}

/// Share a list of saved deals
///
/// POST /api/v1/shares
///
/// Request body:
/// ```json
/// { "anonId": "string", "dealIds": ["string"] }
/// ```
async fn create_share(state: web::Data<AppState>, req: web::Json<CreateShareRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    let req = req.into_inner();
    let mut deal_ids: Vec<String> = Vec::with_capacity(req.deal_ids.len());
    for id in req.deal_ids {
        if !id.trim().is_empty() && !deal_ids.contains(&id) {
            deal_ids.push(id);
        }
    }

    let share = SharedSave {
        share_id: new_share_id(),
        anon_id: req.anon_id,
        deal_ids,
        created_at: chrono::Utc::now(),
    };

    if let Err(e) = state.postgres.create_share(&share).await {
        return internal_error("Failed to create share", e);
    }

    // Counts toward the sharing badges; the share itself already succeeded
    let event = AnalyticsEvent {
        id: uuid::Uuid::new_v4(),
        anon_id: share.anon_id.clone(),
        event_name: EVENT_SHARE.to_string(),
        properties: serde_json::json!({ "shareId": share.share_id, "dealCount": share.deal_ids.len() }),
        created_at: share.created_at,
    };
    match state.postgres.record_event(&event).await {
        Ok(()) => invalidate_user(&state, &share.anon_id).await,
        Err(e) => tracing::warn!("Share {} created but event recording failed: {}", share.share_id, e),
    }

    tracing::info!("Created share {} with {} deals", share.share_id, share.deal_ids.len());

    HttpResponse::Ok().json(ShareResponse {
        url: share_url(&state.options.site_url, &share.share_id),
        share_id: share.share_id,
    })
}

/// Resolve a shared list to the deals that are still live
///
/// GET /api/v1/shares/{shareId}
async fn get_share(state: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    let share_id = path.into_inner();

    let share = match state.postgres.get_share(&share_id).await {
        Ok(share) => share,
        Err(PostgresError::NotFound(message)) => {
            return HttpResponse::NotFound().json(ErrorResponse::not_found(message));
        }
        Err(e) => return internal_error("Failed to fetch share", e),
    };

    let (rows, _) = load_catalog(&state).await;
    let live: HashMap<String, Deal> = state
        .feed
        .catalog(&rows, &HashMap::new())
        .into_iter()
        .map(|deal| (deal.id.clone(), deal))
        .collect();

    let (deals, expired_count) = live_shared_deals(&share.deal_ids, &live);

    HttpResponse::Ok().json(SharedDealsResponse {
        share_id: share.share_id,
        deals,
        expired_count,
    })
}

/// Shared deals in the order they were shared, counting ones no longer live
fn live_shared_deals(deal_ids: &[String], live: &HashMap<String, Deal>) -> (Vec<Deal>, usize) {
    let deals: Vec<Deal> = deal_ids.iter().filter_map(|id| live.get(id).cloned()).collect();
    let expired = deal_ids.len() - deals.len();
    (deals, expired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_id_shape() {
        let id = new_share_id();
        assert_eq!(id.len(), SHARE_ID_LEN);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, new_share_id());
    }

    #[test]
    fn test_share_url() {
        assert_eq!(share_url("https://clouded.deals/", "abc123"), "https://clouded.deals/s/abc123");
    }

    #[test]
    fn test_live_shared_deals_counts_expired() {
        let ids = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let (deals, expired) = live_shared_deals(&ids, &HashMap::new());
        assert!(deals.is_empty());
        assert_eq!(expired, 3);
    }
}

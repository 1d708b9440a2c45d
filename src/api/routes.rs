use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::auth::{auth_middleware, AuthService};

use super::analytics;
use super::handlers::{
    create_link, delete_link, health_check, join_waitlist, list_links, public_profile,
    reorder_links, set_campaign_membership, stripe_webhook, update_link, AppState,
};
use super::ingest;

pub fn create_router(state: Arc<AppState>, auth_service: Arc<AuthService>) -> Router {
    let protected_routes = Router::new()
        .route("/api/links", get(list_links).post(create_link))
        .route("/api/links/reorder", post(reorder_links))
        .route("/api/links/{id}", put(update_link).delete(delete_link))
        .route("/api/analytics/summary", get(analytics::summary))
        .route("/api/analytics/timeseries", get(analytics::timeseries))
        .route("/api/analytics/geography", get(analytics::geography))
        .route("/api/analytics/referrer", get(analytics::referrer))
        .route(
            "/api/campaigns/{id}/membership",
            post(set_campaign_membership),
        )
        .route_layer(middleware::from_fn(move |headers, req, next| {
            let auth = Arc::clone(&auth_service);
            auth_middleware(auth, headers, req, next)
        }))
        .with_state(Arc::clone(&state));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/analytics/click", post(ingest::record_click))
        .route("/api/analytics/view", post(ingest::record_view))
        .route("/api/waitlist", post(join_waitlist))
        .route("/api/stripe/webhook", post(stripe_webhook))
        .route("/profile/{username}", get(public_profile))
        .with_state(state);

    public_routes
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
}

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::AnalyticsAggregator;
use crate::auth::AuthUser;
use crate::billing::{parse_event, verify_signature, SubscriptionReconciler};
use crate::config::PlanConfig;
use crate::ingest::IngestPipeline;
use crate::links::visible_links;
use crate::models::{CreateLinkRequest, Link, ReorderRequest, RotationType, UpdateLinkRequest};
use crate::storage::{Storage, StorageError};

/// Waitlist topics open for signup.
const WAITLIST_TOPICS: &[&str] = &["api", "community", "teams", "integrations"];

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub pipeline: IngestPipeline,
    pub aggregator: AnalyticsAggregator,
    pub reconciler: SubscriptionReconciler,
    pub webhook_secret: Option<String>,
    pub plans: PlanConfig,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn storage_error(err: StorageError) -> ApiError {
    match err {
        StorageError::WeightBudget(e) => error(StatusCode::BAD_REQUEST, e.to_string()),
        StorageError::NotFound => error(StatusCode::NOT_FOUND, "not found"),
        StorageError::Conflict => error(StatusCode::CONFLICT, "duplicate entry"),
        StorageError::Other(e) => {
            tracing::error!(error = %e, "storage failure");
            error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
        }
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "storage failure");
    error(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

// --- links ---

/// List the authenticated user's links in display order.
pub async fn list_links(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> Result<Json<Vec<Link>>, ApiError> {
    let links = state.storage.list_links(user.id).await.map_err(internal)?;
    Ok(Json(links))
}

/// Create a link; runs the weight budget check for weighted rotation and
/// enforces the per-plan link count limit.
pub async fn create_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<(StatusCode, Json<Link>), ApiError> {
    if payload.title.is_empty() || payload.url.is_empty() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "title and url cannot be empty",
        ));
    }

    let limit = if user.premium {
        state.plans.premium_link_limit
    } else {
        state.plans.free_link_limit
    };
    let count = state.storage.count_links(user.id).await.map_err(internal)?;
    if count >= limit {
        return Err(error(
            StatusCode::FORBIDDEN,
            format!("link limit reached for your plan ({limit})"),
        ));
    }

    let link = state
        .storage
        .create_link(user.id, &payload)
        .await
        .map_err(storage_error)?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn update_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(link_id): Path<i64>,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<Link>, ApiError> {
    let link = state
        .storage
        .update_link(user.id, link_id, &payload)
        .await
        .map_err(storage_error)?;
    Ok(Json(link))
}

pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(link_id): Path<i64>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let deleted = state
        .storage
        .delete_link(user.id, link_id)
        .await
        .map_err(internal)?;
    if !deleted {
        return Err(error(StatusCode::NOT_FOUND, "link not found"));
    }
    Ok(SuccessResponse::ok())
}

/// Reassign display positions: `ids[i]` gets position `i + 1`.
pub async fn reorder_links(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(payload): Json<ReorderRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if payload.ids.is_empty() {
        return Err(error(StatusCode::BAD_REQUEST, "ids cannot be empty"));
    }
    state
        .storage
        .reorder_links(user.id, &payload.ids)
        .await
        .map_err(internal)?;
    Ok(SuccessResponse::ok())
}

// --- public profile ---

#[derive(Serialize)]
pub struct PublicLink {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub rotation_type: RotationType,
    pub weight: Option<i64>,
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct PublicProfile {
    pub username: String,
    pub links: Vec<PublicLink>,
}

/// Render a public profile: the visibility evaluator filters the link set
/// against the current time, and random-rotation links are shuffled among
/// the slots they occupy. Weight is passed through for the client to
/// apportion emphasis.
pub async fn public_profile(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfile>, ApiError> {
    let user = state
        .storage
        .get_user_by_username(&username)
        .await
        .map_err(internal)?
        .ok_or_else(|| error(StatusCode::NOT_FOUND, "profile not found"))?;

    let links = state.storage.list_links(user.id).await.map_err(internal)?;
    let now_ms = chrono::Utc::now().timestamp_millis();
    let mut links = visible_links(links, now_ms);
    shuffle_random_links(&mut links);

    let links = links
        .into_iter()
        .map(|l| PublicLink {
            id: l.id,
            title: l.title,
            url: l.url,
            icon: l.icon,
            rotation_type: l.rotation_type,
            weight: l.weight,
            category: l.category,
        })
        .collect();

    Ok(Json(PublicProfile {
        username: user.username,
        links,
    }))
}

/// Shuffle random-rotation links among their own slots, leaving every
/// other link in place.
fn shuffle_random_links(links: &mut [Link]) {
    let slots: Vec<usize> = links
        .iter()
        .enumerate()
        .filter(|(_, l)| l.rotation_type == RotationType::Random)
        .map(|(i, _)| i)
        .collect();
    if slots.len() < 2 {
        return;
    }

    let mut randoms: Vec<Link> = slots.iter().map(|&i| links[i].clone()).collect();
    randoms.shuffle(&mut rand::rng());
    for (&slot, link) in slots.iter().zip(randoms.into_iter()) {
        links[slot] = link;
    }
}

// --- waitlist ---

#[derive(Deserialize)]
pub struct WaitlistRequest {
    pub email: String,
    pub topic: String,
}

pub async fn join_waitlist(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WaitlistRequest>,
) -> Result<Json<SuccessResponse>, (StatusCode, Json<serde_json::Value>)> {
    let bad_request = |msg: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": msg })),
        )
    };

    if payload.email.is_empty() || !payload.email.contains('@') {
        return Err(bad_request("a valid email is required"));
    }
    if !WAITLIST_TOPICS.contains(&payload.topic.as_str()) {
        return Err(bad_request("unknown waitlist topic"));
    }

    match state
        .storage
        .add_waitlist_entry(&payload.email, &payload.topic)
        .await
    {
        Ok(()) => Ok(SuccessResponse::ok()),
        Err(StorageError::Conflict) => Err((
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "error": "already signed up for this topic",
                "already_signed_up": true,
            })),
        )),
        Err(e) => {
            tracing::error!(error = %e, "waitlist signup failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal server error" })),
            ))
        }
    }
}

// --- campaigns ---

#[derive(Deserialize)]
pub struct CampaignMembershipRequest {
    pub joined: bool,
}

/// Upsert the caller's opt-in/opt-out state for a campaign; repeated calls
/// update the same row rather than duplicating the pair.
pub async fn set_campaign_membership(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(campaign_id): Path<i64>,
    Json(payload): Json<CampaignMembershipRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .storage
        .upsert_user_campaign(user.id, campaign_id, payload.joined)
        .await
        .map_err(internal)?;
    Ok(SuccessResponse::ok())
}

// --- billing webhook ---

pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Some(secret) = state.webhook_secret.as_deref() else {
        return Err(error(
            StatusCode::BAD_REQUEST,
            "webhook secret not configured",
        ));
    };

    let signature = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| error(StatusCode::BAD_REQUEST, "missing signature header"))?;

    verify_signature(&body, signature, secret)
        .map_err(|e| error(StatusCode::BAD_REQUEST, e.to_string()))?;

    let event = parse_event(&body)
        .map_err(|_| error(StatusCode::BAD_REQUEST, "unreadable event payload"))?;

    state.reconciler.apply(event).await.map_err(internal)?;
    Ok(SuccessResponse::ok())
}

// --- misc ---

pub async fn health_check() -> Json<SuccessResponse> {
    SuccessResponse::ok()
}

//! Click/view ingestion endpoints.

use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::handlers::{AppState, ErrorResponse, SuccessResponse};
use crate::ingest::{extract_client_ip, ClickRequest, IngestError, RequestContext, ViewRequest};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn ingest_error(err: IngestError) -> ApiError {
    let status = match &err {
        IngestError::BotDenied => StatusCode::FORBIDDEN,
        IngestError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        IngestError::Invalid(_) => StatusCode::BAD_REQUEST,
        IngestError::NotFound => StatusCode::NOT_FOUND,
        IngestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn request_context(headers: &HeaderMap, addr: SocketAddr) -> RequestContext {
    RequestContext {
        user_agent: headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        ip: extract_client_ip(headers, addr.ip()),
    }
}

pub async fn record_click(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<ClickRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let ctx = request_context(&headers, addr);
    state
        .pipeline
        .record_click(payload, ctx)
        .await
        .map_err(ingest_error)?;
    Ok(SuccessResponse::ok())
}

pub async fn record_view(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<ViewRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let ctx = request_context(&headers, addr);
    state
        .pipeline
        .record_view(payload, ctx)
        .await
        .map_err(ingest_error)?;
    Ok(SuccessResponse::ok())
}

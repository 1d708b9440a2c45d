//! Dashboard analytics endpoints
//!
//! All four share the same date-range contract: `start` and `end` as
//! YYYY-MM-DD, end inclusive through the last millisecond of that day.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::analytics::models::{DailyCounts, DateRange, DimensionCounts, SummaryReport};
use crate::api::handlers::{AppState, ErrorResponse};
use crate::auth::AuthUser;

type ApiError = (StatusCode, Json<ErrorResponse>);

#[derive(Debug, Deserialize)]
pub struct RangeParams {
    pub start: String,
    pub end: String,
}

fn parse_range(params: &RangeParams) -> Result<DateRange, ApiError> {
    DateRange::parse(&params.start, &params.end).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })
}

fn internal(err: anyhow::Error) -> ApiError {
    tracing::error!(error = %err, "aggregation query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal server error".to_string(),
        }),
    )
}

pub async fn summary(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<SummaryReport>, ApiError> {
    let range = parse_range(&params)?;
    let report = state
        .aggregator
        .summary(user.id, range)
        .await
        .map_err(internal)?;
    Ok(Json(report))
}

pub async fn timeseries(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<DailyCounts>>, ApiError> {
    let range = parse_range(&params)?;
    let series = state
        .aggregator
        .timeseries(user.id, range)
        .await
        .map_err(internal)?;
    Ok(Json(series))
}

pub async fn geography(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<DimensionCounts>>, ApiError> {
    let range = parse_range(&params)?;
    let rows = state
        .aggregator
        .geography(user.id, range)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

pub async fn referrer(
    State(state): State<Arc<AppState>>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<DimensionCounts>>, ApiError> {
    let range = parse_range(&params)?;
    let rows = state
        .aggregator
        .referrer(user.id, range)
        .await
        .map_err(internal)?;
    Ok(Json(rows))
}

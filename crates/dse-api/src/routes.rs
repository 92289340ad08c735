//! Route handlers for the JSON read API.
//!
//! Cached board routes serve the current snapshot document and stamp it with
//! the exchange-local write time. Archive routes reconcile the requested
//! range before answering; the code-scoped variant is a pure read.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use dse_core::{CacheKind, DateRange, DseError, InstrumentCode};

use crate::error::ApiResult;
use crate::state::AppState;

/// Timestamp format for `lastUpdated`, exchange-local.
const LAST_UPDATED_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/live", get(live_board))
        .route("/live/indices", get(indices))
        .route("/live/:code", get(live_quote))
        .route("/dse30", get(dse30))
        .route("/top20", get(top20))
        .route("/news", get(news))
        .route("/archive", get(archive_range))
        .route("/archive/latest", get(archive_latest))
        .route("/archive/:code", get(archive_for_code))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Wraps a cache document as `{ "lastUpdated": ..., "data": ... }`.
async fn cached(state: &AppState, kind: CacheKind) -> ApiResult<Json<Value>> {
    let doc = state.snapshots.get_or_refresh(kind).await?;
    let last_updated = doc
        .written_at
        .with_timezone(&state.exchange_tz)
        .format(LAST_UPDATED_FORMAT)
        .to_string();
    Ok(Json(json!({
        "lastUpdated": last_updated,
        "data": doc.payload,
    })))
}

async fn live_board(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    cached(&state, CacheKind::Live).await
}

async fn indices(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    cached(&state, CacheKind::Indices).await
}

async fn dse30(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    cached(&state, CacheKind::Dse30).await
}

async fn top20(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    cached(&state, CacheKind::Top20).await
}

async fn live_quote(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Value>> {
    let quote = state.snapshots.live_quote(&code).await?;
    Ok(Json(serde_json::to_value(&quote).map_err(to_parse_error)?))
}

async fn news(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let articles = state.snapshots.news().await?;
    Ok(Json(
        serde_json::to_value(&articles).map_err(to_parse_error)?,
    ))
}

/// Inclusive date range query, `?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD`.
#[derive(Debug, Deserialize)]
struct RangeQuery {
    #[serde(rename = "startDate")]
    start_date: Option<NaiveDate>,
    #[serde(rename = "endDate")]
    end_date: Option<NaiveDate>,
}

impl RangeQuery {
    fn into_range(self) -> Result<DateRange, DseError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Ok(DateRange::new(start, end)),
            _ => Err(DseError::InvalidParameter(
                "startDate and endDate query parameters are required (YYYY-MM-DD)".to_string(),
            )),
        }
    }
}

async fn archive_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Value>> {
    let records = state.reconciler.get_range(query.into_range()?).await?;
    Ok(Json(serde_json::to_value(&records).map_err(to_parse_error)?))
}

async fn archive_for_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Value>> {
    let records = state
        .reconciler
        .get_range_for_code(&InstrumentCode::new(code), query.into_range()?)
        .await?;
    Ok(Json(serde_json::to_value(&records).map_err(to_parse_error)?))
}

async fn archive_latest(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let latest = state
        .reconciler
        .latest()
        .await?
        .ok_or_else(|| DseError::NotFound("Archive is empty".to_string()))?;
    Ok(Json(json!({
        "latest": latest.record,
        "duplicateCount": latest.duplicate_count,
    })))
}

fn to_parse_error(e: serde_json::Error) -> DseError {
    DseError::Parse(e.to_string())
}

//! Catalog lookups: channels, topics, single shows and their playback URLs.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use mediathek_core::{CatalogError, CatalogStats, Show, ShowId, UrlQuality, ANY};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn catalog_error(e: CatalogError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        CatalogError::NotFound(_) => error_response(StatusCode::NOT_FOUND, e),
        _ => {
            error!("Catalog error: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChannelsResponse {
    pub channels: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TopicsQuery {
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TopicsResponse {
    pub channel: String,
    pub topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    #[serde(default)]
    pub quality: UrlQuality,
}

#[derive(Debug, Serialize)]
pub struct UrlResponse {
    pub id: ShowId,
    pub quality: UrlQuality,
    pub url: String,
}

/// GET /catalog/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<CatalogStats> {
    state.catalog().stats().map(Json).map_err(catalog_error)
}

/// GET /channels
///
/// The first entry is always the "any channel" sentinel.
pub async fn list_channels(State(state): State<Arc<AppState>>) -> ApiResult<ChannelsResponse> {
    let channels = state.catalog().distinct_channels().map_err(catalog_error)?;
    Ok(Json(ChannelsResponse { channels }))
}

/// GET /topics?channel=
pub async fn list_topics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TopicsQuery>,
) -> ApiResult<TopicsResponse> {
    let channel = query.channel.unwrap_or_else(|| ANY.to_string());
    let topics = state
        .catalog()
        .distinct_topics(&channel)
        .map_err(catalog_error)?;
    Ok(Json(TopicsResponse { channel, topics }))
}

/// GET /shows/{id}
pub async fn get_show(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Show> {
    state
        .catalog()
        .fetch(ShowId(id))
        .map(Json)
        .map_err(catalog_error)
}

/// GET /shows/{id}/url?quality=
///
/// Falls back to the other qualities when the preferred one is missing.
pub async fn get_show_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<UrlQuery>,
) -> ApiResult<UrlResponse> {
    let show = state.catalog().fetch(ShowId(id)).map_err(catalog_error)?;
    let url = show.preferred_url(query.quality).ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("Show {} has no playback URL", show.id),
        )
    })?;

    Ok(Json(UrlResponse {
        id: show.id,
        quality: query.quality,
        url: url.to_string(),
    }))
}

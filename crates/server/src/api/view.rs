//! The shared lazy view: filter/sort, paging and formatted rows.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use mediathek_core::{LazyIndexView, ShowField, ShowFilter, ShowId, SortKey, SortOrder};

use super::handlers::{error_response, ErrorResponse};
use crate::state::AppState;

/// Rows returned by `GET /view/rows` when no count is given.
const DEFAULT_ROW_COUNT: usize = 50;

#[derive(Debug, Serialize)]
pub struct ViewResponse {
    pub row_count: usize,
    pub total: usize,
    pub can_fetch_more: bool,
    pub filter: ShowFilter,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub channels: Vec<String>,
    pub topics: Vec<String>,
}

impl ViewResponse {
    fn from_view(view: &LazyIndexView) -> Self {
        Self {
            row_count: view.row_count(),
            total: view.total(),
            can_fetch_more: view.can_fetch_more(),
            filter: view.filter().clone(),
            sort_key: view.sort_key(),
            sort_order: view.sort_order(),
            channels: view.channels().to_vec(),
            topics: view.topics().to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SetViewRequest {
    #[serde(default)]
    pub filter: ShowFilter,
    #[serde(default)]
    pub sort_key: SortKey,
    #[serde(default)]
    pub sort_order: SortOrder,
}

#[derive(Debug, Serialize)]
pub struct FetchMoreResponse {
    pub added: usize,
    pub row_count: usize,
    pub can_fetch_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct RowsQuery {
    #[serde(default)]
    pub start: usize,
    pub count: Option<usize>,
}

/// One table row, formatted for display.
#[derive(Debug, Serialize)]
pub struct RowResponse {
    pub row: usize,
    pub id: ShowId,
    pub channel: String,
    pub topic: String,
    pub title: String,
    pub date: String,
    pub time: String,
    pub duration: String,
}

#[derive(Debug, Serialize)]
pub struct RowsResponse {
    pub start: usize,
    pub rows: Vec<RowResponse>,
}

/// GET /view
pub async fn get_view(State(state): State<Arc<AppState>>) -> Json<ViewResponse> {
    let view = state.view().lock().await;
    Json(ViewResponse::from_view(&view))
}

/// PUT /view
pub async fn set_view(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetViewRequest>,
) -> Result<Json<ViewResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut view = state.view().lock().await;
    view.set_filter_and_sort(request.filter, request.sort_key, request.sort_order)
        .map_err(|e| {
            error!("Failed to apply view filter: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        })?;
    debug!(total = view.total(), "View filter applied");
    Ok(Json(ViewResponse::from_view(&view)))
}

/// POST /view/more
pub async fn fetch_more(State(state): State<Arc<AppState>>) -> Json<FetchMoreResponse> {
    let mut view = state.view().lock().await;
    let added = view.fetch_more();
    Json(FetchMoreResponse {
        added,
        row_count: view.row_count(),
        can_fetch_more: view.can_fetch_more(),
    })
}

/// GET /view/rows?start=&count=
///
/// Only rows inside the fetched prefix are returned. Rows whose show
/// vanished with a replaced snapshot are left out.
pub async fn get_rows(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RowsQuery>,
) -> Json<RowsResponse> {
    let view = state.view().lock().await;
    let end = query
        .start
        .saturating_add(query.count.unwrap_or(DEFAULT_ROW_COUNT))
        .min(view.row_count());

    let rows = (query.start..end)
        .filter_map(|row| format_row(&view, row))
        .collect();

    Json(RowsResponse {
        start: query.start,
        rows,
    })
}

fn format_row(view: &LazyIndexView, row: usize) -> Option<RowResponse> {
    let show = view.show_at(row)?;
    let [channel, topic, title, date, time, duration] =
        ShowField::COLUMNS.map(|field| show.field(field).to_string());

    Some(RowResponse {
        row,
        id: show.id,
        channel,
        topic,
        title,
        date,
        time,
        duration,
    })
}

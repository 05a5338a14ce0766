use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::{catalog, handlers, middleware::metrics_middleware, sync, view, ws};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Sync
        .route("/sync", get(sync::get_status).post(sync::trigger_refresh))
        .route("/sync/cancel", post(sync::cancel_refresh))
        // Catalog
        .route("/catalog/stats", get(catalog::get_stats))
        .route("/channels", get(catalog::list_channels))
        .route("/topics", get(catalog::list_topics))
        .route("/shows/{id}", get(catalog::get_show))
        .route("/shows/{id}/url", get(catalog::get_show_url))
        // Shared view
        .route("/view", get(view::get_view).put(view::set_view))
        .route("/view/more", post(view::fetch_more))
        .route("/view/rows", get(view::get_rows))
        // Live updates
        .route("/ws", get(ws::ws_handler));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

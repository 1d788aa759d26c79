use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::handlers::{
    add_comment_handler, create_video_handler, delete_comment_handler, get_video_handler,
    health_handler, list_videos_handler,
};
use crate::models::AppState;
use crate::readiness::require_ready;

pub fn build_router(state: Arc<AppState>) -> Router {
    // Uploaded video files are served by the `/videos/:id` handler, so they
    // sit behind the readiness gate together with the catalog.
    let catalog_routes = Router::new()
        .route("/videos", get(list_videos_handler).post(create_video_handler))
        .route("/videos/:id", get(get_video_handler))
        .route("/videos/:id/comments", post(add_comment_handler))
        .route("/videos/:id/comments/:comment_id", delete(delete_comment_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_ready));

    Router::new()
        .route("/health", get(health_handler))
        .merge(catalog_routes)
        .nest_service("/images", ServeDir::new(state.config.images_dir()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

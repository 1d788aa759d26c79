use crate::{
    catalog::CatalogError,
    models::{
        AppState, Comment, CommentRequest, HealthResponse, MessageResponse, NewVideo, UploadedAssets,
        Video, VideoListing,
    },
    uploads::{self, UploadError, UploadTarget},
};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::{path::Component, sync::Arc};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{error, info, warn};

/// Limit for non-multipart creation bodies.
const JSON_BODY_LIMIT: usize = 1024 * 1024;

type ApiError = (StatusCode, Json<MessageResponse>);

fn catalog_failure(e: CatalogError) -> ApiError {
    let status = match e {
        CatalogError::VideoNotFound | CatalogError::CommentNotFound => StatusCode::NOT_FOUND,
        CatalogError::InvalidComment | CatalogError::MissingFields(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(MessageResponse::new(e.to_string())))
}

fn upload_failure(e: UploadError) -> ApiError {
    let status = e.status();
    if status.is_server_error() {
        error!("[POST /videos] ❌ {}", e);
    } else {
        warn!("[POST /videos] Rejected upload: {}", e);
    }
    (status, Json(MessageResponse::new(e.to_string())))
}

/// List the catalog
pub async fn list_videos_handler(State(state): State<Arc<AppState>>) -> Json<VideoListing> {
    let listing = state.catalog.list_videos().await;
    info!("[GET /videos] 📊 Returning {} videos", listing.len());
    Json(listing)
}

/// Serve an uploaded video file, or the catalog record with that id
pub async fn get_video_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    request: Request,
) -> Response {
    let mut components = std::path::Path::new(&id).components();
    let single_file_name = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if single_file_name {
        let file_path = state.config.videos_dir().join(&id);
        if tokio::fs::metadata(&file_path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return match ServeFile::new(file_path).oneshot(request).await {
                Ok(response) => response.map(Body::new),
                Err(never) => match never {},
            };
        }
    }

    match state.catalog.get_video(&id).await {
        Ok(video) => Json(video).into_response(),
        Err(e) => catalog_failure(e).into_response(),
    }
}

/// Create a video from a JSON or multipart body
pub async fn create_video_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<Video>), ApiError> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let target = UploadTarget::from_config(&state.config);
    let (fields, assets) = if content_type.starts_with("multipart/form-data") {
        uploads::read_video_form(&content_type, request.into_body(), &target)
            .await
            .map_err(upload_failure)?
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), JSON_BODY_LIMIT)
            .await
            .map_err(|e| {
                warn!("[POST /videos] Failed to read request body: {}", e);
                (
                    StatusCode::BAD_REQUEST,
                    Json(MessageResponse::new("Failed to read request body")),
                )
            })?;
        let fields = serde_json::from_slice::<NewVideo>(&bytes).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(MessageResponse::new(format!("Invalid request body: {}", e))),
            )
        })?;
        (fields, UploadedAssets::default())
    };

    let video = match state.catalog.create_video(fields, assets.clone()).await {
        Ok(video) => video,
        Err(e) => {
            uploads::discard(&assets, &target).await;
            return Err(catalog_failure(e));
        }
    };

    info!("[POST /videos] ✅ SUCCESS - Video ID: {}", video.id);
    Ok((StatusCode::CREATED, Json(video)))
}

/// Append an anonymous comment to a video
pub async fn add_comment_handler(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let text = payload
        .ok()
        .and_then(|Json(body)| body.comment)
        .and_then(|value| value.as_str().map(str::to_owned));

    let comment = state
        .catalog
        .add_comment(&video_id, text.as_deref())
        .await
        .map_err(catalog_failure)?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment_handler(
    State(state): State<Arc<AppState>>,
    Path((video_id, comment_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state
        .catalog
        .delete_comment(&video_id, &comment_id)
        .await
        .map_err(catalog_failure)?;

    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ready: state.readiness.is_ready(),
        videos: state.catalog.count().await,
    })
}

use axum::{
    extract::{Request, State},
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::debug;

use crate::models::{AppState, MessageResponse};

/// Closed until the first import attempt has finished.
#[derive(Clone, Debug, Default)]
pub struct Readiness {
    ready: Arc<AtomicBool>,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open() -> Self {
        let readiness = Self::new();
        readiness.mark_ready();
        readiness
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}

pub async fn require_ready(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if state.readiness.is_ready() {
        return next.run(request).await;
    }

    debug!(
        "[gate] Rejecting {} {} while catalog is loading",
        request.method(),
        request.uri().path()
    );
    let mut response = (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(MessageResponse::new("Catalog is still loading")),
    )
        .into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from_static("1"));
    response
}

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header::{ACCEPT_RANGES, ALLOW, RANGE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::{local, object, MediaError, ObjectStore, ResourceLocation};

/// Shared by every request; holds no per-request state.
#[derive(Clone)]
pub struct MediaState {
    store: Arc<dyn ObjectStore>,
}

impl MediaState {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        MediaState { store }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaQuery {
    filepath: String,
}

/// GET, HEAD and OPTIONS on `route`.
pub fn router(route: &str, state: MediaState) -> Router {
    Router::new()
        .route(route, get(get_media).head(head_media).options(options_media))
        .with_state(state)
}

#[tracing::instrument(name = "media_get", skip_all, fields(filepath = %query.filepath))]
async fn get_media(
    State(state): State<MediaState>,
    Query(query): Query<MediaQuery>,
    headers: HeaderMap,
) -> Result<Response, MediaError> {
    // a Range value that is not visible ASCII is as good as malformed
    let range = headers.get(RANGE).and_then(|value| value.to_str().ok());

    match ResourceLocation::parse(&query.filepath) {
        ResourceLocation::RemoteUrl(url) => Ok(Redirect::temporary(&url).into_response()),
        ResourceLocation::ObjectStoreRef { bucket, key } => {
            object::get(state.store.as_ref(), &bucket, &key, range).await
        }
        ResourceLocation::LocalPath(path) => local::get(&path, range).await,
    }
}

/// Range is never consulted; Content-Length is always the full size.
#[tracing::instrument(name = "media_head", skip_all, fields(filepath = %query.filepath))]
async fn head_media(
    State(state): State<MediaState>,
    Query(query): Query<MediaQuery>,
) -> Result<Response, MediaError> {
    match ResourceLocation::parse(&query.filepath) {
        ResourceLocation::RemoteUrl(url) => Ok(Redirect::temporary(&url).into_response()),
        ResourceLocation::ObjectStoreRef { bucket, key } => {
            object::head(state.store.as_ref(), &bucket, &key).await
        }
        ResourceLocation::LocalPath(path) => local::head(&path).await,
    }
}

async fn options_media() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(ACCEPT_RANGES, "bytes"), (ALLOW, "OPTIONS, GET, HEAD")],
    )
}

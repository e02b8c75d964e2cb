pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::StorageConfig;
use crate::services::naming::SessionNamer;
use crate::services::storage::StorageService;
use axum::{
    Router,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Route prefix owned by the upload subsystem; unmapped paths under it get
/// the structured no-such-api error instead of a bare 404.
pub const API_PREFIX: &str = "/apis/v1/upload";

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageService>,
    pub namer: Arc<SessionNamer>,
    pub config: StorageConfig,
}

pub fn create_app(state: AppState) -> Router {
    let store = ServeDir::new(state.storage.store_dir());
    Router::new()
        .route(
            &format!("{API_PREFIX}/chunked/start"),
            post(handlers::chunked::start),
        )
        .route(
            &format!("{API_PREFIX}/chunked/upload"),
            post(handlers::chunked::upload),
        )
        .route(
            &format!("{API_PREFIX}/chunked/end"),
            post(handlers::chunked::end),
        )
        .route(&format!("{API_PREFIX}/form"), post(handlers::form::upload_form))
        .nest_service("/store", store)
        .fallback(api_fallback)
        .with_state(state)
}

async fn api_fallback(uri: Uri) -> Response {
    if uri.path().starts_with(API_PREFIX) {
        error::AppError::NoSuchApi(uri.path().to_string()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

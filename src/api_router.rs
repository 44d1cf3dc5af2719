//! Unified API router.
//!
//! Public auth endpoints stay outside the authentication layer; everything
//! else sits behind the bearer-token middleware.

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::middleware::authentication_middleware;
use crate::core::shared::state::AppState;

pub fn configure_api_routes(state: Arc<AppState>) -> Router {
    // Room for a full multipart request: max files * max file size plus
    // headroom for the text fields and boundaries.
    let body_limit = state.config.uploads.max_file_bytes
        * state.config.uploads.max_files_per_request
        + 1024 * 1024;

    let protected = Router::new()
        .merge(crate::auth::configure_auth_routes())
        .merge(crate::issues::configure_issues_routes())
        .merge(crate::dashboard::configure_dashboard_routes())
        .layer(from_fn_with_state(state.clone(), authentication_middleware));

    Router::new()
        .merge(crate::auth::configure_public_auth_routes())
        .merge(protected)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

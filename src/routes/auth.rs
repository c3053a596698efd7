use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

/// Room for multipart framing on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/me", get(handlers::me))
        .route("/api/auth/logout", post(handlers::logout))
        .route(
            "/api/auth/upload-profile-picture",
            post(handlers::upload_profile_picture).layer(DefaultBodyLimit::max(
                state.avatars.max_bytes() + MULTIPART_OVERHEAD,
            )),
        )
}

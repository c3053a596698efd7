pub mod auth;
pub mod home;
pub mod posts;
pub mod profiles;
pub mod uploads;
pub mod users;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full HTTP surface, ready to serve.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(home::router())
        .merge(auth::router(&state))
        .merge(posts::router())
        .merge(profiles::router())
        .merge(users::router())
        .merge(uploads::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::users;

#[derive(Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/users/{id}", get(get_user))
}

async fn get_user(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<UserSummary>> {
    let user = users::find_by_id(&state.db, &id)?
        .ok_or_else(|| AppError::user_not_found(&id))?;

    Ok(Json(UserSummary {
        id: user.id,
        username: user.username,
        email: user.email,
    }))
}

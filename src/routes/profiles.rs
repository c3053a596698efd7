use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::feed::domain::FeedItem;
use crate::feed::{FeedScope, UserId};
use crate::state::AppState;
use crate::users::{self, PublicUser};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub username: String,
    /// Only present when viewers look at their own profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub posts: Vec<FeedItem>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile/search/{query}", get(search))
        .route("/api/profile/{username}", get(profile))
}

async fn search(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(query): Path<String>,
) -> AppResult<Json<Vec<PublicUser>>> {
    Ok(Json(users::search_by_username(&state.db, &query)?))
}

async fn profile(
    State(state): State<AppState>,
    viewer: CurrentUser,
    Path(username): Path<String>,
) -> AppResult<Json<Profile>> {
    let user = users::find_by_username(&state.db, &username)?
        .ok_or_else(|| AppError::user_not_found(&username))?;

    let owner = UserId::new(user.id.clone());
    let posts = state
        .feed
        .list_feed(Some(&viewer.id), &FeedScope::ByAuthor(owner.clone()))
        .await?;

    Ok(Json(Profile {
        email: (viewer.id == owner).then_some(user.email),
        id: user.id,
        username: user.username,
        bio: user.bio,
        avatar_url: user.avatar_path,
        created_at: user.created_at,
        posts,
    }))
}

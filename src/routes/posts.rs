use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::{CurrentUser, MaybeUser};
use crate::feed::domain::{FeedItem, ReactionCounts, ToggleOutcome};
use crate::feed::{FeedScope, PostId, ReactionAction, ReactionState, UserId};
use crate::state::AppState;

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreatePostRequest {
    pub content: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route("/api/my-posts", get(my_posts))
        .route("/api/posts/user/{user_id}", get(posts_by_user))
        .route("/api/posts/{id}", get(get_post).delete(delete_post))
        .route("/api/posts/{id}/like", post(like_post))
        .route("/api/posts/{id}/dislike", post(dislike_post))
}

async fn list_posts(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> AppResult<Json<Vec<FeedItem>>> {
    let items = state.feed.list_feed(viewer.id(), &FeedScope::Global).await?;
    Ok(Json(items))
}

async fn my_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<FeedItem>>> {
    let scope = FeedScope::ByAuthor(user.id.clone());
    let items = state.feed.list_feed(Some(&user.id), &scope).await?;
    Ok(Json(items))
}

async fn posts_by_user(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(author): Path<String>,
) -> AppResult<Json<Vec<FeedItem>>> {
    let scope = FeedScope::ByAuthor(UserId::new(author));
    let items = state.feed.list_feed(Some(&user.id), &scope).await?;
    Ok(Json(items))
}

async fn get_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> AppResult<Json<FeedItem>> {
    let item = state.feed.item(viewer.id(), &PostId::new(id)).await?;
    Ok(Json(item))
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Response> {
    let post = state.posts.create(&user.id, &req.content).await?;
    tracing::info!("{} created post {}", user.username, post.id);

    let item = FeedItem::new(post, ReactionCounts::default(), ReactionState::Neutral);
    Ok((StatusCode::CREATED, Json(item)).into_response())
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let post_id = PostId::new(id);
    state.posts.delete(&post_id, &user.id).await?;
    tracing::info!("{} deleted post {}", user.username, post_id);

    Ok(Json(
        serde_json::json!({ "message": "Post deleted successfully" }),
    ))
}

async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ToggleOutcome>> {
    react(&state, &user, id, ReactionAction::Like).await
}

async fn dislike_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ToggleOutcome>> {
    react(&state, &user, id, ReactionAction::Dislike).await
}

async fn react(
    state: &AppState,
    user: &CurrentUser,
    post_id: String,
    action: ReactionAction,
) -> AppResult<Json<ToggleOutcome>> {
    let outcome = state
        .toggles
        .toggle(&PostId::new(post_id), &user.id, action)
        .await?;
    Ok(Json(outcome))
}

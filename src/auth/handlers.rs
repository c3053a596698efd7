use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{password, session};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::users::{self, NewUser};

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct AccountSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AccountSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub image_url: String,
}

fn required<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(value)
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let username = required(&req.username, "Username")?;
    let email = required(&req.email, "Email")?;
    // Checked trimmed, hashed as typed
    required(&req.password, "Password")?;

    let password_hash = password::hash_password(&req.password, state.config.auth.bcrypt_cost)?;
    let user = users::create_user(
        &state.db,
        &NewUser {
            username,
            email,
            password_hash: &password_hash,
        },
    )?;

    tracing::info!("Registered user {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "User registered successfully" })),
    )
        .into_response())
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let invalid = || AppError::BadRequest("Invalid credentials".into());

    let user = users::find_by_email(&state.db, req.email.trim())?.ok_or_else(invalid)?;
    if !password::verify_password(&req.password, &user.password_hash) {
        return Err(invalid());
    }

    let token = session::create_session(&state.db, &user.id, state.config.auth.session_hours)?;

    Ok(Json(LoginResponse {
        token,
        user: AccountSummary {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    }))
}

/// GET /api/auth/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<MeResponse>> {
    let user = users::find_by_id(&state.db, user.id.as_str())?
        .ok_or_else(|| AppError::user_not_found(&user.id))?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        bio: user.bio,
        avatar_url: user.avatar_path,
    }))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    session::delete_session(&state.db, &user.token)?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Logged out" })),
    )
        .into_response())
}

/// POST /api/auth/upload-profile-picture (multipart field `image`)
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() == Some("image") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid upload: {}", e)))?;
            upload = Some((file_name, bytes));
            break;
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("No file uploaded".into()))?;

    let image_url = state.avatars.save(&file_name, &bytes).await?;
    let previous = match users::set_avatar_path(&state.db, user.id.as_str(), &image_url) {
        Ok(previous) => previous,
        Err(e) => {
            state.avatars.remove(&image_url).await;
            return Err(e);
        }
    };

    if let Some(previous) = previous {
        state.avatars.remove(&previous).await;
    }

    tracing::info!("Updated avatar for {}: {}", user.username, image_url);
    Ok(Json(UploadResponse { image_url }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_and_rejects_blank() {
        assert_eq!(required("  alice ", "Username").unwrap(), "alice");
        assert!(matches!(
            required("   ", "Username"),
            Err(AppError::BadRequest(msg)) if msg == "Username is required"
        ));
    }

    #[test]
    fn register_request_fields_default_to_empty() {
        let req: RegisterRequest = serde_json::from_str(r#"{"username":"alice"}"#).unwrap();
        assert_eq!(req.username, "alice");
        assert!(req.email.is_empty());
        assert!(req.password.is_empty());
    }
}

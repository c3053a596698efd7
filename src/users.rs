use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::db::models::User;
use crate::db::now_timestamp;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

/// Search results are capped at this many users.
pub const SEARCH_LIMIT: usize = 5;

/// Queries shorter than this return no results.
pub const SEARCH_MIN_CHARS: usize = 2;

/// Identity fields visible to any authenticated user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            avatar_url: user.avatar_path,
        }
    }
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

pub fn create_user(pool: &DbPool, new_user: &NewUser<'_>) -> AppResult<User> {
    let conn = pool.get()?;

    let email_taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
        params![new_user.email],
        |row| row.get(0),
    )?;
    if email_taken {
        return Err(AppError::BadRequest("Email already in use".into()));
    }

    let username_taken: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![new_user.username],
        |row| row.get(0),
    )?;
    if username_taken {
        return Err(AppError::BadRequest("Username already taken".into()));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let created_at = now_timestamp();

    // The UNIQUE constraints still catch a concurrent registration
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            new_user.username,
            new_user.email,
            new_user.password_hash,
            created_at
        ],
    )
    .map_err(|e| match e.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => {
            AppError::BadRequest("Username or email already in use".into())
        }
        _ => AppError::Database(e),
    })?;

    Ok(User {
        id,
        username: new_user.username.to_string(),
        email: new_user.email.to_string(),
        password_hash: new_user.password_hash.to_string(),
        bio: None,
        avatar_path: None,
        created_at,
    })
}

fn find_one(pool: &DbPool, column: &str, value: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE {} = ?1", User::COLUMNS, column),
            params![value],
            User::from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_id(pool: &DbPool, id: &str) -> AppResult<Option<User>> {
    find_one(pool, "id", id)
}

pub fn find_by_email(pool: &DbPool, email: &str) -> AppResult<Option<User>> {
    find_one(pool, "email", email)
}

pub fn find_by_username(pool: &DbPool, username: &str) -> AppResult<Option<User>> {
    find_one(pool, "username", username)
}

/// Case-insensitive substring match on username.
pub fn search_by_username(pool: &DbPool, query: &str) -> AppResult<Vec<PublicUser>> {
    let query = query.trim();
    if query.chars().count() < SEARCH_MIN_CHARS {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", escape_like(query));
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, avatar_path FROM users
         WHERE username LIKE ?1 ESCAPE '\\'
         ORDER BY username COLLATE NOCASE
         LIMIT ?2",
    )?;

    let users = stmt
        .query_map(params![pattern, SEARCH_LIMIT as i64], |row| {
            Ok(PublicUser {
                id: row.get(0)?,
                username: row.get(1)?,
                avatar_url: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(users)
}

/// Point the user's avatar at `path`. Returns the previous path, if any.
pub fn set_avatar_path(pool: &DbPool, user_id: &str, path: &str) -> AppResult<Option<String>> {
    let conn = pool.get()?;

    let previous: Option<Option<String>> = conn
        .query_row(
            "SELECT avatar_path FROM users WHERE id = ?1",
            params![user_id],
            |row| row.get(0),
        )
        .optional()?;
    let previous = previous.ok_or_else(|| AppError::user_not_found(user_id))?;

    conn.execute(
        "UPDATE users SET avatar_path = ?1 WHERE id = ?2",
        params![path, user_id],
    )?;

    Ok(previous)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

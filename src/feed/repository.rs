// Repository pattern - isolates all database side effects
use crate::db::now_timestamp;
use crate::feed::domain::*;
use crate::state::DbPool;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl RepositoryError {
    fn post_not_found(post_id: &PostId) -> Self {
        tracing::debug!("Post {} not found", post_id);
        RepositoryError::NotFound("Post not found".into())
    }

    fn user_not_found(user_id: &UserId) -> Self {
        tracing::debug!("User {} not found", user_id);
        RepositoryError::NotFound("User not found".into())
    }
}

/// Sort order for post listings. Ties on `created_at` fall back to post id
/// in the same direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl PostOrder {
    fn sql(self) -> &'static str {
        match self {
            PostOrder::NewestFirst => "p.created_at DESC, p.id DESC",
            PostOrder::OldestFirst => "p.created_at ASC, p.id ASC",
        }
    }
}

/// Post persistence
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Validate and store a new post
    async fn create(&self, author: &UserId, content: &str) -> Result<Post, RepositoryError>;

    /// Delete a post owned by `requesting_user`, together with its reactions
    async fn delete(&self, post_id: &PostId, requesting_user: &UserId)
        -> Result<(), RepositoryError>;

    async fn get(&self, post_id: &PostId) -> Result<Post, RepositoryError>;

    async fn list(&self, scope: &FeedScope, order: PostOrder)
        -> Result<Vec<Post>, RepositoryError>;
}

/// Reaction persistence, keyed by (post, user)
#[async_trait]
pub trait ReactionStore: Send + Sync {
    async fn get_reaction(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<ReactionState, RepositoryError>;

    /// Move the single row to `state`; neutral deletes it
    async fn set_reaction(
        &self,
        post_id: &PostId,
        user_id: &UserId,
        state: ReactionState,
    ) -> Result<(), RepositoryError>;

    async fn count_by_post(&self, post_id: &PostId) -> Result<ReactionCounts, RepositoryError>;

    /// Returns the number of rows removed
    async fn delete_all_for_post(&self, post_id: &PostId) -> Result<u64, RepositoryError>;

    /// Atomically read the current state, apply `action` and persist the result
    async fn toggle(
        &self,
        post_id: &PostId,
        user_id: &UserId,
        action: ReactionAction,
    ) -> Result<ReactionState, RepositoryError>;
}

/// Type alias for Arc-wrapped stores (for AppState)
pub type DynPostStore = Arc<dyn PostStore>;
pub type DynReactionStore = Arc<dyn ReactionStore>;

/// Run `f` inside an IMMEDIATE transaction. IMMEDIATE takes the write lock
/// up front, so two read-modify-write units on the same database serialize
/// instead of both reading stale state. Any error, including a failed
/// commit, rolls back before the connection returns to the pool.
fn in_transaction<T>(
    conn: &mut Connection,
    f: impl FnOnce(&Connection) -> Result<T, RepositoryError>,
) -> Result<T, RepositoryError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

const POST_SELECT: &str = "SELECT p.id, p.content, p.created_at, u.id, u.username, u.avatar_path
     FROM posts p
     JOIN users u ON u.id = p.user_id";

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: PostId(row.get(0)?),
        content: row.get(1)?,
        created_at: row.get(2)?,
        author: Author {
            id: UserId(row.get(3)?),
            username: row.get(4)?,
            avatar_url: row.get(5)?,
        },
    })
}

fn load_post(conn: &Connection, post_id: &PostId) -> Result<Post, RepositoryError> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", POST_SELECT),
        params![post_id.as_str()],
        post_from_row,
    )
    .optional()?
    .ok_or_else(|| RepositoryError::post_not_found(post_id))
}

fn post_exists(conn: &Connection, post_id: &PostId) -> Result<bool, RepositoryError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post_id.as_str()],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn read_reaction(
    conn: &Connection,
    post_id: &PostId,
    user_id: &UserId,
) -> Result<ReactionState, RepositoryError> {
    let kind: Option<String> = conn
        .query_row(
            "SELECT kind FROM reactions WHERE post_id = ?1 AND user_id = ?2",
            params![post_id.as_str(), user_id.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    let kind = kind
        .map(|k| k.parse::<ReactionKind>())
        .transpose()
        .map_err(|e| {
            RepositoryError::Sql(rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                e.into(),
            ))
        })?;

    Ok(ReactionState::from_kind(kind))
}

/// Apply one write to the single row keyed by (post_id, user_id). A replace
/// is one UPDATE, so readers never see the old and new kind side by side.
fn write_reaction(
    conn: &Connection,
    post_id: &PostId,
    user_id: &UserId,
    write: ReactionWrite,
) -> Result<(), RepositoryError> {
    match write {
        ReactionWrite::Insert(kind) => {
            conn.execute(
                "INSERT INTO reactions (post_id, user_id, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    post_id.as_str(),
                    user_id.as_str(),
                    kind.as_str(),
                    now_timestamp()
                ],
            )?;
        }
        ReactionWrite::Replace(kind) => {
            conn.execute(
                "UPDATE reactions SET kind = ?3, created_at = ?4
                 WHERE post_id = ?1 AND user_id = ?2",
                params![
                    post_id.as_str(),
                    user_id.as_str(),
                    kind.as_str(),
                    now_timestamp()
                ],
            )?;
        }
        ReactionWrite::Delete => {
            conn.execute(
                "DELETE FROM reactions WHERE post_id = ?1 AND user_id = ?2",
                params![post_id.as_str(), user_id.as_str()],
            )?;
        }
    }
    Ok(())
}

/// Read the current state and write only what differs from `next`.
fn move_reaction(
    conn: &Connection,
    post_id: &PostId,
    user_id: &UserId,
    next: impl FnOnce(ReactionState) -> ReactionState,
) -> Result<ReactionState, RepositoryError> {
    let current = read_reaction(conn, post_id, user_id)?;
    let next = next(current);

    if let Some(write) = current.write_to(next) {
        write_reaction(conn, post_id, user_id, write)?;
    }

    Ok(next)
}

fn purge_reactions(conn: &Connection, post_id: &PostId) -> Result<u64, RepositoryError> {
    let rows = conn.execute(
        "DELETE FROM reactions WHERE post_id = ?1",
        params![post_id.as_str()],
    )?;
    Ok(rows as u64)
}

/// SQLite implementation
pub struct SqlitePostStore {
    pool: DbPool,
}

impl SqlitePostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for SqlitePostStore {
    async fn create(&self, author: &UserId, content: &str) -> Result<Post, RepositoryError> {
        let content = PostContent::parse(content).map_err(RepositoryError::InvalidInput)?;
        let conn = self.pool.get()?;

        let author_exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE id = ?1",
            params![author.as_str()],
            |row| row.get(0),
        )?;
        if !author_exists {
            return Err(RepositoryError::user_not_found(author));
        }

        let post_id = PostId::generate();
        conn.execute(
            "INSERT INTO posts (id, user_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                post_id.as_str(),
                author.as_str(),
                content.as_str(),
                now_timestamp()
            ],
        )?;

        load_post(&conn, &post_id)
    }

    async fn delete(
        &self,
        post_id: &PostId,
        requesting_user: &UserId,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;

        in_transaction(&mut conn, |conn| {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM posts WHERE id = ?1",
                    params![post_id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;

            let owner = owner.ok_or_else(|| RepositoryError::post_not_found(post_id))?;
            if owner != requesting_user.as_str() {
                return Err(RepositoryError::Forbidden(
                    "Unauthorized to delete this post".into(),
                ));
            }

            // Explicit so no reaction outlives its post, foreign keys or not
            purge_reactions(conn, post_id)?;
            conn.execute("DELETE FROM posts WHERE id = ?1", params![post_id.as_str()])?;
            Ok(())
        })
    }

    async fn get(&self, post_id: &PostId) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;
        load_post(&conn, post_id)
    }

    async fn list(
        &self,
        scope: &FeedScope,
        order: PostOrder,
    ) -> Result<Vec<Post>, RepositoryError> {
        let conn = self.pool.get()?;

        let posts = match scope {
            FeedScope::Global => {
                let mut stmt =
                    conn.prepare(&format!("{} ORDER BY {}", POST_SELECT, order.sql()))?;
                let rows = stmt.query_map([], post_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            FeedScope::ByAuthor(author) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE p.user_id = ?1 ORDER BY {}",
                    POST_SELECT,
                    order.sql()
                ))?;
                let rows = stmt.query_map(params![author.as_str()], post_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(posts)
    }
}

/// SQLite implementation
pub struct SqliteReactionStore {
    pool: DbPool,
}

impl SqliteReactionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReactionStore for SqliteReactionStore {
    async fn get_reaction(
        &self,
        post_id: &PostId,
        user_id: &UserId,
    ) -> Result<ReactionState, RepositoryError> {
        let conn = self.pool.get()?;
        read_reaction(&conn, post_id, user_id)
    }

    async fn set_reaction(
        &self,
        post_id: &PostId,
        user_id: &UserId,
        state: ReactionState,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.get()?;
        in_transaction(&mut conn, |conn| {
            move_reaction(conn, post_id, user_id, |_| state)?;
            Ok(())
        })
    }

    async fn count_by_post(&self, post_id: &PostId) -> Result<ReactionCounts, RepositoryError> {
        let conn = self.pool.get()?;

        let counts = conn.query_row(
            "SELECT COALESCE(SUM(kind = 'like'), 0), COALESCE(SUM(kind = 'dislike'), 0)
             FROM reactions
             WHERE post_id = ?1",
            params![post_id.as_str()],
            |row| {
                Ok(ReactionCounts {
                    liked: row.get(0)?,
                    disliked: row.get(1)?,
                })
            },
        )?;

        Ok(counts)
    }

    async fn delete_all_for_post(&self, post_id: &PostId) -> Result<u64, RepositoryError> {
        let conn = self.pool.get()?;
        purge_reactions(&conn, post_id)
    }

    async fn toggle(
        &self,
        post_id: &PostId,
        user_id: &UserId,
        action: ReactionAction,
    ) -> Result<ReactionState, RepositoryError> {
        let mut conn = self.pool.get()?;

        in_transaction(&mut conn, |conn| {
            if !post_exists(conn, post_id)? {
                return Err(RepositoryError::post_not_found(post_id));
            }

            move_reaction(conn, post_id, user_id, |current| current.toggle(action))
        })
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub bio: Option<String>,
    pub avatar_path: Option<String>,
    pub created_at: String,
}

impl User {
    pub(crate) const COLUMNS: &'static str =
        "id, username, email, password_hash, bio, avatar_path, created_at";

    pub(crate) fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            bio: row.get(4)?,
            avatar_path: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

// Domain types - Pure, immutable, no side effects
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum post length, in characters, after trimming.
pub const MAX_POST_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Time-ordered id, so descending id order breaks timestamp ties newest-first.
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A viewer's stance on one post. `Neutral` is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionState {
    #[default]
    Neutral,
    Liked,
    Disliked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    Like,
    Dislike,
}

/// What the store has to do to move from one state to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionWrite {
    Insert(ReactionKind),
    Replace(ReactionKind),
    Delete,
}

/// The stored form of a non-neutral reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Like,
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }

    pub fn state(self) -> ReactionState {
        match self {
            ReactionKind::Like => ReactionState::Liked,
            ReactionKind::Dislike => ReactionState::Disliked,
        }
    }
}

impl FromStr for ReactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(ReactionKind::Like),
            "dislike" => Ok(ReactionKind::Dislike),
            other => Err(format!("unknown reaction kind: {}", other)),
        }
    }
}

impl ReactionState {
    /// Stored kind for this state, `None` for neutral.
    pub fn kind(self) -> Option<ReactionKind> {
        match self {
            ReactionState::Neutral => None,
            ReactionState::Liked => Some(ReactionKind::Like),
            ReactionState::Disliked => Some(ReactionKind::Dislike),
        }
    }

    pub fn from_kind(kind: Option<ReactionKind>) -> Self {
        kind.map(ReactionKind::state).unwrap_or_default()
    }

    /// Toggle transition table:
    ///
    /// | current  | Like    | Dislike  |
    /// |----------|---------|----------|
    /// | Neutral  | Liked   | Disliked |
    /// | Liked    | Neutral | Disliked |
    /// | Disliked | Liked   | Neutral  |
    pub fn toggle(self, action: ReactionAction) -> ReactionState {
        match (self, action) {
            (ReactionState::Liked, ReactionAction::Like) => ReactionState::Neutral,
            (ReactionState::Disliked, ReactionAction::Dislike) => ReactionState::Neutral,
            (_, ReactionAction::Like) => ReactionState::Liked,
            (_, ReactionAction::Dislike) => ReactionState::Disliked,
        }
    }

    /// Store operation that takes `self` to `next`. `None` when nothing changes.
    pub fn write_to(self, next: ReactionState) -> Option<ReactionWrite> {
        match (self.kind(), next.kind()) {
            (None, None) => None,
            (None, Some(kind)) => Some(ReactionWrite::Insert(kind)),
            (Some(_), None) => Some(ReactionWrite::Delete),
            (Some(old), Some(new)) if old == new => None,
            (Some(_), Some(new)) => Some(ReactionWrite::Replace(new)),
        }
    }
}

/// Aggregate reaction counts for one post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReactionCounts {
    pub liked: i64,
    pub disliked: i64,
}

/// Which posts a feed read covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedScope {
    Global,
    ByAuthor(UserId),
}

/// Public identity of a post author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub author: Author,
    pub content: String,
    pub created_at: String,
}

impl Post {
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.author.id == user
    }
}

/// Validated post body: trimmed, non-empty, bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostContent(String);

impl PostContent {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let content = raw.trim();
        if content.is_empty() {
            return Err("Post content cannot be empty".into());
        }
        if content.chars().count() > MAX_POST_CHARS {
            return Err(format!(
                "Post content must be {} characters or less",
                MAX_POST_CHARS
            ));
        }
        Ok(Self(content.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A post as seen by one viewer. Derived on every read, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItem {
    #[serde(flatten)]
    pub post: Post,
    pub like_count: i64,
    pub dislike_count: i64,
    pub viewer_reaction: ReactionState,
}

impl FeedItem {
    pub fn new(post: Post, counts: ReactionCounts, viewer_reaction: ReactionState) -> Self {
        Self {
            post,
            like_count: counts.liked,
            dislike_count: counts.disliked,
            viewer_reaction,
        }
    }
}

/// Result of a toggle: the viewer's new state and a fresh recount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub post_id: PostId,
    pub viewer_reaction: ReactionState,
    pub like_count: i64,
    pub dislike_count: i64,
}

/// Error taxonomy shared by the feed core and the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthenticated,
    Forbidden,
    NotFound,
    InvalidInput,
    Internal,
}

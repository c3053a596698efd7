use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::feed::{
    DynPostStore, DynReactionStore, FeedAssembler, ReactionToggleService, SqlitePostStore,
    SqliteReactionStore,
};
use crate::uploads::AvatarStore;

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub posts: DynPostStore,
    pub feed: FeedAssembler,
    pub toggles: ReactionToggleService,
    pub avatars: AvatarStore,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let posts: DynPostStore = Arc::new(SqlitePostStore::new(db.clone()));
        let reactions: DynReactionStore = Arc::new(SqliteReactionStore::new(db.clone()));
        let avatars = AvatarStore::new(
            config.uploads_path(),
            config.storage.max_upload_bytes,
        );

        Self {
            feed: FeedAssembler::new(posts.clone(), reactions.clone()),
            toggles: ReactionToggleService::new(reactions),
            db,
            config,
            posts,
            avatars,
        }
    }
}

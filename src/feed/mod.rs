pub mod assembler;
pub mod domain;
pub mod repository;
pub mod toggle;

pub use assembler::FeedAssembler;
pub use domain::{FeedScope, PostId, ReactionAction, ReactionState, UserId};
pub use repository::{
    DynPostStore, DynReactionStore, RepositoryError, SqlitePostStore, SqliteReactionStore,
};
pub use toggle::ReactionToggleService;

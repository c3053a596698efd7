use futures::future::join_all;

use crate::feed::domain::{
    FeedItem, FeedScope, Post, PostId, ReactionCounts, ReactionState, UserId,
};
use crate::feed::repository::{DynPostStore, DynReactionStore, PostOrder, RepositoryError};

/// Read-only composition of posts and reactions into per-viewer feed items.
/// Counts are recomputed from the reaction rows on every call.
#[derive(Clone)]
pub struct FeedAssembler {
    posts: DynPostStore,
    reactions: DynReactionStore,
}

impl FeedAssembler {
    pub fn new(posts: DynPostStore, reactions: DynReactionStore) -> Self {
        Self { posts, reactions }
    }

    /// Posts in `scope`, newest first, decorated for `viewer`. An anonymous
    /// viewer always sees a neutral reaction.
    pub async fn list_feed(
        &self,
        viewer: Option<&UserId>,
        scope: &FeedScope,
    ) -> Result<Vec<FeedItem>, RepositoryError> {
        let posts = self.posts.list(scope, PostOrder::NewestFirst).await?;

        Ok(join_all(posts.into_iter().map(|post| self.decorate(post, viewer))).await)
    }

    /// A single post for `viewer`; missing posts are `NotFound`.
    pub async fn item(
        &self,
        viewer: Option<&UserId>,
        post_id: &PostId,
    ) -> Result<FeedItem, RepositoryError> {
        let post = self.posts.get(post_id).await?;
        Ok(self.decorate(post, viewer).await)
    }

    /// Failures here degrade the one item instead of the whole feed.
    async fn decorate(&self, post: Post, viewer: Option<&UserId>) -> FeedItem {
        let counts = match self.reactions.count_by_post(&post.id).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!("Falling back to zero counts for post {}: {}", post.id, e);
                return FeedItem::new(post, ReactionCounts::default(), ReactionState::Neutral);
            }
        };

        let viewer_reaction = match viewer {
            Some(viewer) => match self.reactions.get_reaction(&post.id, viewer).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(
                        "Falling back to neutral reaction for post {}: {}",
                        post.id,
                        e
                    );
                    ReactionState::Neutral
                }
            },
            None => ReactionState::Neutral,
        };

        FeedItem::new(post, counts, viewer_reaction)
    }
}

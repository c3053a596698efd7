use crate::feed::domain::{PostId, ReactionAction, ToggleOutcome, UserId};
use crate::feed::repository::{DynReactionStore, RepositoryError};

/// Applies like/dislike toggles for the calling user.
///
/// The caller's id must come from a verified credential; this service never
/// acts on behalf of anyone else. Toggles are not retried here: after an
/// ambiguous failure a retry could flip the state a second time.
#[derive(Clone)]
pub struct ReactionToggleService {
    reactions: DynReactionStore,
}

impl ReactionToggleService {
    pub fn new(reactions: DynReactionStore) -> Self {
        Self { reactions }
    }

    pub async fn toggle(
        &self,
        post_id: &PostId,
        user_id: &UserId,
        action: ReactionAction,
    ) -> Result<ToggleOutcome, RepositoryError> {
        // Checks the post exists inside the same transaction as the write
        let viewer_reaction = self.reactions.toggle(post_id, user_id, action).await?;

        // Recount after commit rather than adjusting a pre-toggle count, so
        // concurrent toggles from other users are reflected
        let counts = self.reactions.count_by_post(post_id).await?;

        tracing::debug!(
            "Reaction on post {} by {} is now {:?} ({} likes, {} dislikes)",
            post_id,
            user_id,
            viewer_reaction,
            counts.liked,
            counts.disliked
        );

        Ok(ToggleOutcome {
            post_id: post_id.clone(),
            viewer_reaction,
            like_count: counts.liked,
            dislike_count: counts.disliked,
        })
    }
}

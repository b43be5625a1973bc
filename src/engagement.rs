use crate::{
    authorization::AuthorizationResolver,
    error::{CoreError, article_failure},
    models::{Actor, LikeToggle},
    repository::RepositoryState,
};

/// EngagementCounters
///
/// Likes and views per article. The existence of a `(user, article)` like pair is the only
/// source of truth for "has liked"; the repository flips it and adjusts `like_count` in one
/// atomic step, so two concurrent toggles by the same user flip exactly twice.
///
/// Only articles the actor may read can be liked or viewed. Anything else answers
/// `NotFound`, the same as reading it would.
#[derive(Clone)]
pub struct EngagementCounters {
    repo: RepositoryState,
}

impl EngagementCounters {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// toggle_like
    ///
    /// Likes the article if the user has not yet, unlikes it otherwise.
    pub async fn toggle_like(&self, actor: &Actor, article_id: i64) -> Result<LikeToggle, CoreError> {
        self.ensure_readable(actor, article_id).await?;
        let toggle = self
            .repo
            .toggle_like(actor.id, article_id)
            .await
            .map_err(article_failure("toggle_like", article_id))?;
        tracing::debug!(user = %actor.id, article_id, liked = toggle.liked, count = toggle.like_count, "like toggled");
        Ok(toggle)
    }

    /// set_like
    ///
    /// Drives the pair to the requested state. Retrying the same intent changes nothing,
    /// which makes this the safe form for clients that retry failed requests.
    pub async fn set_like(
        &self,
        actor: &Actor,
        article_id: i64,
        liked: bool,
    ) -> Result<LikeToggle, CoreError> {
        self.ensure_readable(actor, article_id).await?;
        self.repo
            .set_like(actor.id, article_id, liked)
            .await
            .map_err(article_failure("set_like", article_id))
    }

    /// record_view
    ///
    /// Counts one view. Views are not deduplicated per user and the counter only grows.
    pub async fn record_view(&self, actor: &Actor, article_id: i64) -> Result<i64, CoreError> {
        self.ensure_readable(actor, article_id).await?;
        let view_count = self
            .repo
            .record_view(article_id)
            .await
            .map_err(article_failure("record_view", article_id))?;
        tracing::trace!(user = %actor.id, article_id, view_count, "view recorded");
        Ok(view_count)
    }

    async fn ensure_readable(&self, actor: &Actor, article_id: i64) -> Result<(), CoreError> {
        let article = self
            .repo
            .get_article(article_id)
            .await
            .map_err(article_failure("load_article", article_id))?
            .ok_or_else(|| CoreError::article_not_found(article_id))?;

        if AuthorizationResolver::can_read(Some(actor), &article) {
            Ok(())
        } else {
            tracing::debug!(user = %actor.id, article_id, status = ?article.status, "engagement on hidden article");
            Err(CoreError::article_not_found(article_id))
        }
    }
}

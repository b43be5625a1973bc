use chrono::{DateTime, Utc};

use crate::{
    authorization::AuthorizationResolver,
    error::CoreError,
    models::{Actor, Article, ArticleStatus, Capability, DraftEdits},
};

/// ArticleLifecycle
///
/// The article state machine. Each transition takes the current snapshot and returns the
/// next one without touching storage; the caller commits the result with a compare-and-swap
/// on `version`, so whichever writer commits first wins.
///
/// ```text
/// draft --submit--> pending --approve--> published --invalidate--> invalidated
///                      |  ^
///                 reject  resubmit
///                      v  |
///                    rejected
/// ```
///
/// Guards are checked in a fixed order: authority, current state, then fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArticleLifecycle;

impl ArticleLifecycle {
    pub fn can_transition(from: ArticleStatus, to: ArticleStatus) -> bool {
        use ArticleStatus::*;
        matches!(
            (from, to),
            (Draft, Pending)
                | (Pending, Published)
                | (Pending, Rejected)
                | (Rejected, Pending)
                | (Published, Invalidated)
        )
    }

    fn ensure_transition(article: &Article, to: ArticleStatus) -> Result<(), CoreError> {
        if Self::can_transition(article.status, to) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                from: article.status,
                to,
            })
        }
    }

    fn ensure_author(article: &Article, actor: &Actor) -> Result<(), CoreError> {
        if article.author_id == actor.id {
            Ok(())
        } else {
            Err(CoreError::unauthorized("author"))
        }
    }

    /// submit: `draft -> pending`, by the author.
    ///
    /// `category_exists` is the caller's answer for `article.category_id`.
    pub fn submit(
        article: &Article,
        actor: &Actor,
        category_exists: bool,
        now: DateTime<Utc>,
    ) -> Result<Article, CoreError> {
        Self::ensure_author(article, actor)?;
        Self::ensure_transition(article, ArticleStatus::Pending)?;
        Self::validate_submission(article, category_exists)?;

        Ok(Article {
            status: ArticleStatus::Pending,
            updated_at: now,
            ..article.clone()
        })
    }

    /// resubmit: `rejected -> pending`, by the author, with the same field guards as submit.
    /// The previous rejection comment stays visible until a moderator acts again.
    pub fn resubmit(
        article: &Article,
        actor: &Actor,
        category_exists: bool,
        now: DateTime<Utc>,
    ) -> Result<Article, CoreError> {
        Self::ensure_author(article, actor)?;
        if article.status != ArticleStatus::Rejected {
            return Err(CoreError::InvalidTransition {
                from: article.status,
                to: ArticleStatus::Pending,
            });
        }
        Self::validate_submission(article, category_exists)?;

        Ok(Article {
            status: ArticleStatus::Pending,
            updated_at: now,
            ..article.clone()
        })
    }

    /// edit_draft
    ///
    /// Applies author edits. Allowed only while the article is a draft or has been rejected;
    /// the status does not change.
    pub fn edit_draft(
        article: &Article,
        actor: &Actor,
        edits: DraftEdits,
        now: DateTime<Utc>,
    ) -> Result<Article, CoreError> {
        Self::ensure_author(article, actor)?;
        if !matches!(article.status, ArticleStatus::Draft | ArticleStatus::Rejected) {
            return Err(CoreError::InvalidTransition {
                from: article.status,
                to: ArticleStatus::Draft,
            });
        }

        let mut next = article.clone();
        if let Some(title) = edits.title {
            next.draft_title = title;
        }
        if let Some(content) = edits.content {
            next.draft_content = content;
        }
        if edits.category_id.is_some() {
            next.category_id = edits.category_id;
        }
        if edits.publish_start.is_some() {
            next.publish_start = edits.publish_start;
        }
        if edits.publish_end.is_some() {
            next.publish_end = edits.publish_end;
        }
        validate_window(&next)?;
        next.updated_at = now;
        Ok(next)
    }

    /// approve: `pending -> published`, by an actor holding `can_moderate_news`.
    ///
    /// The final fields default to a copy of the draft; moderator edits replace them.
    pub fn approve(
        article: &Article,
        moderator: &Actor,
        final_title: Option<String>,
        final_content: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Article, CoreError> {
        AuthorizationResolver::require(Some(moderator), Capability::CanModerateNews)?;
        Self::ensure_transition(article, ArticleStatus::Published)?;

        let final_title = final_title.unwrap_or_else(|| article.draft_title.clone());
        let final_content = final_content.unwrap_or_else(|| article.draft_content.clone());
        require_text("final_title", &final_title)?;
        require_text("final_content", &final_content)?;

        Ok(Article {
            status: ArticleStatus::Published,
            final_title: Some(final_title),
            final_content: Some(final_content),
            moderator_id: Some(moderator.id),
            moderation_comment: None,
            published_at: Some(now),
            updated_at: now,
            ..article.clone()
        })
    }

    /// reject: `pending -> rejected`, by an actor holding `can_moderate_news`.
    pub fn reject(
        article: &Article,
        moderator: &Actor,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Article, CoreError> {
        AuthorizationResolver::require(Some(moderator), Capability::CanModerateNews)?;
        Self::ensure_transition(article, ArticleStatus::Rejected)?;
        require_text("reason", reason)?;

        Ok(Article {
            status: ArticleStatus::Rejected,
            moderation_comment: Some(reason.trim().to_string()),
            moderator_id: Some(moderator.id),
            updated_at: now,
            ..article.clone()
        })
    }

    /// invalidate: `published -> invalidated`, admins only. There is no way back.
    pub fn invalidate(
        article: &Article,
        admin: &Actor,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Article, CoreError> {
        AuthorizationResolver::require_admin(Some(admin))?;
        Self::ensure_transition(article, ArticleStatus::Invalidated)?;
        require_text("admin_invalidation_reason", reason)?;

        Ok(Article {
            status: ArticleStatus::Invalidated,
            invalidation_reason: Some(reason.trim().to_string()),
            updated_at: now,
            ..article.clone()
        })
    }

    fn validate_submission(article: &Article, category_exists: bool) -> Result<(), CoreError> {
        require_text("draft_title", &article.draft_title)?;
        require_text("draft_content", &article.draft_content)?;
        if article.category_id.is_none() || !category_exists {
            return Err(CoreError::validation(
                "category",
                "a valid category is required",
            ));
        }
        if article.publish_start.is_none() {
            return Err(CoreError::validation(
                "publish_start",
                "the desired publication start is required",
            ));
        }
        validate_window(article)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        Err(CoreError::validation(field, "must not be empty"))
    } else {
        Ok(())
    }
}

/// The desired publication window must not end before it starts.
pub fn validate_window(article: &Article) -> Result<(), CoreError> {
    match (article.publish_start, article.publish_end) {
        (Some(start), Some(end)) if end < start => Err(CoreError::validation(
            "publish_end",
            "must not precede publish_start",
        )),
        _ => Ok(()),
    }
}

use chrono::Utc;

use crate::{
    authorization::AuthorizationResolver,
    error::{CoreError, article_failure, persistence_failure},
    lifecycle::ArticleLifecycle,
    models::{
        Actor, Article, ArticleStatus, Capability, ModerationAction, ModerationAuditEntry,
        ModerationPayload, NewAuditEntry, Verdict,
    },
    notifications::{Notice, NoticeKind, NotifierState},
    repository::RepositoryState,
};

pub const DEFAULT_APPROVAL_REASON: &str = "Approved by moderator";

/// ModerationService
///
/// Runs moderation decisions end to end: authorize, load the snapshot, apply the lifecycle
/// transition, then commit the new state together with its audit entry. A failure at any
/// step leaves the stored article and the audit log exactly as they were.
///
/// Notices to the author are sent after the commit; a delivery failure is logged and does
/// not affect the outcome.
#[derive(Clone)]
pub struct ModerationService {
    repo: RepositoryState,
    notifier: NotifierState,
    approval_reason: String,
}

impl ModerationService {
    pub fn new(repo: RepositoryState, notifier: NotifierState) -> Self {
        Self {
            repo,
            notifier,
            approval_reason: DEFAULT_APPROVAL_REASON.to_string(),
        }
    }

    /// Replaces the canned reason recorded for approvals that come without one.
    pub fn with_approval_reason(mut self, reason: impl Into<String>) -> Self {
        self.approval_reason = reason.into();
        self
    }

    /// moderate
    ///
    /// Applies `verdict` to a pending article. `payload.expected_version`, when present, must
    /// match the stored version, otherwise the call fails with `StaleState` before anything
    /// is attempted. Either way the commit is conditional on the version read here.
    pub async fn moderate(
        &self,
        actor: &Actor,
        article_id: i64,
        verdict: Verdict,
        payload: ModerationPayload,
    ) -> Result<Article, CoreError> {
        AuthorizationResolver::require(Some(actor), Capability::CanModerateNews)?;
        let snapshot = self.load(article_id, payload.expected_version).await?;
        let now = Utc::now();

        let (next, reason) = match verdict {
            Verdict::Approve => {
                let next = ArticleLifecycle::approve(
                    &snapshot,
                    actor,
                    payload.final_title,
                    payload.final_content,
                    now,
                )?;
                let reason = payload
                    .reason
                    .map(|reason| reason.trim().to_string())
                    .filter(|reason| !reason.is_empty())
                    .unwrap_or_else(|| self.approval_reason.clone());
                (next, reason)
            }
            Verdict::Reject => {
                let reason = payload.reason.unwrap_or_default();
                let next = ArticleLifecycle::reject(&snapshot, actor, &reason, now)?;
                (next, reason.trim().to_string())
            }
        };

        let (article, entry) = self
            .commit(&next, snapshot.version, actor, verdict.into(), reason)
            .await?;

        tracing::info!(
            article_id,
            moderator = %actor.id,
            action = ?entry.action,
            status = %article.status,
            "moderation decision committed"
        );

        let kind = match verdict {
            Verdict::Approve => NoticeKind::Approved,
            Verdict::Reject => NoticeKind::Rejected,
        };
        self.notify(&article, kind, &entry.reason).await;
        Ok(article)
    }

    /// approve
    ///
    /// Publishes the draft as-is. Without a reason the configured canned reason is recorded.
    pub async fn approve(
        &self,
        actor: &Actor,
        article_id: i64,
        reason: Option<String>,
    ) -> Result<Article, CoreError> {
        let payload = ModerationPayload {
            reason,
            ..ModerationPayload::default()
        };
        self.moderate(actor, article_id, Verdict::Approve, payload)
            .await
    }

    /// reject
    ///
    /// Rejects a pending article; the reason is mandatory and becomes the moderation comment.
    pub async fn reject(
        &self,
        actor: &Actor,
        article_id: i64,
        reason: &str,
    ) -> Result<Article, CoreError> {
        let payload = ModerationPayload {
            reason: Some(reason.to_string()),
            ..ModerationPayload::default()
        };
        self.moderate(actor, article_id, Verdict::Reject, payload)
            .await
    }

    /// invalidate
    ///
    /// Withdraws a published article for good. Requires admin rights, which is stricter than
    /// `can_moderate_news`.
    pub async fn invalidate(
        &self,
        actor: &Actor,
        article_id: i64,
        reason: &str,
        expected_version: Option<i64>,
    ) -> Result<Article, CoreError> {
        AuthorizationResolver::require_admin(Some(actor))?;
        let snapshot = self.load(article_id, expected_version).await?;
        let next = ArticleLifecycle::invalidate(&snapshot, actor, reason, Utc::now())?;

        let (article, entry) = self
            .commit(
                &next,
                snapshot.version,
                actor,
                ModerationAction::Invalidate,
                reason.trim().to_string(),
            )
            .await?;

        tracing::warn!(article_id, admin = %actor.id, "article invalidated");
        self.notify(&article, NoticeKind::Invalidated, &entry.reason)
            .await;
        Ok(article)
    }

    /// pending_queue
    ///
    /// Articles waiting for a decision, most recently updated first.
    pub async fn pending_queue(&self, actor: &Actor) -> Result<Vec<Article>, CoreError> {
        AuthorizationResolver::require_moderator(Some(actor))?;
        self.repo
            .list_articles(ArticleStatus::Pending)
            .await
            .map_err(persistence_failure("pending_queue"))
    }

    /// audit_log
    ///
    /// The moderation history of one article, oldest first.
    pub async fn audit_log(
        &self,
        actor: &Actor,
        article_id: i64,
    ) -> Result<Vec<ModerationAuditEntry>, CoreError> {
        AuthorizationResolver::require_moderator(Some(actor))?;
        self.repo
            .audit_log(article_id)
            .await
            .map_err(article_failure("audit_log", article_id))
    }

    async fn load(&self, article_id: i64, expected_version: Option<i64>) -> Result<Article, CoreError> {
        let snapshot = self
            .repo
            .get_article(article_id)
            .await
            .map_err(article_failure("load_article", article_id))?
            .ok_or_else(|| CoreError::article_not_found(article_id))?;

        match expected_version {
            Some(expected) if expected != snapshot.version => {
                tracing::debug!(
                    article_id,
                    expected,
                    actual = snapshot.version,
                    "moderation on an outdated snapshot"
                );
                Err(CoreError::StaleState { id: article_id })
            }
            _ => Ok(snapshot),
        }
    }

    async fn commit(
        &self,
        next: &Article,
        read_version: i64,
        actor: &Actor,
        action: ModerationAction,
        reason: String,
    ) -> Result<(Article, ModerationAuditEntry), CoreError> {
        let audit = NewAuditEntry {
            article_id: next.id,
            moderator_id: actor.id,
            action,
            reason,
        };
        let (article, entry) = self
            .repo
            .commit_transition(next, read_version, Some(audit))
            .await
            .map_err(article_failure("commit_moderation", next.id))?;

        // The repository always returns the entry it was handed.
        let entry = entry.ok_or_else(|| {
            tracing::error!(article_id = next.id, "audit entry missing after commit");
            CoreError::Persistence
        })?;
        Ok((article, entry))
    }

    async fn notify(&self, article: &Article, kind: NoticeKind, reason: &str) {
        let notice = Notice {
            recipient_id: article.author_id,
            article_id: article.id,
            kind,
            message: format!("\"{}\": {}", article.display_title(), reason),
        };
        if let Err(e) = self.notifier.dispatch(notice).await {
            tracing::warn!(article_id = article.id, error = %e, "failed to dispatch notice");
        }
    }
}

use chrono::Utc;

use crate::{
    authorization::AuthorizationResolver,
    error::{CoreError, article_failure, persistence_failure},
    lifecycle::{ArticleLifecycle, validate_window},
    models::{Actor, Article, ArticleDraft, ArticleStatus, Capability, DraftEdits, NewArticle},
    repository::RepositoryState,
};

/// ArticleService
///
/// The author's side of the lifecycle: drafting, editing, submitting for moderation and
/// resubmitting after a rejection, plus the visibility rules for reading articles.
#[derive(Clone)]
pub struct ArticleService {
    repo: RepositoryState,
}

impl ArticleService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// create_draft
    ///
    /// Stores a new draft owned by `actor`. Drafts may be incomplete; the submission guards
    /// apply later.
    pub async fn create_draft(&self, actor: &Actor, draft: ArticleDraft) -> Result<Article, CoreError> {
        AuthorizationResolver::require(Some(actor), Capability::CanCreateContent)?;
        let article = Article::new_draft(actor.id, draft, Utc::now());
        validate_window(&article)?;

        let created = self
            .repo
            .insert_article(NewArticle::from(&article))
            .await
            .map_err(persistence_failure("create_draft"))?;
        tracing::info!(article_id = created.id, author = %actor.id, "draft created");
        Ok(created)
    }

    /// submit_article
    ///
    /// Creates an article and submits it in one step. Nothing is stored unless every
    /// submission guard passes.
    pub async fn submit_article(&self, actor: &Actor, draft: ArticleDraft) -> Result<Article, CoreError> {
        AuthorizationResolver::require(Some(actor), Capability::CanCreateContent)?;
        let now = Utc::now();
        let article = Article::new_draft(actor.id, draft, now);
        let category_exists = self.category_exists(article.category_id).await?;
        let pending = ArticleLifecycle::submit(&article, actor, category_exists, now)?;

        let created = self
            .repo
            .insert_article(NewArticle::from(&pending))
            .await
            .map_err(persistence_failure("submit_article"))?;
        tracing::info!(article_id = created.id, author = %actor.id, "article submitted for moderation");
        Ok(created)
    }

    /// update_draft
    pub async fn update_draft(
        &self,
        actor: &Actor,
        article_id: i64,
        edits: DraftEdits,
    ) -> Result<Article, CoreError> {
        let snapshot = self.load(article_id).await?;
        let next = ArticleLifecycle::edit_draft(&snapshot, actor, edits, Utc::now())?;
        self.commit(&next, snapshot.version).await
    }

    /// submit: `draft -> pending`.
    pub async fn submit(&self, actor: &Actor, article_id: i64) -> Result<Article, CoreError> {
        let snapshot = self.load(article_id).await?;
        let category_exists = self.category_exists(snapshot.category_id).await?;
        let next = ArticleLifecycle::submit(&snapshot, actor, category_exists, Utc::now())?;
        let submitted = self.commit(&next, snapshot.version).await?;
        tracing::info!(article_id, author = %actor.id, "article submitted for moderation");
        Ok(submitted)
    }

    /// resubmit: `rejected -> pending`.
    pub async fn resubmit(&self, actor: &Actor, article_id: i64) -> Result<Article, CoreError> {
        let snapshot = self.load(article_id).await?;
        let category_exists = self.category_exists(snapshot.category_id).await?;
        let next = ArticleLifecycle::resubmit(&snapshot, actor, category_exists, Utc::now())?;
        let resubmitted = self.commit(&next, snapshot.version).await?;
        tracing::info!(article_id, author = %actor.id, "article resubmitted after rejection");
        Ok(resubmitted)
    }

    /// published
    ///
    /// The public listing.
    pub async fn published(&self) -> Result<Vec<Article>, CoreError> {
        self.repo
            .list_articles(ArticleStatus::Published)
            .await
            .map_err(persistence_failure("list_published"))
    }

    /// mine
    ///
    /// Everything the actor wrote, whatever its status.
    pub async fn mine(&self, actor: &Actor) -> Result<Vec<Article>, CoreError> {
        self.repo
            .list_articles_by_author(actor.id)
            .await
            .map_err(persistence_failure("list_by_author"))
    }

    /// visible
    ///
    /// Published articles are readable by anyone. Any other status is readable by the
    /// author and by moderators only; everyone else gets `NotFound`, so the article's
    /// existence is not disclosed.
    pub async fn visible(&self, viewer: Option<&Actor>, article_id: i64) -> Result<Article, CoreError> {
        let article = self.load(article_id).await?;
        if AuthorizationResolver::can_read(viewer, &article) {
            Ok(article)
        } else {
            Err(CoreError::article_not_found(article_id))
        }
    }

    async fn load(&self, article_id: i64) -> Result<Article, CoreError> {
        self.repo
            .get_article(article_id)
            .await
            .map_err(article_failure("load_article", article_id))?
            .ok_or_else(|| CoreError::article_not_found(article_id))
    }

    async fn category_exists(&self, category_id: Option<i64>) -> Result<bool, CoreError> {
        match category_id {
            Some(id) => self
                .repo
                .category_exists(id)
                .await
                .map_err(persistence_failure("category_exists")),
            None => Ok(false),
        }
    }

    async fn commit(&self, next: &Article, read_version: i64) -> Result<Article, CoreError> {
        let (article, _) = self
            .repo
            .commit_transition(next, read_version, None)
            .await
            .map_err(article_failure("commit_author_change", next.id))?;
        Ok(article)
    }
}

use crate::models::{
    Article, ArticleStatus, Category, LikeToggle, ModerationAuditEntry, NewArticle, NewAuditEntry,
    RoleRecord, User,
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

/// RepositoryError
///
/// Failures of the persistence layer. Services translate these at their boundary:
/// `Conflict` becomes a stale-state error, everything else is logged and reported as a
/// generic persistence failure.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("version conflict")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The persistence contract of the core. Every mutation of an article is atomic per
/// article: lifecycle writes are compare-and-swap on `version` and commit their audit entry
/// in the same unit, and like toggles are decided by the presence of the `(user, article)`
/// pair under a per-article lock.
///
/// **Send + Sync + async_trait** let the trait object (`Arc<dyn Repository>`) be shared
/// across Axum's request tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users & Roles ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn set_user_verified(&self, id: Uuid, verified: bool) -> RepoResult<Option<User>>;
    async fn list_role_records(&self) -> RepoResult<Vec<RoleRecord>>;
    async fn category_exists(&self, id: i64) -> RepoResult<bool>;

    // --- Articles ---
    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>>;
    async fn list_articles(&self, status: ArticleStatus) -> RepoResult<Vec<Article>>;
    async fn list_articles_by_author(&self, author_id: Uuid) -> RepoResult<Vec<Article>>;
    async fn insert_article(&self, article: NewArticle) -> RepoResult<Article>;

    /// commit_transition
    ///
    /// Writes the lifecycle columns of `next` if the stored version still equals
    /// `expected_version`, bumping the version, and appends `audit` in the same unit.
    /// Counters are left untouched. Fails with `Conflict` when the version moved and
    /// `NotFound` when the article is gone.
    async fn commit_transition(
        &self,
        next: &Article,
        expected_version: i64,
        audit: Option<NewAuditEntry>,
    ) -> RepoResult<(Article, Option<ModerationAuditEntry>)>;

    async fn audit_log(&self, article_id: i64) -> RepoResult<Vec<ModerationAuditEntry>>;

    // --- Engagement ---
    /// Flips the like pair and adjusts `like_count` accordingly (never below zero).
    async fn toggle_like(&self, user_id: Uuid, article_id: i64) -> RepoResult<LikeToggle>;
    /// Drives the like pair to `liked`; a no-op if it is already there.
    async fn set_like(&self, user_id: Uuid, article_id: i64, liked: bool)
    -> RepoResult<LikeToggle>;
    /// Increments `view_count` and returns the new value.
    async fn record_view(&self, article_id: i64) -> RepoResult<i64>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

const ARTICLE_COLUMNS: &str = "id, author_id, category_id, status, draft_title, draft_content, \
    final_title, final_content, moderation_comment, moderator_id, invalidation_reason, \
    view_count, like_count, publish_start, publish_end, version, created_at, updated_at, \
    published_at";

const AUDIT_COLUMNS: &str = "id, article_id, moderator_id, action, reason, created_at";

/// PostgresRepository
///
/// The `Repository` backed by PostgreSQL. Row locks (`FOR UPDATE`) serialize like toggles
/// per article; lifecycle writes rely on `WHERE version = $n`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locks the article row for the rest of the transaction and returns its like count.
    async fn lock_article(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        article_id: i64,
    ) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT like_count FROM articles WHERE id = $1 FOR UPDATE")
            .bind(article_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn adjust_like_count(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        article_id: i64,
        delta: i64,
    ) -> RepoResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "UPDATE articles SET like_count = GREATEST(like_count + $2, 0) WHERE id = $1 RETURNING like_count",
        )
        .bind(article_id)
        .bind(delta)
        .fetch_one(&mut **tx)
        .await?;
        Ok(count)
    }

    async fn insert_like(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        article_id: i64,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT INTO article_likes (user_id, article_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(article_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_like(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        user_id: Uuid,
        article_id: i64,
    ) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM article_likes WHERE user_id = $1 AND article_id = $2")
            .bind(user_id)
            .bind(article_id)
            .execute(&mut **tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, role, role_detailed, verified FROM profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn set_user_verified(&self, id: Uuid, verified: bool) -> RepoResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE profiles SET verified = $2 WHERE id = $1 RETURNING id, email, role, role_detailed, verified",
        )
        .bind(id)
        .bind(verified)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_role_records(&self) -> RepoResult<Vec<RoleRecord>> {
        let roles = sqlx::query_as::<_, RoleRecord>("SELECT name, permissions FROM roles ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(roles)
    }

    async fn category_exists(&self, id: i64) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM categories WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>> {
        let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1");
        let article = sqlx::query_as::<_, Article>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(article)
    }

    async fn list_articles(&self, status: ArticleStatus) -> RepoResult<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE status = $1 ORDER BY updated_at DESC"
        );
        let articles = sqlx::query_as::<_, Article>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(articles)
    }

    async fn list_articles_by_author(&self, author_id: Uuid) -> RepoResult<Vec<Article>> {
        let sql = format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles WHERE author_id = $1 ORDER BY created_at DESC"
        );
        let articles = sqlx::query_as::<_, Article>(&sql)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(articles)
    }

    async fn insert_article(&self, article: NewArticle) -> RepoResult<Article> {
        let sql = format!(
            r#"INSERT INTO articles (author_id, category_id, status, draft_title, draft_content, publish_start, publish_end)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {ARTICLE_COLUMNS}"#
        );
        let created = sqlx::query_as::<_, Article>(&sql)
            .bind(article.author_id)
            .bind(article.category_id)
            .bind(article.status)
            .bind(article.draft_title)
            .bind(article.draft_content)
            .bind(article.publish_start)
            .bind(article.publish_end)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    /// commit_transition
    ///
    /// One transaction: the versioned UPDATE, then the audit INSERT. If the UPDATE matches
    /// no row the transaction is dropped (rolled back) before anything else is written.
    async fn commit_transition(
        &self,
        next: &Article,
        expected_version: i64,
        audit: Option<NewAuditEntry>,
    ) -> RepoResult<(Article, Option<ModerationAuditEntry>)> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"UPDATE articles
               SET status = $3,
                   category_id = $4,
                   draft_title = $5,
                   draft_content = $6,
                   final_title = $7,
                   final_content = $8,
                   moderation_comment = $9,
                   moderator_id = $10,
                   invalidation_reason = $11,
                   publish_start = $12,
                   publish_end = $13,
                   published_at = $14,
                   version = version + 1,
                   updated_at = NOW()
               WHERE id = $1 AND version = $2
               RETURNING {ARTICLE_COLUMNS}"#
        );
        let updated = sqlx::query_as::<_, Article>(&sql)
            .bind(next.id)
            .bind(expected_version)
            .bind(next.status)
            .bind(next.category_id)
            .bind(&next.draft_title)
            .bind(&next.draft_content)
            .bind(&next.final_title)
            .bind(&next.final_content)
            .bind(&next.moderation_comment)
            .bind(next.moderator_id)
            .bind(&next.invalidation_reason)
            .bind(next.publish_start)
            .bind(next.publish_end)
            .bind(next.published_at)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(updated) = updated else {
            let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM articles WHERE id = $1)")
                .bind(next.id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                RepositoryError::Conflict
            } else {
                RepositoryError::NotFound
            });
        };

        let entry = match audit {
            Some(entry) => {
                let sql = format!(
                    "INSERT INTO moderation_audit (article_id, moderator_id, action, reason) \
                     VALUES ($1, $2, $3, $4) RETURNING {AUDIT_COLUMNS}"
                );
                let inserted = sqlx::query_as::<_, ModerationAuditEntry>(&sql)
                    .bind(entry.article_id)
                    .bind(entry.moderator_id)
                    .bind(entry.action)
                    .bind(entry.reason)
                    .fetch_one(&mut *tx)
                    .await?;
                Some(inserted)
            }
            None => None,
        };

        tx.commit().await?;
        Ok((updated, entry))
    }

    async fn audit_log(&self, article_id: i64) -> RepoResult<Vec<ModerationAuditEntry>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM moderation_audit WHERE article_id = $1 ORDER BY id ASC"
        );
        let entries = sqlx::query_as::<_, ModerationAuditEntry>(&sql)
            .bind(article_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn toggle_like(&self, user_id: Uuid, article_id: i64) -> RepoResult<LikeToggle> {
        let mut tx = self.pool.begin().await?;
        Self::lock_article(&mut tx, article_id).await?;

        let toggle = if Self::delete_like(&mut tx, user_id, article_id).await? {
            LikeToggle {
                liked: false,
                like_count: Self::adjust_like_count(&mut tx, article_id, -1).await?,
            }
        } else {
            Self::insert_like(&mut tx, user_id, article_id).await?;
            LikeToggle {
                liked: true,
                like_count: Self::adjust_like_count(&mut tx, article_id, 1).await?,
            }
        };

        tx.commit().await?;
        Ok(toggle)
    }

    async fn set_like(
        &self,
        user_id: Uuid,
        article_id: i64,
        liked: bool,
    ) -> RepoResult<LikeToggle> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_article(&mut tx, article_id).await?;

        let like_count = if liked {
            if Self::insert_like(&mut tx, user_id, article_id).await? {
                Self::adjust_like_count(&mut tx, article_id, 1).await?
            } else {
                current
            }
        } else if Self::delete_like(&mut tx, user_id, article_id).await? {
            Self::adjust_like_count(&mut tx, article_id, -1).await?
        } else {
            current
        };

        tx.commit().await?;
        Ok(LikeToggle { liked, like_count })
    }

    async fn record_view(&self, article_id: i64) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE articles SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
        )
        .bind(article_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

// --- In-Memory Implementation (tests and local tooling) ---

#[derive(Default)]
struct MemoryStore {
    users: HashMap<Uuid, User>,
    roles: Vec<RoleRecord>,
    categories: HashMap<i64, Category>,
    articles: BTreeMap<i64, Article>,
    likes: HashSet<(Uuid, i64)>,
    audit: Vec<ModerationAuditEntry>,
    next_article_id: i64,
    next_audit_id: i64,
}

/// InMemoryRepository
///
/// A `Repository` held in process memory behind a single mutex, which gives every
/// operation the same per-article atomicity as the Postgres implementation.
///
/// `new_failing()` builds a store whose writes all fail, for exercising error paths.
#[derive(Default)]
pub struct InMemoryRepository {
    store: Mutex<MemoryStore>,
    should_fail: bool,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_user(self, user: User) -> Self {
        if let Ok(mut store) = self.store.lock() {
            store.users.insert(user.id, user);
        }
        self
    }

    pub fn with_role(self, role: RoleRecord) -> Self {
        if let Ok(mut store) = self.store.lock() {
            store.roles.push(role);
        }
        self
    }

    pub fn with_category(self, category: Category) -> Self {
        if let Ok(mut store) = self.store.lock() {
            store.categories.insert(category.id, category);
        }
        self
    }

    /// Stores `article` as-is (assigning an id when it has none) and returns it.
    pub fn seed_article(&self, mut article: Article) -> RepoResult<Article> {
        let mut store = self.lock()?;
        if article.id == 0 {
            store.next_article_id += 1;
            article.id = store.next_article_id;
        } else {
            store.next_article_id = store.next_article_id.max(article.id);
        }
        store.articles.insert(article.id, article.clone());
        Ok(article)
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, MemoryStore>> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("in-memory store poisoned".to_string()))
    }

    fn lock_for_write(&self) -> RepoResult<MutexGuard<'_, MemoryStore>> {
        if self.should_fail {
            return Err(RepositoryError::Unavailable(
                "simulated write failure".to_string(),
            ));
        }
        self.lock()
    }
}

fn apply_lifecycle_fields(stored: &mut Article, next: &Article) {
    stored.status = next.status;
    stored.category_id = next.category_id;
    stored.draft_title = next.draft_title.clone();
    stored.draft_content = next.draft_content.clone();
    stored.final_title = next.final_title.clone();
    stored.final_content = next.final_content.clone();
    stored.moderation_comment = next.moderation_comment.clone();
    stored.moderator_id = next.moderator_id;
    stored.invalidation_reason = next.invalidation_reason.clone();
    stored.publish_start = next.publish_start;
    stored.publish_end = next.publish_end;
    stored.published_at = next.published_at;
    stored.updated_at = next.updated_at;
    stored.version += 1;
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn set_user_verified(&self, id: Uuid, verified: bool) -> RepoResult<Option<User>> {
        let mut store = self.lock_for_write()?;
        Ok(store.users.get_mut(&id).map(|user| {
            user.verified = verified;
            user.clone()
        }))
    }

    async fn list_role_records(&self) -> RepoResult<Vec<RoleRecord>> {
        Ok(self.lock()?.roles.clone())
    }

    async fn category_exists(&self, id: i64) -> RepoResult<bool> {
        Ok(self.lock()?.categories.contains_key(&id))
    }

    async fn get_article(&self, id: i64) -> RepoResult<Option<Article>> {
        Ok(self.lock()?.articles.get(&id).cloned())
    }

    async fn list_articles(&self, status: ArticleStatus) -> RepoResult<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .lock()?
            .articles
            .values()
            .filter(|article| article.status == status)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(articles)
    }

    async fn list_articles_by_author(&self, author_id: Uuid) -> RepoResult<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .lock()?
            .articles
            .values()
            .filter(|article| article.author_id == author_id)
            .cloned()
            .collect();
        articles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(articles)
    }

    async fn insert_article(&self, article: NewArticle) -> RepoResult<Article> {
        let mut store = self.lock_for_write()?;
        store.next_article_id += 1;
        let now = chrono::Utc::now();
        let created = Article {
            id: store.next_article_id,
            author_id: article.author_id,
            category_id: article.category_id,
            status: article.status,
            draft_title: article.draft_title,
            draft_content: article.draft_content,
            publish_start: article.publish_start,
            publish_end: article.publish_end,
            version: 0,
            created_at: now,
            updated_at: now,
            ..Article::default()
        };
        store.articles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn commit_transition(
        &self,
        next: &Article,
        expected_version: i64,
        audit: Option<NewAuditEntry>,
    ) -> RepoResult<(Article, Option<ModerationAuditEntry>)> {
        let mut store = self.lock_for_write()?;
        let store = &mut *store;

        let stored = store
            .articles
            .get_mut(&next.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.version != expected_version {
            return Err(RepositoryError::Conflict);
        }
        apply_lifecycle_fields(stored, next);
        let updated = stored.clone();

        let entry = audit.map(|entry| {
            store.next_audit_id += 1;
            let recorded = ModerationAuditEntry {
                id: store.next_audit_id,
                article_id: entry.article_id,
                moderator_id: entry.moderator_id,
                action: entry.action,
                reason: entry.reason,
                created_at: chrono::Utc::now(),
            };
            store.audit.push(recorded.clone());
            recorded
        });

        Ok((updated, entry))
    }

    async fn audit_log(&self, article_id: i64) -> RepoResult<Vec<ModerationAuditEntry>> {
        Ok(self
            .lock()?
            .audit
            .iter()
            .filter(|entry| entry.article_id == article_id)
            .cloned()
            .collect())
    }

    async fn toggle_like(&self, user_id: Uuid, article_id: i64) -> RepoResult<LikeToggle> {
        let mut store = self.lock_for_write()?;
        let store = &mut *store;

        let article = store
            .articles
            .get_mut(&article_id)
            .ok_or(RepositoryError::NotFound)?;
        let liked = if store.likes.remove(&(user_id, article_id)) {
            article.like_count = (article.like_count - 1).max(0);
            false
        } else {
            store.likes.insert((user_id, article_id));
            article.like_count += 1;
            true
        };

        Ok(LikeToggle {
            liked,
            like_count: article.like_count,
        })
    }

    async fn set_like(
        &self,
        user_id: Uuid,
        article_id: i64,
        liked: bool,
    ) -> RepoResult<LikeToggle> {
        let mut store = self.lock_for_write()?;
        let store = &mut *store;

        let article = store
            .articles
            .get_mut(&article_id)
            .ok_or(RepositoryError::NotFound)?;
        if liked {
            if store.likes.insert((user_id, article_id)) {
                article.like_count += 1;
            }
        } else if store.likes.remove(&(user_id, article_id)) {
            article.like_count = (article.like_count - 1).max(0);
        }

        Ok(LikeToggle {
            liked,
            like_count: article.like_count,
        })
    }

    async fn record_view(&self, article_id: i64) -> RepoResult<i64> {
        let mut store = self.lock_for_write()?;
        let article = store
            .articles
            .get_mut(&article_id)
            .ok_or(RepositoryError::NotFound)?;
        article.view_count += 1;
        Ok(article.view_count)
    }
}

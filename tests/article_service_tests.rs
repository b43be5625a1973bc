mod common;

use campus_news::{
    ArticleService, CoreError,
    models::{ArticleDraft, ArticleStatus, DraftEdits},
    repository::{InMemoryRepository, Repository, RepositoryState},
};
use chrono::{Duration, Utc};
use common::{CATEGORY_ID, article, legacy, repo_with_category};
use std::sync::Arc;

fn service() -> (Arc<InMemoryRepository>, ArticleService) {
    let repo = Arc::new(repo_with_category());
    let service = ArticleService::new(repo.clone() as RepositoryState);
    (repo, service)
}

fn complete_draft() -> ArticleDraft {
    let start = Utc::now() + Duration::days(2);
    ArticleDraft {
        title: "Robotics club wins regional final".to_string(),
        content: "The team qualified for the national round in May.".to_string(),
        category_id: Some(CATEGORY_ID),
        publish_start: Some(start),
        publish_end: Some(start + Duration::days(14)),
    }
}

#[tokio::test]
async fn test_submit_article_creates_pending() {
    let (repo, service) = service();
    let author = legacy("publisher");

    let created = service.submit_article(&author, complete_draft()).await.unwrap();
    assert_eq!(created.status, ArticleStatus::Pending);
    assert_eq!(created.author_id, author.id);

    let stored = repo.get_article(created.id).await.unwrap().unwrap();
    assert_eq!(stored.status, ArticleStatus::Pending);
}

#[tokio::test]
async fn test_invalid_submission_stores_nothing() {
    let (repo, service) = service();
    let author = legacy("teacher");

    let draft = ArticleDraft {
        category_id: Some(999),
        ..complete_draft()
    };
    let err = service.submit_article(&author, draft).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { ref field, .. } if field == "category"));
    assert!(repo.list_articles_by_author(author.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_students_cannot_write() {
    let (_repo, service) = service();
    let err = service
        .create_draft(&legacy("student"), complete_draft())
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::unauthorized("can_create_content"));
}

#[tokio::test]
async fn test_draft_edit_submit_flow() {
    let (_repo, service) = service();
    let author = legacy("teacher");

    let draft = service
        .create_draft(
            &author,
            ArticleDraft {
                title: "Work in progress".to_string(),
                ..ArticleDraft::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(draft.status, ArticleStatus::Draft);

    // Incomplete drafts cannot be submitted.
    let err = service.submit(&author, draft.id).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));

    let full = complete_draft();
    let edited = service
        .update_draft(
            &author,
            draft.id,
            DraftEdits {
                content: Some(full.content),
                category_id: full.category_id,
                publish_start: full.publish_start,
                ..DraftEdits::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.draft_title, "Work in progress");
    assert_eq!(edited.version, draft.version + 1);

    let submitted = service.submit(&author, draft.id).await.unwrap();
    assert_eq!(submitted.status, ArticleStatus::Pending);

    let err = service
        .update_draft(&author, draft.id, DraftEdits::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_resubmit_after_rejection() {
    let (repo, service) = service();
    let author = legacy("publisher");
    let rejected = repo.seed_article(article(author.id, ArticleStatus::Rejected)).unwrap();

    let pending = service.resubmit(&author, rejected.id).await.unwrap();
    assert_eq!(pending.status, ArticleStatus::Pending);

    let err = service
        .resubmit(&legacy("publisher"), rejected.id)
        .await
        .unwrap_err();
    assert_eq!(err, CoreError::unauthorized("author"));
}

#[tokio::test]
async fn test_visibility_rules() {
    let (repo, service) = service();
    let author = legacy("teacher");
    let pending = repo.seed_article(article(author.id, ArticleStatus::Pending)).unwrap();
    let published = repo.seed_article(article(author.id, ArticleStatus::Published)).unwrap();

    assert!(service.visible(None, published.id).await.is_ok());
    assert_eq!(
        service.visible(None, pending.id).await.unwrap_err(),
        CoreError::article_not_found(pending.id)
    );
    assert_eq!(
        service
            .visible(Some(&legacy("student")), pending.id)
            .await
            .unwrap_err(),
        CoreError::article_not_found(pending.id)
    );
    assert!(service.visible(Some(&author), pending.id).await.is_ok());
    assert!(service.visible(Some(&legacy("moderator")), pending.id).await.is_ok());

    let listed = service.published().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, published.id);

    let mine = service.mine(&author).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(service.mine(&legacy("teacher")).await.unwrap().is_empty());
}

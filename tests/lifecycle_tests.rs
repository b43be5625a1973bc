mod common;

use campus_news::{
    ArticleLifecycle, CoreError,
    models::{ArticleStatus, Capability, DraftEdits},
};
use chrono::{Duration, Utc};
use common::{article, detailed, legacy};

use ArticleStatus::*;

fn validation_field(err: CoreError) -> String {
    match err {
        CoreError::Validation { field, .. } => field,
        other => panic!("expected a validation error, got {other:?}"),
    }
}

// --- Transition Table ---

#[test]
fn test_allowed_transitions() {
    let allowed = [
        (Draft, Pending),
        (Pending, Published),
        (Pending, Rejected),
        (Rejected, Pending),
        (Published, Invalidated),
    ];
    let all = [Draft, Pending, Published, Rejected, Invalidated];
    for from in all {
        for to in all {
            assert_eq!(
                ArticleLifecycle::can_transition(from, to),
                allowed.contains(&(from, to)),
                "{from} -> {to}"
            );
        }
    }
}

// --- Submit ---

#[test]
fn test_submit_moves_draft_to_pending() {
    let author = legacy("teacher");
    let draft = article(author.id, Draft);
    let next = ArticleLifecycle::submit(&draft, &author, true, Utc::now()).unwrap();
    assert_eq!(next.status, Pending);
    assert_eq!(next.draft_title, draft.draft_title);
}

#[test]
fn test_submit_by_someone_else_is_unauthorized() {
    let author = legacy("teacher");
    let other = legacy("teacher");
    let draft = article(author.id, Draft);
    let err = ArticleLifecycle::submit(&draft, &other, true, Utc::now()).unwrap_err();
    assert_eq!(err, CoreError::unauthorized("author"));
}

#[test]
fn test_submit_requires_every_field() {
    let author = legacy("publisher");
    let now = Utc::now();

    let mut draft = article(author.id, Draft);
    draft.draft_title = "   ".to_string();
    let err = ArticleLifecycle::submit(&draft, &author, true, now).unwrap_err();
    assert_eq!(validation_field(err), "draft_title");

    let mut draft = article(author.id, Draft);
    draft.draft_content.clear();
    let err = ArticleLifecycle::submit(&draft, &author, true, now).unwrap_err();
    assert_eq!(validation_field(err), "draft_content");

    let draft = article(author.id, Draft);
    let err = ArticleLifecycle::submit(&draft, &author, false, now).unwrap_err();
    assert_eq!(validation_field(err), "category");

    let mut draft = article(author.id, Draft);
    draft.category_id = None;
    let err = ArticleLifecycle::submit(&draft, &author, true, now).unwrap_err();
    assert_eq!(validation_field(err), "category");

    let mut draft = article(author.id, Draft);
    draft.publish_start = None;
    let err = ArticleLifecycle::submit(&draft, &author, true, now).unwrap_err();
    assert_eq!(validation_field(err), "publish_start");

    let mut draft = article(author.id, Draft);
    draft.publish_end = Some(now - Duration::days(3));
    let err = ArticleLifecycle::submit(&draft, &author, true, now).unwrap_err();
    assert_eq!(validation_field(err), "publish_end");
}

#[test]
fn test_submit_checks_state_before_fields() {
    let author = legacy("publisher");
    let mut pending = article(author.id, Pending);
    pending.draft_title.clear();
    let err = ArticleLifecycle::submit(&pending, &author, true, Utc::now()).unwrap_err();
    assert_eq!(err, CoreError::InvalidTransition { from: Pending, to: Pending });
}

// --- Approve / Reject ---

#[test]
fn test_approve_copies_draft_and_records_moderator() {
    let moderator = legacy("moderator");
    let mut pending = article(uuid::Uuid::new_v4(), Pending);
    pending.moderation_comment = Some("fix the headline".to_string());
    let now = Utc::now();

    let published = ArticleLifecycle::approve(&pending, &moderator, None, None, now).unwrap();
    assert_eq!(published.status, Published);
    assert_eq!(published.final_title.as_deref(), Some(pending.draft_title.as_str()));
    assert_eq!(published.final_content.as_deref(), Some(pending.draft_content.as_str()));
    assert_eq!(published.moderator_id, Some(moderator.id));
    assert_eq!(published.moderation_comment, None);
    assert_eq!(published.published_at, Some(now));
}

#[test]
fn test_approve_with_moderator_edits() {
    let moderator = legacy("admin");
    let pending = article(uuid::Uuid::new_v4(), Pending);
    let published = ArticleLifecycle::approve(
        &pending,
        &moderator,
        Some("Library open until midnight".to_string()),
        None,
        Utc::now(),
    )
    .unwrap();
    assert_eq!(published.final_title.as_deref(), Some("Library open until midnight"));
    assert_eq!(published.draft_title, pending.draft_title);
}

#[test]
fn test_approve_rejects_empty_final_copy() {
    let moderator = legacy("moderator");
    let pending = article(uuid::Uuid::new_v4(), Pending);
    let err = ArticleLifecycle::approve(&pending, &moderator, None, Some(" ".to_string()), Utc::now())
        .unwrap_err();
    assert_eq!(validation_field(err), "final_content");
}

#[test]
fn test_approve_outside_pending_is_invalid() {
    let moderator = legacy("moderator");
    for status in [Published, Rejected, Draft, Invalidated] {
        let current = article(uuid::Uuid::new_v4(), status);
        let err = ArticleLifecycle::approve(&current, &moderator, None, None, Utc::now()).unwrap_err();
        assert_eq!(err, CoreError::InvalidTransition { from: status, to: Published });
    }
}

#[test]
fn test_approve_requires_can_moderate_news() {
    let teacher = legacy("teacher");
    let pending = article(uuid::Uuid::new_v4(), Pending);
    let err = ArticleLifecycle::approve(&pending, &teacher, None, None, Utc::now()).unwrap_err();
    assert_eq!(err, CoreError::unauthorized("can_moderate_news"));
}

#[test]
fn test_reject_sets_comment() {
    let moderator = detailed("student", "desk", &[(Capability::CanModerateNews, true)]);
    let pending = article(uuid::Uuid::new_v4(), Pending);
    let rejected =
        ArticleLifecycle::reject(&pending, &moderator, "  Missing sources  ", Utc::now()).unwrap();
    assert_eq!(rejected.status, Rejected);
    assert_eq!(rejected.moderation_comment.as_deref(), Some("Missing sources"));
    assert_eq!(rejected.moderator_id, Some(moderator.id));
}

#[test]
fn test_reject_requires_reason() {
    let moderator = legacy("moderator");
    let pending = article(uuid::Uuid::new_v4(), Pending);
    let err = ArticleLifecycle::reject(&pending, &moderator, "", Utc::now()).unwrap_err();
    assert_eq!(validation_field(err), "reason");
}

// --- Resubmit / Edit ---

#[test]
fn test_resubmit_only_from_rejected() {
    let author = legacy("teacher");
    let mut rejected = article(author.id, Rejected);
    rejected.moderation_comment = Some("too long".to_string());

    let pending = ArticleLifecycle::resubmit(&rejected, &author, true, Utc::now()).unwrap();
    assert_eq!(pending.status, Pending);
    assert_eq!(pending.moderation_comment.as_deref(), Some("too long"));

    let draft = article(author.id, Draft);
    let err = ArticleLifecycle::resubmit(&draft, &author, true, Utc::now()).unwrap_err();
    assert_eq!(err, CoreError::InvalidTransition { from: Draft, to: Pending });
}

#[test]
fn test_edit_draft_applies_only_provided_fields() {
    let author = legacy("teacher");
    let draft = article(author.id, Draft);
    let edits = DraftEdits {
        title: Some("New headline".to_string()),
        ..DraftEdits::default()
    };
    let edited = ArticleLifecycle::edit_draft(&draft, &author, edits, Utc::now()).unwrap();
    assert_eq!(edited.draft_title, "New headline");
    assert_eq!(edited.draft_content, draft.draft_content);
    assert_eq!(edited.status, Draft);
    // Omitted optional fields keep their stored values.
    assert_eq!(edited.category_id, draft.category_id);
    assert_eq!(edited.publish_start, draft.publish_start);
    assert_eq!(edited.publish_end, draft.publish_end);
}

#[test]
fn test_edit_draft_refused_once_submitted() {
    let author = legacy("teacher");
    for status in [Pending, Published, Invalidated] {
        let current = article(author.id, status);
        let err = ArticleLifecycle::edit_draft(&current, &author, DraftEdits::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }
}

// --- Invalidate ---

#[test]
fn test_invalidate_is_admin_only_and_final() {
    let admin = legacy("admin");
    let published = article(uuid::Uuid::new_v4(), Published);
    let invalidated =
        ArticleLifecycle::invalidate(&published, &admin, "Factually wrong", Utc::now()).unwrap();
    assert_eq!(invalidated.status, Invalidated);
    assert_eq!(invalidated.invalidation_reason.as_deref(), Some("Factually wrong"));

    for status in [Draft, Pending, Published, Rejected, Invalidated] {
        assert!(!ArticleLifecycle::can_transition(Invalidated, status));
    }

    let moderator = legacy("moderator");
    let err = ArticleLifecycle::invalidate(&published, &moderator, "spam", Utc::now()).unwrap_err();
    assert_eq!(err, CoreError::unauthorized("admin"));

    let err = ArticleLifecycle::invalidate(&published, &admin, "", Utc::now()).unwrap_err();
    assert_eq!(validation_field(err), "admin_invalidation_reason");
}

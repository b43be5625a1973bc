use crate::{
    accounts::AccountService,
    articles::ArticleService,
    auth::AuthUser,
    authorization::AuthorizationResolver,
    engagement::EngagementCounters,
    error::CoreError,
    models::{
        ActorProfile, Article, ArticleDraft, DraftEdits, InvalidateRequest, LikeToggle,
        ModerateRequest, ModerationAuditEntry, ModerationPayload, SetLikeRequest, User, Verdict,
        VerifyUserRequest, ViewCount,
    },
    moderation::ModerationService,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

// --- Public Handlers ---

/// list_published
///
/// [Public Route] Lists every published article.
#[utoipa::path(
    get,
    path = "/articles",
    responses((status = 200, description = "Published articles", body = [Article]))
)]
pub async fn list_published(
    State(articles): State<ArticleService>,
) -> Result<Json<Vec<Article>>, CoreError> {
    Ok(Json(articles.published().await?))
}

/// get_published_article
///
/// [Public Route] Retrieves a single published article. Anything not published answers 404.
#[utoipa::path(
    get,
    path = "/articles/{id}",
    responses(
        (status = 200, description = "Article", body = Article),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_published_article(
    State(articles): State<ArticleService>,
    Path(article_id): Path<i64>,
) -> Result<Json<Article>, CoreError> {
    Ok(Json(articles.visible(None, article_id).await?))
}

// --- Authenticated Handlers ---

/// get_me
///
/// [Authenticated Route] The caller's resolved roles and effective capabilities.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current actor", body = ActorProfile),
        (status = 401, description = "Unauthenticated")
    )
)]
pub async fn get_me(AuthUser(actor): AuthUser) -> Json<ActorProfile> {
    let resolved = Some(&actor);
    Json(ActorProfile {
        id: actor.id,
        role_legacy: actor.role_legacy.as_str().to_string(),
        role_detailed: actor.role_detailed.as_ref().map(|role| role.name.clone()),
        verified: actor.verified,
        is_admin: AuthorizationResolver::is_admin(resolved),
        is_moderator: AuthorizationResolver::is_moderator(resolved),
        capabilities: AuthorizationResolver::capabilities(resolved).into_iter().collect(),
    })
}

/// get_my_articles
///
/// [Authenticated Route] Everything the caller wrote, in any status.
#[utoipa::path(
    get,
    path = "/me/articles",
    responses((status = 200, description = "My articles", body = [Article]))
)]
pub async fn get_my_articles(
    AuthUser(actor): AuthUser,
    State(articles): State<ArticleService>,
) -> Result<Json<Vec<Article>>, CoreError> {
    Ok(Json(articles.mine(&actor).await?))
}

/// submit_article
///
/// [Authenticated Route] Creates an article and submits it for moderation in one step.
#[utoipa::path(
    post,
    path = "/articles",
    request_body = ArticleDraft,
    responses(
        (status = 201, description = "Submitted", body = Article),
        (status = 403, description = "Missing can_create_content"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn submit_article(
    AuthUser(actor): AuthUser,
    State(articles): State<ArticleService>,
    Json(payload): Json<ArticleDraft>,
) -> Result<(StatusCode, Json<Article>), CoreError> {
    let article = articles.submit_article(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// create_draft
///
/// [Authenticated Route] Stores a draft. Drafts may be incomplete until submitted.
#[utoipa::path(
    post,
    path = "/articles/drafts",
    request_body = ArticleDraft,
    responses(
        (status = 201, description = "Draft created", body = Article),
        (status = 403, description = "Missing can_create_content")
    )
)]
pub async fn create_draft(
    AuthUser(actor): AuthUser,
    State(articles): State<ArticleService>,
    Json(payload): Json<ArticleDraft>,
) -> Result<(StatusCode, Json<Article>), CoreError> {
    let article = articles.create_draft(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

/// update_draft
///
/// [Authenticated Route] Author edits, allowed while the article is a draft or rejected.
#[utoipa::path(
    put,
    path = "/articles/{id}",
    request_body = DraftEdits,
    responses(
        (status = 200, description = "Updated", body = Article),
        (status = 403, description = "Not the author"),
        (status = 409, description = "Not editable in its current status")
    )
)]
pub async fn update_draft(
    AuthUser(actor): AuthUser,
    State(articles): State<ArticleService>,
    Path(article_id): Path<i64>,
    Json(payload): Json<DraftEdits>,
) -> Result<Json<Article>, CoreError> {
    Ok(Json(articles.update_draft(&actor, article_id, payload).await?))
}

/// submit_draft
///
/// [Authenticated Route] `draft -> pending`.
#[utoipa::path(
    post,
    path = "/articles/{id}/submit",
    responses(
        (status = 200, description = "Submitted", body = Article),
        (status = 409, description = "Invalid transition"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn submit_draft(
    AuthUser(actor): AuthUser,
    State(articles): State<ArticleService>,
    Path(article_id): Path<i64>,
) -> Result<Json<Article>, CoreError> {
    Ok(Json(articles.submit(&actor, article_id).await?))
}

/// resubmit_article
///
/// [Authenticated Route] `rejected -> pending`.
#[utoipa::path(
    post,
    path = "/articles/{id}/resubmit",
    responses(
        (status = 200, description = "Resubmitted", body = Article),
        (status = 409, description = "Invalid transition")
    )
)]
pub async fn resubmit_article(
    AuthUser(actor): AuthUser,
    State(articles): State<ArticleService>,
    Path(article_id): Path<i64>,
) -> Result<Json<Article>, CoreError> {
    Ok(Json(articles.resubmit(&actor, article_id).await?))
}

/// preview_article
///
/// [Authenticated Route] Reads an article in any status, for its author and moderators.
#[utoipa::path(
    get,
    path = "/articles/{id}/preview",
    responses(
        (status = 200, description = "Article", body = Article),
        (status = 404, description = "Not Found")
    )
)]
pub async fn preview_article(
    AuthUser(actor): AuthUser,
    State(articles): State<ArticleService>,
    Path(article_id): Path<i64>,
) -> Result<Json<Article>, CoreError> {
    Ok(Json(articles.visible(Some(&actor), article_id).await?))
}

/// toggle_like
///
/// [Authenticated Route] Flips the caller's like on an article.
#[utoipa::path(
    post,
    path = "/articles/{id}/like",
    responses(
        (status = 200, description = "Like state", body = LikeToggle),
        (status = 404, description = "Not Found")
    )
)]
pub async fn toggle_like(
    AuthUser(actor): AuthUser,
    State(engagement): State<EngagementCounters>,
    Path(article_id): Path<i64>,
) -> Result<Json<LikeToggle>, CoreError> {
    Ok(Json(engagement.toggle_like(&actor, article_id).await?))
}

/// set_like
///
/// [Authenticated Route] Sets the caller's like to an explicit state. Safe to retry.
#[utoipa::path(
    put,
    path = "/articles/{id}/like",
    request_body = SetLikeRequest,
    responses(
        (status = 200, description = "Like state", body = LikeToggle),
        (status = 404, description = "Not Found")
    )
)]
pub async fn set_like(
    AuthUser(actor): AuthUser,
    State(engagement): State<EngagementCounters>,
    Path(article_id): Path<i64>,
    Json(payload): Json<SetLikeRequest>,
) -> Result<Json<LikeToggle>, CoreError> {
    Ok(Json(
        engagement
            .set_like(&actor, article_id, payload.liked)
            .await?,
    ))
}

/// record_view
///
/// [Authenticated Route] Counts one view.
#[utoipa::path(
    post,
    path = "/articles/{id}/views",
    responses(
        (status = 200, description = "View count", body = ViewCount),
        (status = 404, description = "Not Found")
    )
)]
pub async fn record_view(
    AuthUser(actor): AuthUser,
    State(engagement): State<EngagementCounters>,
    Path(article_id): Path<i64>,
) -> Result<Json<ViewCount>, CoreError> {
    let view_count = engagement.record_view(&actor, article_id).await?;
    Ok(Json(ViewCount { view_count }))
}

// --- Moderation Handlers ---

/// get_moderation_queue
///
/// [Moderation Route] Articles awaiting a decision.
#[utoipa::path(
    get,
    path = "/moderation/queue",
    responses(
        (status = 200, description = "Pending articles", body = [Article]),
        (status = 403, description = "Not a moderator")
    )
)]
pub async fn get_moderation_queue(
    AuthUser(actor): AuthUser,
    State(moderation): State<ModerationService>,
) -> Result<Json<Vec<Article>>, CoreError> {
    Ok(Json(moderation.pending_queue(&actor).await?))
}

/// moderate_article
///
/// [Moderation Route] Applies an approve or reject verdict to a pending article.
#[utoipa::path(
    post,
    path = "/moderation/articles/{id}",
    request_body = ModerateRequest,
    responses(
        (status = 200, description = "Decision applied", body = Article),
        (status = 403, description = "Missing can_moderate_news"),
        (status = 409, description = "Invalid transition or stale state"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn moderate_article(
    AuthUser(actor): AuthUser,
    State(moderation): State<ModerationService>,
    Path(article_id): Path<i64>,
    Json(request): Json<ModerateRequest>,
) -> Result<Json<Article>, CoreError> {
    let article = moderation
        .moderate(&actor, article_id, request.action, request.payload)
        .await?;
    Ok(Json(article))
}

/// approve_article
///
/// [Moderation Route] Publishes a pending article, optionally with edited final copy.
#[utoipa::path(
    post,
    path = "/moderation/articles/{id}/approve",
    request_body = ModerationPayload,
    responses(
        (status = 200, description = "Published", body = Article),
        (status = 409, description = "Invalid transition or stale state")
    )
)]
pub async fn approve_article(
    AuthUser(actor): AuthUser,
    State(moderation): State<ModerationService>,
    Path(article_id): Path<i64>,
    payload: Option<Json<ModerationPayload>>,
) -> Result<Json<Article>, CoreError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    let article = moderation
        .moderate(&actor, article_id, Verdict::Approve, payload)
        .await?;
    Ok(Json(article))
}

/// reject_article
///
/// [Moderation Route] Rejects a pending article. `reason` is required.
#[utoipa::path(
    post,
    path = "/moderation/articles/{id}/reject",
    request_body = ModerationPayload,
    responses(
        (status = 200, description = "Rejected", body = Article),
        (status = 422, description = "Missing reason")
    )
)]
pub async fn reject_article(
    AuthUser(actor): AuthUser,
    State(moderation): State<ModerationService>,
    Path(article_id): Path<i64>,
    Json(payload): Json<ModerationPayload>,
) -> Result<Json<Article>, CoreError> {
    let article = moderation
        .moderate(&actor, article_id, Verdict::Reject, payload)
        .await?;
    Ok(Json(article))
}

/// invalidate_article
///
/// [Moderation Route] Withdraws a published article. Admins only.
#[utoipa::path(
    post,
    path = "/moderation/articles/{id}/invalidate",
    request_body = InvalidateRequest,
    responses(
        (status = 200, description = "Invalidated", body = Article),
        (status = 403, description = "Not an admin"),
        (status = 409, description = "Invalid transition or stale state")
    )
)]
pub async fn invalidate_article(
    AuthUser(actor): AuthUser,
    State(moderation): State<ModerationService>,
    Path(article_id): Path<i64>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<Article>, CoreError> {
    let article = moderation
        .invalidate(&actor, article_id, &request.reason, request.expected_version)
        .await?;
    Ok(Json(article))
}

/// get_audit_log
///
/// [Moderation Route] The moderation history of one article.
#[utoipa::path(
    get,
    path = "/moderation/articles/{id}/audit",
    responses(
        (status = 200, description = "Audit entries", body = [ModerationAuditEntry]),
        (status = 403, description = "Not a moderator")
    )
)]
pub async fn get_audit_log(
    AuthUser(actor): AuthUser,
    State(moderation): State<ModerationService>,
    Path(article_id): Path<i64>,
) -> Result<Json<Vec<ModerationAuditEntry>>, CoreError> {
    Ok(Json(moderation.audit_log(&actor, article_id).await?))
}

/// verify_user
///
/// [Moderation Route] Marks another user as verified (or not).
#[utoipa::path(
    post,
    path = "/moderation/users/{id}/verify",
    request_body = VerifyUserRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 403, description = "Missing can_verify_users"),
        (status = 404, description = "User not found")
    )
)]
pub async fn verify_user(
    AuthUser(actor): AuthUser,
    State(accounts): State<AccountService>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<VerifyUserRequest>,
) -> Result<Json<User>, CoreError> {
    Ok(Json(
        accounts
            .verify_user(&actor, user_id, payload.verified)
            .await?,
    ))
}

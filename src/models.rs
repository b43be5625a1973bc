use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{collections::BTreeMap, fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::CoreError;

// --- Authorization Vocabulary ---

/// Capability
///
/// The closed set of permissions checked by the authorization resolver.
/// Parsing an unknown name fails with `CoreError::UnknownCapability`; there is no
/// catch-all variant, so an unrecognized capability can never be granted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Capability {
    CanViewContent,
    CanCreateContent,
    CanModerateNews,
    CanVerifyUsers,
    CanManageAll,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::CanViewContent,
        Capability::CanCreateContent,
        Capability::CanModerateNews,
        Capability::CanVerifyUsers,
        Capability::CanManageAll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::CanViewContent => "can_view_content",
            Capability::CanCreateContent => "can_create_content",
            Capability::CanModerateNews => "can_moderate_news",
            Capability::CanVerifyUsers => "can_verify_users",
            Capability::CanManageAll => "can_manage_all",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|capability| capability.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCapability(s.to_string()))
    }
}

/// LegacyRole
///
/// The coarse role string stored on every profile. Values outside the known five are kept
/// verbatim as `Unrecognized` so that a bad row degrades to "no capabilities" instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LegacyRole {
    Student,
    Teacher,
    Publisher,
    Moderator,
    Admin,
    Unrecognized(String),
}

impl LegacyRole {
    pub fn as_str(&self) -> &str {
        match self {
            LegacyRole::Student => "student",
            LegacyRole::Teacher => "teacher",
            LegacyRole::Publisher => "publisher",
            LegacyRole::Moderator => "moderator",
            LegacyRole::Admin => "admin",
            LegacyRole::Unrecognized(other) => other,
        }
    }
}

impl From<&str> for LegacyRole {
    fn from(value: &str) -> Self {
        match value {
            "student" => LegacyRole::Student,
            "teacher" => LegacyRole::Teacher,
            "publisher" => LegacyRole::Publisher,
            "moderator" => LegacyRole::Moderator,
            "admin" => LegacyRole::Admin,
            other => LegacyRole::Unrecognized(other.to_string()),
        }
    }
}

impl From<String> for LegacyRole {
    fn from(value: String) -> Self {
        LegacyRole::from(value.as_str())
    }
}

impl From<LegacyRole> for String {
    fn from(role: LegacyRole) -> Self {
        role.as_str().to_string()
    }
}

/// RoleDefinition
///
/// A named, fine-grained role. A capability missing from `permissions` is denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    pub permissions: BTreeMap<Capability, bool>,
}

impl RoleDefinition {
    /// The explicit grant for `capability`, if the role mentions it at all.
    pub fn permits(&self, capability: Capability) -> Option<bool> {
        self.permissions.get(&capability).copied()
    }
}

/// Actor
///
/// The authenticated identity attempting an action. Every core operation receives it
/// explicitly; there is no ambient "current user".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role_legacy: LegacyRole,
    pub role_detailed: Option<RoleDefinition>,
    pub verified: bool,
}

/// Role
///
/// The role that decides an actor's capabilities: the detailed role once one is assigned,
/// the legacy role otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role<'a> {
    Legacy(&'a LegacyRole),
    Detailed(&'a RoleDefinition),
}

impl Actor {
    pub fn role(&self) -> Role<'_> {
        match &self.role_detailed {
            Some(definition) => Role::Detailed(definition),
            None => Role::Legacy(&self.role_legacy),
        }
    }
}

// --- Persisted Records ---

/// User
///
/// A row of the `profiles` table. `role` is the legacy role string and `role_detailed`
/// names an entry of the `roles` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub role_detailed: Option<String>,
    pub verified: bool,
}

/// RoleRecord
///
/// A row of the `roles` table. Permission keys are validated when the catalog is built.
#[derive(Debug, Clone, FromRow)]
pub struct RoleRecord {
    pub name: String,
    pub permissions: sqlx::types::Json<BTreeMap<String, bool>>,
}

/// Category
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

// --- Articles ---

/// ArticleStatus
///
/// Stored as the Postgres enum `article_status`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, sqlx::Type, Default,
)]
#[sqlx(type_name = "article_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ArticleStatus {
    #[default]
    Draft,
    Pending,
    Published,
    Rejected,
    Invalidated,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Pending => "pending",
            ArticleStatus::Published => "published",
            ArticleStatus::Rejected => "rejected",
            ArticleStatus::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Article
///
/// A news article from the `articles` table. The author owns the draft fields; the
/// moderator who acts on the article owns the final fields and the moderation comment.
///
/// `version` is bumped by every lifecycle write and used for compare-and-swap; the
/// engagement counters are updated independently and leave it alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Article {
    pub id: i64,
    pub author_id: Uuid,
    pub category_id: Option<i64>,
    pub status: ArticleStatus,

    pub draft_title: String,
    pub draft_content: String,
    pub final_title: Option<String>,
    pub final_content: Option<String>,

    pub moderation_comment: Option<String>,
    pub moderator_id: Option<Uuid>,
    pub invalidation_reason: Option<String>,

    pub view_count: i64,
    pub like_count: i64,

    // Desired publication window requested by the author.
    #[ts(type = "string | null")]
    pub publish_start: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub publish_end: Option<DateTime<Utc>>,

    pub version: i64,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
}

impl Article {
    /// Builds an unsaved draft owned by `author_id`. The repository assigns the id.
    pub fn new_draft(author_id: Uuid, draft: ArticleDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            author_id,
            category_id: draft.category_id,
            status: ArticleStatus::Draft,
            draft_title: draft.title,
            draft_content: draft.content,
            publish_start: draft.publish_start,
            publish_end: draft.publish_end,
            version: 0,
            created_at: now,
            updated_at: now,
            ..Self::default()
        }
    }

    /// The title shown to readers: the approved one once published, the draft otherwise.
    pub fn display_title(&self) -> &str {
        self.final_title.as_deref().unwrap_or(&self.draft_title)
    }
}

/// NewArticle
///
/// The author-controlled columns of an article about to be inserted.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub author_id: Uuid,
    pub category_id: Option<i64>,
    pub status: ArticleStatus,
    pub draft_title: String,
    pub draft_content: String,
    pub publish_start: Option<DateTime<Utc>>,
    pub publish_end: Option<DateTime<Utc>>,
}

impl From<&Article> for NewArticle {
    fn from(article: &Article) -> Self {
        Self {
            author_id: article.author_id,
            category_id: article.category_id,
            status: article.status,
            draft_title: article.draft_title.clone(),
            draft_content: article.draft_content.clone(),
            publish_start: article.publish_start,
            publish_end: article.publish_end,
        }
    }
}

// --- Moderation ---

/// ModerationAction
///
/// Stored as the Postgres enum `moderation_action`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, sqlx::Type)]
#[sqlx(type_name = "moderation_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ModerationAction {
    Approve,
    Reject,
    Invalidate,
}

/// Verdict
///
/// The decisions a moderator can take on a pending article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Verdict {
    Approve,
    Reject,
}

impl From<Verdict> for ModerationAction {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Approve => ModerationAction::Approve,
            Verdict::Reject => ModerationAction::Reject,
        }
    }
}

/// ModerationAuditEntry
///
/// Append-only record of a moderation decision (`moderation_audit` table).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow)]
#[ts(export)]
pub struct ModerationAuditEntry {
    pub id: i64,
    pub article_id: i64,
    pub moderator_id: Uuid,
    pub action: ModerationAction,
    pub reason: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// NewAuditEntry
///
/// An audit entry to be written in the same unit as the transition it describes.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub article_id: i64,
    pub moderator_id: Uuid,
    pub action: ModerationAction,
    pub reason: String,
}

// --- Request Payloads (Input Schemas) ---

/// ArticleDraft
///
/// Input payload for creating a draft (POST /articles/drafts) or creating and submitting
/// in one step (POST /articles).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
    pub category_id: Option<i64>,
    #[ts(type = "string | null")]
    pub publish_start: Option<DateTime<Utc>>,
    #[ts(type = "string | null")]
    pub publish_end: Option<DateTime<Utc>>,
}

/// DraftEdits
///
/// Partial update of an author's draft (PUT /articles/{id}). Only provided fields change.
/// `None` means "unchanged", so `category_id`, `publish_start` and `publish_end` can be
/// set or replaced here but not cleared once set.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DraftEdits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub publish_start: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub publish_end: Option<DateTime<Utc>>,
}

/// ModerationPayload
///
/// Details accompanying a verdict. `final_title`/`final_content` override the draft copy on
/// approval; `expected_version` is the version the moderator was looking at.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ModerationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i64>,
}

/// ModerateRequest
///
/// Input payload for POST /moderation/articles/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ModerateRequest {
    pub action: Verdict,
    #[serde(flatten)]
    pub payload: ModerationPayload,
}

/// InvalidateRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct InvalidateRequest {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<i64>,
}

/// SetLikeRequest
///
/// Explicit like intent (PUT /articles/{id}/like). Repeating it is a no-op.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SetLikeRequest {
    pub liked: bool,
}

/// VerifyUserRequest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct VerifyUserRequest {
    #[serde(default = "default_verified")]
    pub verified: bool,
}

fn default_verified() -> bool {
    true
}

// --- Responses (Output Schemas) ---

/// LikeToggle
///
/// The pair's state after a like operation and the article's resulting like count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

/// ViewCount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ViewCount {
    pub view_count: i64,
}

/// ActorProfile
///
/// Output schema for GET /me: the resolved roles and the effective capability set.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ActorProfile {
    pub id: Uuid,
    pub role_legacy: String,
    pub role_detailed: Option<String>,
    pub verified: bool,
    pub is_admin: bool,
    pub is_moderator: bool,
    pub capabilities: Vec<Capability>,
}

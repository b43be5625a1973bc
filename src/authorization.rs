use std::collections::BTreeSet;

use crate::{
    error::CoreError,
    models::{Actor, Article, ArticleStatus, Capability, LegacyRole, Role},
    roles::RoleCatalog,
};

pub const ADMIN_ROLE: &str = "admin_global";
pub const MODERATOR_ROLE: &str = "moderateur";

/// AuthorizationResolver
///
/// Decides whether an actor holds a capability. It works on an already-loaded `Actor`
/// snapshot and never touches the network or the database, so it is safe to call from any
/// number of request handlers at once.
///
/// Resolution order:
/// 1. With a detailed role, the explicit entry decides, including an explicit `false`.
/// 2. With a detailed role that does not mention the capability, the answer is `false`.
///    The legacy role is not consulted once a detailed role is assigned.
/// 3. Without a detailed role, the legacy table decides.
///
/// An absent actor has no capabilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationResolver;

impl AuthorizationResolver {
    pub fn has_capability(actor: Option<&Actor>, capability: Capability) -> bool {
        let Some(actor) = actor else {
            return false;
        };
        match actor.role() {
            Role::Detailed(definition) => definition.permits(capability).unwrap_or(false),
            Role::Legacy(legacy) => RoleCatalog::legacy_capabilities(legacy).contains(&capability),
        }
    }

    /// The full effective capability set of an actor.
    pub fn capabilities(actor: Option<&Actor>) -> BTreeSet<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| Self::has_capability(actor, *capability))
            .collect()
    }

    pub fn is_admin(actor: Option<&Actor>) -> bool {
        let Some(actor) = actor else {
            return false;
        };
        match actor.role() {
            Role::Detailed(definition) => {
                definition.name == ADMIN_ROLE
                    || Self::has_capability(Some(actor), Capability::CanManageAll)
            }
            Role::Legacy(legacy) => *legacy == LegacyRole::Admin,
        }
    }

    pub fn is_moderator(actor: Option<&Actor>) -> bool {
        let Some(actor) = actor else {
            return false;
        };
        match actor.role() {
            Role::Detailed(definition) => {
                definition.name == MODERATOR_ROLE
                    || Self::has_capability(Some(actor), Capability::CanModerateNews)
            }
            // Legacy admins always moderate.
            Role::Legacy(legacy) => {
                *legacy == LegacyRole::Admin
                    || Self::has_capability(Some(actor), Capability::CanModerateNews)
            }
        }
    }

    pub fn can_verify_users(actor: Option<&Actor>) -> bool {
        let Some(actor) = actor else {
            return false;
        };
        match actor.role() {
            Role::Detailed(_) => Self::has_capability(Some(actor), Capability::CanVerifyUsers),
            Role::Legacy(legacy) => *legacy == LegacyRole::Admin,
        }
    }

    /// can_read
    ///
    /// Published articles are readable by anyone. Any other status only by the author and
    /// by moderators.
    pub fn can_read(viewer: Option<&Actor>, article: &Article) -> bool {
        article.status == ArticleStatus::Published
            || viewer.is_some_and(|actor| actor.id == article.author_id)
            || Self::is_moderator(viewer)
    }

    /// require
    ///
    /// `Unauthenticated` without an actor, `Unauthorized` naming the capability when denied.
    pub fn require(actor: Option<&Actor>, capability: Capability) -> Result<&Actor, CoreError> {
        let actor = actor.ok_or(CoreError::Unauthenticated)?;
        if Self::has_capability(Some(actor), capability) {
            Ok(actor)
        } else {
            tracing::debug!(actor = %actor.id, %capability, "capability denied");
            Err(CoreError::unauthorized(capability.as_str()))
        }
    }

    pub fn require_admin(actor: Option<&Actor>) -> Result<&Actor, CoreError> {
        let actor = actor.ok_or(CoreError::Unauthenticated)?;
        if Self::is_admin(Some(actor)) {
            Ok(actor)
        } else {
            tracing::debug!(actor = %actor.id, "admin privileges denied");
            Err(CoreError::unauthorized("admin"))
        }
    }

    pub fn require_moderator(actor: Option<&Actor>) -> Result<&Actor, CoreError> {
        let actor = actor.ok_or(CoreError::Unauthenticated)?;
        if Self::is_moderator(Some(actor)) {
            Ok(actor)
        } else {
            Err(CoreError::unauthorized(Capability::CanModerateNews.as_str()))
        }
    }
}

use uuid::Uuid;

use crate::{
    authorization::AuthorizationResolver,
    error::{CoreError, persistence_failure},
    models::{Actor, Capability, User},
    repository::RepositoryState,
};

/// AccountService
///
/// User verification. Role assignment itself is managed outside this service.
#[derive(Clone)]
pub struct AccountService {
    repo: RepositoryState,
}

impl AccountService {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// verify_user
    ///
    /// Sets the `verified` flag of another user. Requires `can_verify_users` under a detailed
    /// role, or the legacy admin role.
    pub async fn verify_user(
        &self,
        actor: &Actor,
        user_id: Uuid,
        verified: bool,
    ) -> Result<User, CoreError> {
        if !AuthorizationResolver::can_verify_users(Some(actor)) {
            return Err(CoreError::unauthorized(Capability::CanVerifyUsers.as_str()));
        }

        let user = self
            .repo
            .set_user_verified(user_id, verified)
            .await
            .map_err(persistence_failure("verify_user"))?
            .ok_or_else(|| CoreError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;

        tracing::info!(user = %user.id, verified, by = %actor.id, "user verification updated");
        Ok(user)
    }
}

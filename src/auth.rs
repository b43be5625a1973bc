use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{CoreError, persistence_failure},
    models::{Actor, LegacyRole, User},
    repository::RepositoryState,
    roles::{CatalogState, RoleCatalog},
};

/// Claims
///
/// The payload expected inside the JWT issued by the authentication service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the profile id of the user.
    pub sub: Uuid,
    /// Expiration time (seconds since the epoch). Always validated.
    pub exp: usize,
    /// Issued at.
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request, as a fully loaded `Actor` snapshot
/// (legacy role, detailed role definition and verification flag).
#[derive(Debug, Clone)]
pub struct AuthUser(pub Actor);

/// actor_from_user
///
/// Builds the actor snapshot for a profile row. A `role_detailed` name that the catalog
/// does not know is a configuration fault and fails with `UnknownRole`.
pub fn actor_from_user(catalog: &RoleCatalog, user: User) -> Result<Actor, CoreError> {
    let role_detailed = match user.role_detailed.as_deref() {
        Some(name) => Some(catalog.resolve(name)?.clone()),
        None => None,
    };
    Ok(Actor {
        id: user.id,
        role_legacy: LegacyRole::from(user.role),
        role_detailed,
        verified: user.verified,
    })
}

/// issue_token
///
/// Signs a token for `user_id` valid for `ttl_secs`. The production issuer is external;
/// this is what local tooling and tests use to mint compatible tokens.
pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + ttl_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass: with `Env::Local`, an `x-user-id` header naming an existing profile is
///    accepted in place of a token.
/// 2. Bearer token extraction and JWT validation (signature and expiry).
/// 3. Profile lookup, so a user deleted after the token was issued is rejected.
/// 4. Actor snapshot construction through the role catalog.
///
/// Rejects with `Unauthenticated` (401) on any authentication failure; catalog and
/// persistence faults surface as 500s.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
    CatalogState: FromRef<S>,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        let catalog = CatalogState::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());
            if let Some(user_id) = bypass_id {
                let user = repo
                    .get_user(user_id)
                    .await
                    .map_err(persistence_failure("load_actor"))?;
                if let Some(user) = user {
                    return Ok(AuthUser(actor_from_user(&catalog, user)?));
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(CoreError::Unauthenticated)?;

        let mut validation = Validation::default();
        validation.validate_exp = true;
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("rejected expired token"),
                other => tracing::debug!(reason = ?other, "rejected invalid token"),
            }
            CoreError::Unauthenticated
        })?;

        let user = repo
            .get_user(token_data.claims.sub)
            .await
            .map_err(persistence_failure("load_actor"))?
            .ok_or(CoreError::Unauthenticated)?;

        Ok(AuthUser(actor_from_user(&catalog, user)?))
    }
}

#![allow(dead_code)]

use campus_news::{
    models::{Actor, Article, ArticleStatus, Capability, Category, LegacyRole, RoleDefinition, User},
    repository::InMemoryRepository,
};
use chrono::{Duration, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

// --- Shared Test Fixtures ---

pub const CATEGORY_ID: i64 = 7;

pub fn legacy(role: &str) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        role_legacy: LegacyRole::from(role),
        role_detailed: None,
        verified: true,
    }
}

pub fn detailed(legacy_role: &str, name: &str, grants: &[(Capability, bool)]) -> Actor {
    Actor {
        role_detailed: Some(role_definition(name, grants)),
        ..legacy(legacy_role)
    }
}

pub fn role_definition(name: &str, grants: &[(Capability, bool)]) -> RoleDefinition {
    RoleDefinition {
        name: name.to_string(),
        permissions: grants.iter().copied().collect::<BTreeMap<_, _>>(),
    }
}

pub fn user_for(actor: &Actor) -> User {
    User {
        id: actor.id,
        email: format!("{}@campus.test", actor.id),
        role: actor.role_legacy.as_str().to_string(),
        role_detailed: actor.role_detailed.as_ref().map(|role| role.name.clone()),
        verified: actor.verified,
    }
}

/// A complete article in `status`, written by `author_id`.
pub fn article(author_id: Uuid, status: ArticleStatus) -> Article {
    let now = Utc::now();
    Article {
        id: 0,
        author_id,
        category_id: Some(CATEGORY_ID),
        status,
        draft_title: "Campus library extends opening hours".to_string(),
        draft_content: "Starting next week the library stays open until midnight.".to_string(),
        publish_start: Some(now + Duration::days(1)),
        publish_end: Some(now + Duration::days(8)),
        created_at: now,
        updated_at: now,
        ..Article::default()
    }
}

pub fn repo_with_category() -> InMemoryRepository {
    InMemoryRepository::new().with_category(Category {
        id: CATEGORY_ID,
        name: "Campus life".to_string(),
    })
}

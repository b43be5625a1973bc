use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    error::CoreError,
    models::{Capability, LegacyRole, RoleDefinition, RoleRecord},
};

/// RoleCatalog
///
/// The set of detailed role definitions known for this process, plus the fixed legacy table.
/// It is built once at startup from the `roles` table and never mutated afterwards; role
/// administration happens outside this service.
#[derive(Debug, Clone, Default)]
pub struct RoleCatalog {
    roles: HashMap<String, RoleDefinition>,
}

/// CatalogState
///
/// The shared, read-only catalog handed to the extractors.
pub type CatalogState = Arc<RoleCatalog>;

impl RoleCatalog {
    pub fn new(definitions: impl IntoIterator<Item = RoleDefinition>) -> Self {
        Self {
            roles: definitions
                .into_iter()
                .map(|definition| (definition.name.clone(), definition))
                .collect(),
        }
    }

    /// from_records
    ///
    /// Builds the catalog from persisted rows. A permission key outside the capability set
    /// aborts the load with `UnknownCapability` instead of being ignored.
    pub fn from_records(records: Vec<RoleRecord>) -> Result<Self, CoreError> {
        let mut roles = HashMap::with_capacity(records.len());
        for record in records {
            let mut permissions = BTreeMap::new();
            for (key, granted) in record.permissions.0 {
                permissions.insert(Capability::from_str(&key)?, granted);
            }
            tracing::debug!(role = %record.name, entries = permissions.len(), "loaded role definition");
            roles.insert(
                record.name.clone(),
                RoleDefinition {
                    name: record.name,
                    permissions,
                },
            );
        }
        Ok(Self { roles })
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// resolve
    ///
    /// Looks up a definition by name; used when building an `Actor` snapshot.
    pub fn resolve(&self, role: &str) -> Result<&RoleDefinition, CoreError> {
        self.roles
            .get(role)
            .ok_or_else(|| CoreError::UnknownRole(role.to_string()))
    }

    /// get_permissions
    ///
    /// The explicit permission map of a registered role.
    pub fn get_permissions(&self, role: &str) -> Result<&BTreeMap<Capability, bool>, CoreError> {
        self.resolve(role).map(|definition| &definition.permissions)
    }

    /// legacy_capabilities
    ///
    /// The hardcoded capability table for legacy roles. Unrecognized roles get nothing.
    pub fn legacy_capabilities(role: &LegacyRole) -> BTreeSet<Capability> {
        use Capability::*;

        let granted: &[Capability] = match role {
            LegacyRole::Admin => &Capability::ALL,
            LegacyRole::Moderator => &[CanModerateNews, CanViewContent],
            LegacyRole::Publisher | LegacyRole::Teacher => &[CanCreateContent, CanViewContent],
            LegacyRole::Student => &[CanViewContent],
            LegacyRole::Unrecognized(_) => &[],
        };
        granted.iter().copied().collect()
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, RoleEntity, normalize};
use crate::constants::ROLES;

/// The stock role type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRole {
    pub id: String,
    pub name: Option<String>,
    pub normalized_name: Option<String>,
    pub concurrency_stamp: Option<String>,
}

impl IdentityRole {
    /// A new role with a fresh ID and a normalized name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: Uuid::new_v4().to_string(),
            normalized_name: Some(normalize(&name)),
            name: Some(name),
            concurrency_stamp: Some(Uuid::new_v4().to_string()),
        }
    }
}

impl Entity for IdentityRole {
    const COLLECTION: &'static str = ROLES;

    fn id(&self) -> &str {
        &self.id
    }
}

impl RoleEntity for IdentityRole {
    fn normalized_name(&self) -> Option<&str> {
        self.normalized_name.as_deref()
    }
}

impl std::fmt::Display for IdentityRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or(&self.id))
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("{email} may not {permission:?}")]
    Forbidden { email: String, permission: Permission },
    #[error("reading role table {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing role table {path:?}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Editor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ManageContent,
    ManageUsers,
    ViewStats,
}

impl Permission {
    fn granted_to(self, role: Role) -> bool {
        match (self, role) {
            (_, Role::Admin) => true,
            (Permission::ManageContent | Permission::ViewStats, Role::Editor) => true,
            (Permission::ManageUsers, Role::Editor) => false,
        }
    }
}

/// An already authenticated caller, as handed over by the sign-in provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Principal {
    pub email: String,
    pub claims: BTreeMap<String, Value>,
}

impl Principal {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.to_owned(),
            claims: BTreeMap::new(),
        }
    }

    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_owned(), value);
        self
    }

    fn admin_claim(&self) -> bool {
        self.claims.get("admin").and_then(Value::as_bool).unwrap_or(false)
    }
}

#[derive(Deserialize)]
struct RoleFile {
    #[serde(default)]
    principals: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    email: String,
    #[serde(default)]
    roles: BTreeSet<Role>,
}

/// Who holds which roles, keyed by lower-cased email.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleTable {
    roles: BTreeMap<String, BTreeSet<Role>>,
}

impl RoleTable {
    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        let file: RoleFile = serde_yaml::from_str(raw)?;
        let mut table = Self::default();
        for entry in file.principals {
            table.grant(&entry.email, entry.roles);
        }
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, AccessError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AccessError::Io {
            path: path.to_owned(),
            source,
        })?;
        let table = Self::from_yaml(&raw).map_err(|source| AccessError::Yaml {
            path: path.to_owned(),
            source,
        })?;
        log::info!("Loaded roles for {} principals", table.roles.len());
        Ok(table)
    }

    pub fn grant(&mut self, email: &str, roles: impl IntoIterator<Item = Role>) {
        self.roles
            .entry(email.trim().to_lowercase())
            .or_default()
            .extend(roles);
    }

    pub fn roles_of(&self, principal: &Principal) -> BTreeSet<Role> {
        let mut roles = self
            .roles
            .get(&principal.email.trim().to_lowercase())
            .cloned()
            .unwrap_or_default();
        if principal.admin_claim() {
            roles.insert(Role::Admin);
        }
        roles
    }

    pub fn is_admin(&self, principal: &Principal) -> bool {
        self.roles_of(principal).contains(&Role::Admin)
    }

    pub fn allows(&self, principal: &Principal, permission: Permission) -> bool {
        self.roles_of(principal)
            .into_iter()
            .any(|role| permission.granted_to(role))
    }

    pub fn require(&self, principal: &Principal, permission: Permission) -> Result<(), AccessError> {
        if self.allows(principal, permission) {
            Ok(())
        } else {
            log::warn!("Denied {:?} to {}", permission, principal.email);
            Err(AccessError::Forbidden {
                email: principal.email.clone(),
                permission,
            })
        }
    }
}

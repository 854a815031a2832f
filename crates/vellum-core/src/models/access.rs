use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Access level granted on a resource. Levels are ordered: a higher level implies the lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "access_level", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    NoPermissions,
    Read,
    ReadWrite,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::NoPermissions => "no_permissions",
            AccessLevel::Read => "read",
            AccessLevel::ReadWrite => "read_write",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "nopermissions" | "none" | "deny" => Ok(AccessLevel::NoPermissions),
            "read" => Ok(AccessLevel::Read),
            "readwrite" => Ok(AccessLevel::ReadWrite),
            other => Err(format!("Unknown access level: {}", other)),
        }
    }
}

/// Explicit access rule attached to a media item, either for a user or for a role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct AccessRule {
    pub id: Uuid,
    pub media_id: Uuid,
    /// User name or role name, depending on `is_for_role`
    pub identity: String,
    pub is_for_role: bool,
    pub access_level: AccessLevel,
}

impl AccessRule {
    /// Whether this rule applies to `principal`
    pub fn matches(&self, principal: &Principal) -> bool {
        if self.is_for_role {
            principal.is_in_role(&self.identity)
        } else {
            principal.name.eq_ignore_ascii_case(&self.identity)
        }
    }
}

/// The acting identity of a request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Principal {
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Principal {
    pub fn new(name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            name: name.into(),
            roles,
        }
    }

    pub fn is_in_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

//! Authorization decisions for media items

use async_trait::async_trait;
use vellum_core::models::{AccessLevel, Media, Principal};
use vellum_core::{AppError, Config};

/// Decides what a principal may do with a media item
#[async_trait]
pub trait AccessControlService: Send + Sync {
    /// Effective access level of `principal` on `media`
    async fn get_access_level(
        &self,
        media: &Media,
        principal: &Principal,
    ) -> Result<AccessLevel, AppError>;

    /// Fail with `AppError::AccessDenied` unless `principal` has at least `required` on `media`
    async fn demand_access(
        &self,
        media: &Media,
        principal: &Principal,
        required: AccessLevel,
    ) -> Result<(), AppError> {
        let granted = self.get_access_level(media, principal).await?;
        if granted < required {
            return Err(AppError::AccessDenied(format!(
                "{} has {} access to media {}, {} required",
                principal.name, granted, media.id, required
            )));
        }
        Ok(())
    }
}

/// Evaluates the explicit access rules loaded with a media item.
///
/// Administrators always get read-write. Items without rules get the default level;
/// otherwise the highest level among the rules matching the principal wins, and a
/// principal matching no rule gets no permissions.
#[derive(Debug, Clone)]
pub struct RuleAccessControl {
    default_level: AccessLevel,
    administrator_roles: Vec<String>,
}

impl RuleAccessControl {
    pub fn new(default_level: AccessLevel, administrator_roles: Vec<String>) -> Self {
        Self {
            default_level,
            administrator_roles,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.default_access_level,
            config.administrator_roles.clone(),
        )
    }

    fn evaluate(&self, media: &Media, principal: &Principal) -> AccessLevel {
        if self
            .administrator_roles
            .iter()
            .any(|role| principal.is_in_role(role))
        {
            return AccessLevel::ReadWrite;
        }

        if media.access_rules.is_empty() {
            return self.default_level;
        }

        media
            .access_rules
            .iter()
            .filter(|rule| rule.matches(principal))
            .map(|rule| rule.access_level)
            .max()
            .unwrap_or(AccessLevel::NoPermissions)
    }
}

#[async_trait]
impl AccessControlService for RuleAccessControl {
    async fn get_access_level(
        &self,
        media: &Media,
        principal: &Principal,
    ) -> Result<AccessLevel, AppError> {
        Ok(self.evaluate(media, principal))
    }
}

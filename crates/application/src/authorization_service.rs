use std::sync::Arc;

use async_trait::async_trait;
use sanctum_core::{AppError, AppResult, UserIdentity};
use sanctum_domain::{PermissionMatrix, RoleAssignment};
use tracing::warn;

use crate::permission_resolver::{
    AccessContext, PermissionResolver, has_all_permissions, has_permission, primary_role,
};

/// Repository port for role assignment lookups.
#[async_trait]
pub trait RoleAssignmentRepository: Send + Sync {
    /// Lists every assignment of a user, active or not, with embedded roles.
    async fn list_assignments_for_user(&self, user_id: &str) -> AppResult<Vec<RoleAssignment>>;
}

/// Permission projection used for UI gating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionSummary {
    /// Whether the caller is the reserved owner.
    pub is_owner: bool,
    /// Effective matrix; the full vocabulary for owners.
    pub permissions: PermissionMatrix,
    /// Machine name of the highest-priority active role.
    pub primary_role: Option<String>,
}

/// Application service enforcing permissions server-side.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn RoleAssignmentRepository>,
    resolver: PermissionResolver,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn RoleAssignmentRepository>, resolver: PermissionResolver) -> Self {
        Self {
            repository,
            resolver,
        }
    }

    /// Resolves the caller's access context from stored assignments.
    pub async fn access_for(&self, identity: &UserIdentity) -> AppResult<AccessContext> {
        let assignments = self
            .repository
            .list_assignments_for_user(identity.subject())
            .await?;

        Ok(self.resolver.resolve(identity, &assignments))
    }

    /// Returns whether the caller currently has the permission.
    pub async fn has_permission(
        &self,
        identity: &UserIdentity,
        resource: &str,
        action: &str,
    ) -> AppResult<bool> {
        let access = self.access_for(identity).await?;
        Ok(has_permission(&access, resource, action))
    }

    /// Ensures the caller holds the permission.
    pub async fn require_permission(
        &self,
        identity: &UserIdentity,
        resource: &str,
        action: &str,
    ) -> AppResult<()> {
        self.require_all_permissions(identity, &[(resource, action)])
            .await
    }

    /// Ensures the caller holds every listed permission.
    pub async fn require_all_permissions(
        &self,
        identity: &UserIdentity,
        checks: &[(&str, &str)],
    ) -> AppResult<()> {
        let access = self.access_for(identity).await?;
        if has_all_permissions(&access, checks) {
            return Ok(());
        }

        let required = checks
            .iter()
            .map(|(resource, action)| format!("{resource}.{action}"))
            .collect::<Vec<_>>()
            .join(", ");
        warn!(
            subject = %identity.subject(),
            required = %required,
            "permission check denied"
        );

        Err(AppError::Forbidden(format!(
            "subject '{}' is missing permission '{required}'",
            identity.subject()
        )))
    }

    /// Returns the caller's permission summary.
    pub async fn permission_summary(&self, identity: &UserIdentity) -> AppResult<PermissionSummary> {
        let assignments = self
            .repository
            .list_assignments_for_user(identity.subject())
            .await?;
        let primary_role =
            primary_role(&assignments).map(|assignment| assignment.role().name().to_owned());

        Ok(match self.resolver.resolve(identity, &assignments) {
            AccessContext::Owner => PermissionSummary {
                is_owner: true,
                permissions: PermissionMatrix::full_access(),
                primary_role,
            },
            AccessContext::Scoped(effective) => PermissionSummary {
                is_owner: false,
                permissions: effective.matrix().clone(),
                primary_role,
            },
        })
    }
}

#[cfg(test)]
mod tests;

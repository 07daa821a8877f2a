use std::sync::Arc;

use async_trait::async_trait;
use sanctum_core::{AppError, AppResult, UserIdentity};
use sanctum_domain::{
    OWNER_ROLE_NAME, OWNER_ROLE_PRIORITY, PermissionMatrix, Resource, Role, RoleAssignment, RoleId,
};
use tracing::{info, warn};

use crate::{AuthorizationService, RoleAssignmentRepository, has_permission};

/// Input payload for creating custom roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Unique machine name.
    pub name: String,
    /// Human label.
    pub display_name: String,
    /// Grants attached to the role.
    pub permissions: PermissionMatrix,
    /// Conflict priority; higher wins.
    pub priority: i32,
}

/// Repository port for role administration.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Lists all roles ordered by descending priority.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Finds a role by id.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Persists a new role and returns it with its assigned id.
    async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role>;

    /// Assigns a role to a user, reactivating an inactive assignment.
    async fn assign_role(&self, user_id: &str, role_id: RoleId) -> AppResult<RoleAssignment>;

    /// Marks an assignment inactive.
    async fn deactivate_assignment(&self, user_id: &str, role_id: RoleId) -> AppResult<()>;
}

/// Application service for role administration.
#[derive(Clone)]
pub struct RoleAdminService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn RoleRepository>,
    assignments: Arc<dyn RoleAssignmentRepository>,
}

impl RoleAdminService {
    /// Creates a new role admin service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn RoleRepository>,
        assignments: Arc<dyn RoleAssignmentRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            assignments,
        }
    }

    /// Returns all roles.
    pub async fn list_roles(&self, actor: &UserIdentity) -> AppResult<Vec<Role>> {
        self.authorization_service
            .require_permission(actor, Resource::Roles.as_str(), "view")
            .await?;

        self.repository.list_roles().await
    }

    /// Creates a custom role.
    pub async fn create_role(&self, actor: &UserIdentity, input: CreateRoleInput) -> AppResult<Role> {
        self.authorization_service
            .require_permission(actor, Resource::Roles.as_str(), "create")
            .await?;

        if input.name.trim() == OWNER_ROLE_NAME {
            return Err(AppError::Validation(format!(
                "role name '{OWNER_ROLE_NAME}' is reserved"
            )));
        }
        if input.priority >= OWNER_ROLE_PRIORITY {
            return Err(AppError::Validation(format!(
                "role priority must be below {OWNER_ROLE_PRIORITY}"
            )));
        }

        for (resource, action) in unrecognized_keys(&input.permissions) {
            warn!(
                role = %input.name,
                resource = %resource,
                action = %action,
                "role grants a permission outside the known vocabulary"
            );
        }

        let role = self.repository.create_role(input).await?;
        info!(
            actor = %actor.subject(),
            role_id = %role.id(),
            role = %role.name(),
            priority = role.priority(),
            "role created"
        );

        Ok(role)
    }

    /// Assigns a role to a user.
    ///
    /// Only an owner may hand out the owner role.
    pub async fn assign_role(
        &self,
        actor: &UserIdentity,
        user_id: &str,
        role_id: RoleId,
    ) -> AppResult<RoleAssignment> {
        let access = self.authorization_service.access_for(actor).await?;
        if !has_permission(&access, Resource::Roles.as_str(), "edit") {
            return Err(AppError::Forbidden(format!(
                "subject '{}' is missing permission 'roles.edit'",
                actor.subject()
            )));
        }

        let role = self
            .repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;

        if role.is_owner_role() && !access.is_owner() {
            return Err(AppError::Forbidden(
                "only an owner may assign the owner role".to_owned(),
            ));
        }

        let assignment = self.repository.assign_role(user_id, role_id).await?;
        info!(
            actor = %actor.subject(),
            user_id = %user_id,
            role = %role.name(),
            "role assigned"
        );

        Ok(assignment)
    }

    /// Deactivates a role assignment.
    pub async fn deactivate_assignment(
        &self,
        actor: &UserIdentity,
        user_id: &str,
        role_id: RoleId,
    ) -> AppResult<()> {
        self.authorization_service
            .require_permission(actor, Resource::Roles.as_str(), "edit")
            .await?;

        self.repository
            .deactivate_assignment(user_id, role_id)
            .await?;
        info!(
            actor = %actor.subject(),
            user_id = %user_id,
            role_id = %role_id,
            "role assignment deactivated"
        );

        Ok(())
    }

    /// Lists a user's assignments, active and inactive.
    pub async fn list_assignments(
        &self,
        actor: &UserIdentity,
        user_id: &str,
    ) -> AppResult<Vec<RoleAssignment>> {
        self.authorization_service
            .require_permission(actor, Resource::Users.as_str(), "view")
            .await?;

        self.assignments.list_assignments_for_user(user_id).await
    }
}

fn unrecognized_keys(permissions: &PermissionMatrix) -> Vec<(String, String)> {
    let mut unknown = Vec::new();
    for (resource, actions) in permissions.resources() {
        let known = resource.parse::<Resource>().ok();
        for action in actions.keys() {
            if !known.is_some_and(|value| value.recognizes_action(action)) {
                unknown.push((resource.to_owned(), action.clone()));
            }
        }
    }

    unknown
}

#[cfg(test)]
mod tests;

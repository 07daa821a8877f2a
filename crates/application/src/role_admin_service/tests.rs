use std::sync::Arc;

use async_trait::async_trait;
use sanctum_core::{AppError, AppResult, UserIdentity};
use sanctum_domain::{PermissionMatrix, Role, RoleAssignment, RoleId};
use tokio::sync::Mutex;

use crate::{AuthorizationService, PermissionResolver, RoleAssignmentRepository};

use super::{CreateRoleInput, RoleAdminService, RoleRepository};

#[derive(Default)]
struct FakeRoleStore {
    roles: Mutex<Vec<Role>>,
    assignments: Mutex<Vec<RoleAssignment>>,
}

#[async_trait]
impl RoleRepository for FakeRoleStore {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.lock().await.clone())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .lock()
            .await
            .iter()
            .find(|role| role.id() == role_id)
            .cloned())
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let mut roles = self.roles.lock().await;
        if roles.iter().any(|role| role.name() == input.name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                input.name
            )));
        }

        let next_id = i64::try_from(roles.len()).unwrap_or(i64::MAX) + 1;
        let role = Role::new(
            RoleId::new(next_id),
            input.name,
            input.display_name,
            input.permissions,
            input.priority,
        )?;
        roles.push(role.clone());
        Ok(role)
    }

    async fn assign_role(&self, user_id: &str, role_id: RoleId) -> AppResult<RoleAssignment> {
        let role = self
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        let assignment = RoleAssignment::new(user_id, role, true);

        let mut assignments = self.assignments.lock().await;
        assignments.retain(|existing| {
            !(existing.user_id() == user_id && existing.role().id() == role_id)
        });
        assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn deactivate_assignment(&self, user_id: &str, role_id: RoleId) -> AppResult<()> {
        let mut assignments = self.assignments.lock().await;
        let Some(position) = assignments.iter().position(|existing| {
            existing.user_id() == user_id && existing.role().id() == role_id
        }) else {
            return Err(AppError::NotFound(format!(
                "user '{user_id}' has no assignment for role '{role_id}'"
            )));
        };

        let existing = assignments.remove(position);
        assignments.push(RoleAssignment::new(user_id, existing.role().clone(), false));
        Ok(())
    }
}

#[async_trait]
impl RoleAssignmentRepository for FakeRoleStore {
    async fn list_assignments_for_user(&self, user_id: &str) -> AppResult<Vec<RoleAssignment>> {
        Ok(self
            .assignments
            .lock()
            .await
            .iter()
            .filter(|assignment| assignment.user_id() == user_id)
            .cloned()
            .collect())
    }
}

async fn seeded_service() -> (RoleAdminService, Arc<FakeRoleStore>) {
    let store = Arc::new(FakeRoleStore::default());
    let admin = store
        .create_role(CreateRoleInput {
            name: "admin".to_owned(),
            display_name: "Admin".to_owned(),
            permissions: PermissionMatrix::new()
                .with("roles", "view", true)
                .with("roles", "create", true)
                .with("roles", "edit", true)
                .with("users", "view", true),
            priority: 50,
        })
        .await;
    let Ok(admin) = admin else {
        panic!("admin role must be created");
    };
    let assigned = store.assign_role("ada", admin.id()).await;
    assert!(assigned.is_ok());

    let authorization_service =
        AuthorizationService::new(store.clone(), PermissionResolver::new(["keeper@sanctum.example"]));
    let service = RoleAdminService::new(authorization_service, store.clone(), store.clone());

    (service, store)
}

fn ada() -> UserIdentity {
    UserIdentity::new("ada", "Ada", None)
}

fn member_input(name: &str) -> CreateRoleInput {
    CreateRoleInput {
        name: name.to_owned(),
        display_name: "Member".to_owned(),
        permissions: PermissionMatrix::new().with("agents", "view", true),
        priority: 1,
    }
}

#[tokio::test]
async fn admin_creates_and_assigns_roles() {
    let (service, _store) = seeded_service().await;

    let created = service.create_role(&ada(), member_input("member")).await;
    let Ok(member) = created else {
        panic!("member role must be created");
    };

    let assignment = service.assign_role(&ada(), "bea", member.id()).await;
    assert!(matches!(assignment, Ok(ref value) if value.is_active()));

    let assignments = service.list_assignments(&ada(), "bea").await;
    assert_eq!(assignments.map(|values| values.len()).unwrap_or_default(), 1);
}

#[tokio::test]
async fn members_cannot_manage_roles() {
    let (service, _store) = seeded_service().await;
    let visitor = UserIdentity::new("bea", "Bea", None);

    let listed = service.list_roles(&visitor).await;
    assert!(matches!(listed, Err(AppError::Forbidden(_))));

    let created = service.create_role(&visitor, member_input("member")).await;
    assert!(matches!(created, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn reserved_owner_name_and_priority_are_rejected() {
    let (service, _store) = seeded_service().await;

    let named_owner = service.create_role(&ada(), member_input("owner")).await;
    assert!(matches!(named_owner, Err(AppError::Validation(_))));

    let mut input = member_input("overlord");
    input.priority = i32::MAX;
    let too_high = service.create_role(&ada(), input).await;
    assert!(matches!(too_high, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn only_owners_assign_the_owner_role() {
    let (service, store) = seeded_service().await;
    let Ok(owner_role) = Role::owner(RoleId::new(99)) else {
        panic!("owner role must be valid");
    };
    store.roles.lock().await.push(owner_role);

    let by_admin = service.assign_role(&ada(), "bea", RoleId::new(99)).await;
    assert!(matches!(by_admin, Err(AppError::Forbidden(_))));

    let keeper = UserIdentity::new(
        "keeper",
        "Keeper",
        Some("keeper@sanctum.example".to_owned()),
    );
    let by_owner = service.assign_role(&keeper, "bea", RoleId::new(99)).await;
    assert!(by_owner.is_ok());
}

#[tokio::test]
async fn deactivated_assignment_stops_granting() {
    let (service, _store) = seeded_service().await;
    let Ok(member) = service.create_role(&ada(), member_input("member")).await else {
        panic!("member role must be created");
    };
    let assigned = service.assign_role(&ada(), "bea", member.id()).await;
    assert!(assigned.is_ok());

    let deactivated = service.deactivate_assignment(&ada(), "bea", member.id()).await;
    assert!(deactivated.is_ok());

    let assignments = service.list_assignments(&ada(), "bea").await.unwrap_or_default();
    assert_eq!(assignments.len(), 1);
    assert!(!assignments[0].is_active());

    let missing = service
        .deactivate_assignment(&ada(), "nobody", member.id())
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn assigning_unknown_role_is_not_found() {
    let (service, _store) = seeded_service().await;

    let result = service.assign_role(&ada(), "bea", RoleId::new(404)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

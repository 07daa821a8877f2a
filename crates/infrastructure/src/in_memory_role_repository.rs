//! In-memory role store used when no database is configured.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sanctum_application::{CreateRoleInput, RoleAssignmentRepository, RoleRepository};
use sanctum_core::{AppError, AppResult};
use sanctum_domain::{OWNER_ROLE_NAME, Role, RoleAssignment, RoleId};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

/// Seed document for the in-memory store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSeed {
    /// Roles with their stored ids.
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Assignments referencing seeded role ids.
    #[serde(default)]
    pub assignments: Vec<AssignmentSeed>,
}

impl RoleSeed {
    /// Parses a JSON seed document.
    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw)
            .map_err(|error| AppError::Validation(format!("invalid role seed document: {error}")))
    }
}

/// One seeded user-role link.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSeed {
    /// Subject the role belongs to.
    pub user_id: String,
    /// Seeded role id.
    pub role_id: RoleId,
    /// Whether the assignment counts.
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Clone)]
struct StoredAssignment {
    user_id: String,
    role_id: RoleId,
    is_active: bool,
}

#[derive(Debug, Default)]
struct RoleState {
    roles: BTreeMap<RoleId, Role>,
    assignments: Vec<StoredAssignment>,
}

impl RoleState {
    fn next_role_id(&self) -> RoleId {
        let highest = self
            .roles
            .keys()
            .map(RoleId::as_i64)
            .max()
            .unwrap_or_default();
        RoleId::new(highest + 1)
    }

    fn join(&self, stored: &StoredAssignment) -> Option<RoleAssignment> {
        self.roles
            .get(&stored.role_id)
            .map(|role| RoleAssignment::new(stored.user_id.clone(), role.clone(), stored.is_active))
    }
}

/// In-memory implementation of the role ports.
///
/// Assignments reference roles by id, so role changes are visible through
/// every assignment on the next lookup.
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    state: RwLock<RoleState>,
}

impl InMemoryRoleRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository from a seed document.
    pub fn from_seed(seed: RoleSeed) -> AppResult<Self> {
        let mut state = RoleState::default();
        for role in seed.roles {
            if state.roles.values().any(|existing| existing.name() == role.name()) {
                return Err(AppError::Conflict(format!(
                    "role '{}' is seeded more than once",
                    role.name()
                )));
            }
            if state.roles.insert(role.id(), role).is_some() {
                return Err(AppError::Conflict(
                    "role ids in seed document must be unique".to_owned(),
                ));
            }
        }

        for assignment in seed.assignments {
            if !state.roles.contains_key(&assignment.role_id) {
                return Err(AppError::NotFound(format!(
                    "seeded assignment for '{}' references unknown role {}",
                    assignment.user_id, assignment.role_id
                )));
            }
            state.assignments.push(StoredAssignment {
                user_id: assignment.user_id,
                role_id: assignment.role_id,
                is_active: assignment.is_active,
            });
        }

        info!(
            roles = state.roles.len(),
            assignments = state.assignments.len(),
            "seeded in-memory role store"
        );

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Makes sure the reserved owner role exists and returns it.
    pub async fn ensure_owner_role(&self) -> AppResult<Role> {
        let mut state = self.state.write().await;
        if let Some(role) = state.roles.values().find(|role| role.is_owner_role()) {
            return Ok(role.clone());
        }

        let role = Role::owner(state.next_role_id())?;
        state.roles.insert(role.id(), role.clone());

        Ok(role)
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state.roles.values().cloned().collect();
        roles.sort_by(|left, right| {
            right
                .priority()
                .cmp(&left.priority())
                .then_with(|| left.id().cmp(&right.id()))
        });

        Ok(roles)
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(&role_id).cloned())
    }

    async fn create_role(&self, input: CreateRoleInput) -> AppResult<Role> {
        let mut state = self.state.write().await;
        let role = Role::new(
            state.next_role_id(),
            input.name,
            input.display_name,
            input.permissions,
            input.priority,
        )?;

        if role.name() == OWNER_ROLE_NAME
            || state.roles.values().any(|existing| existing.name() == role.name())
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name()
            )));
        }

        state.roles.insert(role.id(), role.clone());
        Ok(role)
    }

    async fn assign_role(&self, user_id: &str, role_id: RoleId) -> AppResult<RoleAssignment> {
        let mut state = self.state.write().await;
        let Some(role) = state.roles.get(&role_id).cloned() else {
            return Err(AppError::NotFound(format!("role {role_id} does not exist")));
        };

        match state
            .assignments
            .iter_mut()
            .find(|stored| stored.user_id == user_id && stored.role_id == role_id)
        {
            Some(stored) => stored.is_active = true,
            None => state.assignments.push(StoredAssignment {
                user_id: user_id.to_owned(),
                role_id,
                is_active: true,
            }),
        }

        Ok(RoleAssignment::new(user_id, role, true))
    }

    async fn deactivate_assignment(&self, user_id: &str, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;
        let stored = state
            .assignments
            .iter_mut()
            .find(|stored| stored.user_id == user_id && stored.role_id == role_id)
            .ok_or_else(|| {
                AppError::NotFound(format!("user '{user_id}' has no assignment of role {role_id}"))
            })?;
        stored.is_active = false;

        Ok(())
    }
}

#[async_trait]
impl RoleAssignmentRepository for InMemoryRoleRepository {
    async fn list_assignments_for_user(&self, user_id: &str) -> AppResult<Vec<RoleAssignment>> {
        let state = self.state.read().await;

        Ok(state
            .assignments
            .iter()
            .filter(|stored| stored.user_id == user_id)
            .filter_map(|stored| state.join(stored))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use sanctum_application::{CreateRoleInput, RoleAssignmentRepository, RoleRepository};
    use sanctum_core::AppError;
    use sanctum_domain::{PermissionMatrix, RoleId};

    use super::{InMemoryRoleRepository, RoleSeed};

    const SEED: &str = r#"{
        "roles": [
            {
                "id": 1,
                "name": "curator",
                "displayName": "Curator",
                "permissions": { "agents": { "view": true, "curate": true } },
                "priority": 10
            },
            {
                "id": 2,
                "name": "visitor",
                "displayName": "Visitor",
                "permissions": { "agents": { "view": true, "curate": "yes" } }
            }
        ],
        "assignments": [
            { "userId": "ada", "roleId": 1 },
            { "userId": "ada", "roleId": 2, "isActive": false }
        ]
    }"#;

    fn seeded() -> InMemoryRoleRepository {
        let seed = match RoleSeed::from_json(SEED) {
            Ok(seed) => seed,
            Err(error) => panic!("seed must parse: {error}"),
        };
        match InMemoryRoleRepository::from_seed(seed) {
            Ok(repository) => repository,
            Err(error) => panic!("seed must load: {error}"),
        }
    }

    #[tokio::test]
    async fn seed_loads_roles_and_assignments() {
        let repository = seeded();

        let assignments = repository.list_assignments_for_user("ada").await;
        let Ok(assignments) = assignments else {
            panic!("lookup must succeed");
        };
        assert_eq!(assignments.len(), 2);
        assert!(assignments[0].is_active());
        assert!(!assignments[1].is_active());
        assert_eq!(assignments[1].role().priority(), i32::MIN);
        assert_eq!(
            assignments[1].role().permissions().get("agents", "curate"),
            Some(false)
        );
    }

    #[tokio::test]
    async fn roles_are_listed_by_descending_priority() {
        let repository = seeded();
        let _ = repository.ensure_owner_role().await;

        let names: Vec<String> = repository
            .list_roles()
            .await
            .unwrap_or_default()
            .iter()
            .map(|role| role.name().to_owned())
            .collect();

        assert_eq!(names, vec!["owner", "curator", "visitor"]);
    }

    #[tokio::test]
    async fn ensure_owner_role_is_idempotent() {
        let repository = InMemoryRoleRepository::new();

        let first = repository.ensure_owner_role().await;
        let second = repository.ensure_owner_role().await;

        assert!(matches!((first, second), (Ok(a), Ok(b)) if a == b && a.is_owner_role()));
    }

    #[tokio::test]
    async fn duplicate_role_names_conflict() {
        let repository = seeded();

        let result = repository
            .create_role(CreateRoleInput {
                name: "curator".to_owned(),
                display_name: "Another Curator".to_owned(),
                permissions: PermissionMatrix::new(),
                priority: 1,
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn created_roles_get_fresh_ids() {
        let repository = seeded();

        let created = repository
            .create_role(CreateRoleInput {
                name: "moderator".to_owned(),
                display_name: "Moderator".to_owned(),
                permissions: PermissionMatrix::new().with("chat", "moderate", true),
                priority: 4,
            })
            .await;

        assert!(matches!(created, Ok(ref role) if role.id() == RoleId::new(3)));
    }

    #[tokio::test]
    async fn assign_reactivates_inactive_assignment() {
        let repository = seeded();

        let assigned = repository.assign_role("ada", RoleId::new(2)).await;
        assert!(matches!(assigned, Ok(ref assignment) if assignment.is_active()));

        let assignments = repository
            .list_assignments_for_user("ada")
            .await
            .unwrap_or_default();
        assert_eq!(assignments.len(), 2);
        assert!(assignments.iter().all(|assignment| assignment.is_active()));
    }

    #[tokio::test]
    async fn deactivating_missing_assignment_is_not_found() {
        let repository = seeded();

        let result = repository.deactivate_assignment("grace", RoleId::new(1)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let unknown_role = repository.assign_role("grace", RoleId::new(99)).await;
        assert!(matches!(unknown_role, Err(AppError::NotFound(_))));
    }

    #[test]
    fn seed_with_dangling_assignment_is_rejected() {
        let seed = RoleSeed::from_json(r#"{ "assignments": [{ "userId": "ada", "roleId": 7 }] }"#);
        let Ok(seed) = seed else {
            panic!("seed must parse");
        };

        assert!(matches!(
            InMemoryRoleRepository::from_seed(seed),
            Err(AppError::NotFound(_))
        ));
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sanctum_core::{AppError, AppResult, UserIdentity};
use sanctum_domain::{PermissionMatrix, Role, RoleAssignment, RoleId};

use crate::PermissionResolver;

use super::{AuthorizationService, RoleAssignmentRepository};

struct FakeRoleAssignmentRepository {
    assignments: HashMap<String, Vec<RoleAssignment>>,
}

#[async_trait]
impl RoleAssignmentRepository for FakeRoleAssignmentRepository {
    async fn list_assignments_for_user(&self, user_id: &str) -> AppResult<Vec<RoleAssignment>> {
        Ok(self.assignments.get(user_id).cloned().unwrap_or_default())
    }
}

fn role(id: i64, name: &str, priority: i32, permissions: PermissionMatrix) -> Role {
    match Role::new(RoleId::new(id), name, name, permissions, priority) {
        Ok(role) => role,
        Err(error) => panic!("test role must be valid: {error}"),
    }
}

fn service_with(
    owner_emails: &[&str],
    assignments: Vec<(&str, Vec<RoleAssignment>)>,
) -> AuthorizationService {
    let repository = FakeRoleAssignmentRepository {
        assignments: assignments
            .into_iter()
            .map(|(user_id, values)| (user_id.to_owned(), values))
            .collect(),
    };

    AuthorizationService::new(
        Arc::new(repository),
        PermissionResolver::new(owner_emails.iter().copied()),
    )
}

fn moderator_assignment() -> RoleAssignment {
    RoleAssignment::new(
        "alice",
        role(
            1,
            "moderator",
            20,
            PermissionMatrix::new()
                .with("chat", "moderate", true)
                .with("roles", "view", true),
        ),
        true,
    )
}

#[tokio::test]
async fn require_permission_allows_granted_subject() {
    let service = service_with(&[], vec![("alice", vec![moderator_assignment()])]);
    let alice = UserIdentity::new("alice", "Alice", None);

    let result = service.require_permission(&alice, "chat", "moderate").await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn require_permission_denies_missing_grant() {
    let service = service_with(&[], vec![("alice", vec![moderator_assignment()])]);
    let alice = UserIdentity::new("alice", "Alice", None);

    let result = service.require_permission(&alice, "roles", "create").await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn require_all_permissions_needs_every_check() {
    let service = service_with(&[], vec![("alice", vec![moderator_assignment()])]);
    let alice = UserIdentity::new("alice", "Alice", None);

    let partial = service
        .require_all_permissions(&alice, &[("chat", "moderate"), ("roles", "edit")])
        .await;
    assert!(partial.is_err());

    let complete = service
        .require_all_permissions(&alice, &[("chat", "moderate"), ("roles", "view")])
        .await;
    assert!(complete.is_ok());
}

#[tokio::test]
async fn owner_email_passes_without_assignments() {
    let service = service_with(&["keeper@sanctum.example"], Vec::new());
    let keeper = UserIdentity::new(
        "keeper",
        "Keeper",
        Some("keeper@sanctum.example".to_owned()),
    );

    let allowed = service.has_permission(&keeper, "settings", "edit").await;
    assert!(matches!(allowed, Ok(true)));
}

#[tokio::test]
async fn permission_summary_reports_primary_role() {
    let member = RoleAssignment::new(
        "alice",
        role(2, "member", 1, PermissionMatrix::new().with("agents", "view", true)),
        true,
    );
    let service = service_with(&[], vec![("alice", vec![member, moderator_assignment()])]);
    let alice = UserIdentity::new("alice", "Alice", None);

    let summary = service.permission_summary(&alice).await;
    let Ok(summary) = summary else {
        panic!("summary must resolve");
    };

    assert!(!summary.is_owner);
    assert_eq!(summary.primary_role.as_deref(), Some("moderator"));
    assert!(summary.permissions.allows("agents", "view"));
    assert!(summary.permissions.allows("chat", "moderate"));
}

#[tokio::test]
async fn permission_summary_grants_owner_full_vocabulary() {
    let service = service_with(&[], Vec::new());
    let owner = UserIdentity::new("root", "Root", None).with_role_marker("owner");

    let summary = service.permission_summary(&owner).await;
    let Ok(summary) = summary else {
        panic!("summary must resolve");
    };

    assert!(summary.is_owner);
    assert_eq!(summary.permissions, PermissionMatrix::full_access());
    assert_eq!(summary.primary_role, None);
}

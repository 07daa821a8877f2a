use std::collections::BTreeMap;

use sanctum_application::{AssistReply, PermissionSummary};
use sanctum_domain::{PermissionMatrix, Role, RoleAssignment};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Health response payload.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/health-response.ts"
)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Resource to action to grant flag, as sent over the wire.
pub type PermissionMatrixDto = BTreeMap<String, BTreeMap<String, bool>>;

fn matrix_to_dto(matrix: &PermissionMatrix) -> PermissionMatrixDto {
    matrix
        .resources()
        .map(|(resource, actions)| (resource.to_owned(), actions.clone()))
        .collect()
}

/// Caller permissions used for UI gating.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/permission-summary-response.ts"
)]
pub struct PermissionSummaryResponse {
    pub subject: String,
    pub is_owner: bool,
    pub primary_role: Option<String>,
    pub permissions: PermissionMatrixDto,
}

impl PermissionSummaryResponse {
    pub fn new(subject: impl Into<String>, summary: PermissionSummary) -> Self {
        Self {
            subject: subject.into(),
            is_owner: summary.is_owner,
            primary_role: summary.primary_role,
            permissions: matrix_to_dto(&summary.permissions),
        }
    }
}

/// Incoming payload for an assist request.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assist-request.ts"
)]
pub struct AssistRequestBody {
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub prompt: String,
}

/// Assistant completion returned to the client.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assist-response.ts"
)]
pub struct AssistResponse {
    pub content: String,
    pub model: String,
}

impl From<AssistReply> for AssistResponse {
    fn from(value: AssistReply) -> Self {
        Self {
            content: value.content,
            model: value.model,
        }
    }
}

/// Incoming payload for custom role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub name: String,
    pub display_name: String,
    /// Non-boolean leaves are stored as denials.
    #[serde(default)]
    #[ts(type = "Record<string, Record<string, boolean>>")]
    pub permissions: Value,
    #[serde(default)]
    pub priority: Option<i32>,
}

/// Incoming payload for role assignment.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/assign-role-request.ts"
)]
pub struct AssignRoleRequest {
    pub role_id: i64,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub priority: i32,
    pub permissions: PermissionMatrixDto,
}

impl From<&Role> for RoleResponse {
    fn from(value: &Role) -> Self {
        Self {
            id: value.id().as_i64(),
            name: value.name().to_owned(),
            display_name: value.display_name().to_owned(),
            priority: value.priority(),
            permissions: matrix_to_dto(value.permissions()),
        }
    }
}

/// API representation of a user-role link.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-assignment-response.ts"
)]
pub struct RoleAssignmentResponse {
    pub user_id: String,
    pub is_active: bool,
    pub role: RoleResponse,
}

impl From<RoleAssignment> for RoleAssignmentResponse {
    fn from(value: RoleAssignment) -> Self {
        Self {
            user_id: value.user_id().to_owned(),
            is_active: value.is_active(),
            role: RoleResponse::from(value.role()),
        }
    }
}

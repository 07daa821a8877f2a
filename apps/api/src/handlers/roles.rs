use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use sanctum_application::CreateRoleInput;
use sanctum_core::UserIdentity;
use sanctum_domain::{LOWEST_ROLE_PRIORITY, PermissionMatrix, RoleId};

use crate::dto::{AssignRoleRequest, CreateRoleRequest, RoleAssignmentResponse, RoleResponse};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<Vec<RoleResponse>>> {
    let roles = state
        .role_admin_service
        .list_roles(&user)
        .await?
        .iter()
        .map(RoleResponse::from)
        .collect();

    Ok(Json(roles))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_admin_service
        .create_role(
            &user,
            CreateRoleInput {
                name: payload.name,
                display_name: payload.display_name,
                permissions: PermissionMatrix::from_json_value(&payload.permissions),
                priority: payload.priority.unwrap_or(LOWEST_ROLE_PRIORITY),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(&role))))
}

pub async fn list_user_roles_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<RoleAssignmentResponse>>> {
    let assignments = state
        .role_admin_service
        .list_assignments(&user, user_id.as_str())
        .await?
        .into_iter()
        .map(RoleAssignmentResponse::from)
        .collect();

    Ok(Json(assignments))
}

pub async fn assign_user_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(user_id): Path<String>,
    Json(payload): Json<AssignRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleAssignmentResponse>)> {
    let assignment = state
        .role_admin_service
        .assign_role(&user, user_id.as_str(), RoleId::new(payload.role_id))
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RoleAssignmentResponse::from(assignment)),
    ))
}

pub async fn deactivate_user_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path((user_id, role_id)): Path<(String, i64)>,
) -> ApiResult<StatusCode> {
    state
        .role_admin_service
        .deactivate_assignment(&user, user_id.as_str(), RoleId::new(role_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

use axum::Json;
use axum::extract::{Extension, State};
use sanctum_core::UserIdentity;

use crate::dto::PermissionSummaryResponse;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn my_permissions_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<PermissionSummaryResponse>> {
    let summary = state.authorization_service.permission_summary(&user).await?;

    Ok(Json(PermissionSummaryResponse::new(user.subject(), summary)))
}

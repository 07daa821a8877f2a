use axum::Json;
use axum::extract::{Extension, State};

use crate::dto::{AssistRequestBody, AssistResponse};
use crate::error::ApiResult;
use crate::middleware::RequestContext;
use crate::state::AppState;

pub async fn assist_handler(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(payload): Json<AssistRequestBody>,
) -> ApiResult<Json<AssistResponse>> {
    let reply = state
        .assist_service
        .assist(
            context.identity.as_ref(),
            context.client_ip,
            payload.system_prompt,
            payload.prompt,
        )
        .await?;

    Ok(Json(AssistResponse::from(reply)))
}

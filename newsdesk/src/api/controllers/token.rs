use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;

use crate::api::error::ApiError;
use crate::api::models::auth::{RefreshRequest, RefreshResponse};
use crate::api::state::ApiState;
use crate::tokens::TokenError;

pub async fn refresh(
    State(state): State<ApiState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Json(req) = payload?;
    let refresh = req.refresh.ok_or(ApiError::FieldRequired("refresh"))?;

    let access = state
        .tokens()
        .refresh_access(&refresh)
        .map_err(|e| match e {
            TokenError::Sign(_) => ApiError::from(anyhow::Error::from(e)),
            e => {
                tracing::debug!("rejected refresh token: {e}");
                ApiError::InvalidRefreshToken
            }
        })?;

    Ok(Json(RefreshResponse { access }))
}

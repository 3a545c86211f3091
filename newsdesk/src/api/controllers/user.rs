use axum::Json;
use axum::extract::State;

use crate::api::controllers::auth::AuthUser;
use crate::api::error::ApiError;
use crate::api::models::user::UserInfo;
use crate::api::state::ApiState;

pub async fn me(
    State(state): State<ApiState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserInfo>, ApiError> {
    let user_id = claims.user_id().ok_or(ApiError::InvalidAccessToken)?;

    let user = state
        .sqlx_client()
        .find_user_by_id(user_id)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    Ok(Json(UserInfo::from(&user)))
}

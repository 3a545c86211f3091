use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};

use crate::api::controllers::auth::AuthUser;
use crate::api::error::{ApiError, NEWS_API_KEY_MISSING};
use crate::api::state::ApiState;
use crate::news::{NewsPage, NewsQuery};

pub async fn search(
    State(state): State<ApiState>,
    AuthUser(claims): AuthUser,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<NewsPage>, ApiError> {
    let Query(params) = params?;
    let query = NewsQuery::from_pairs(params);

    let api_key = state
        .secrets()
        .news_api_key
        .as_deref()
        .ok_or(ApiError::Misconfigured(NEWS_API_KEY_MISSING))?;

    tracing::debug!(sub = %claims.sub, "news search");

    let page = state.news_client().search(api_key, &query).await?;
    Ok(Json(page))
}

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::api::error::ApiError;
use crate::api::models::auth::{GoogleLoginRequest, LoginResponse};
use crate::api::models::user::{UserInfo, split_full_name};
use crate::api::state::ApiState;
use crate::google::IdTokenError;
use crate::sqlx::GoogleSignIn;
use crate::tokens::{Claims, TokenSubject, TokenType};

// ── Auth extractor ─────────────────────────────────────────────────────────────

/// Authenticated user extracted from a Bearer access token.
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    ApiState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|v| !v.is_empty())
            .ok_or(ApiError::MissingCredentials)?;

        let api_state = ApiState::from_ref(state);

        let claims = api_state
            .tokens()
            .decode(token, TokenType::Access)
            .map_err(|e| {
                tracing::debug!("rejected access token: {e}");
                ApiError::InvalidAccessToken
            })?;

        Ok(AuthUser(claims))
    }
}

// ── Google ────────────────────────────────────────────────────────────────────

pub async fn google_login(
    State(state): State<ApiState>,
    payload: Result<Json<GoogleLoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;

    let id_token = match req.id_token {
        None => None,
        Some(serde_json::Value::String(token)) => Some(token).filter(|token| !token.is_empty()),
        Some(_) => {
            return Err(IdTokenError::Invalid("id_token must be a string".to_owned()).into());
        }
    }
    .ok_or_else(|| ApiError::BadRequest("id_token missing".to_owned()))?;

    let identity = state.id_token_verifier().verify(&id_token).await?;
    let (first_name, last_name) = split_full_name(&identity.name);

    let user = state
        .sqlx_client()
        .sign_in_google(&GoogleSignIn {
            email: &identity.email,
            subject: &identity.subject,
            first_name,
            last_name,
        })
        .await?;

    tracing::info!(user_id = user.id, email = %user.email, "user authenticated");

    let user = UserInfo::from(&user);
    let tokens = state
        .tokens()
        .issue_pair(&TokenSubject {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        })
        .map_err(anyhow::Error::from)?;

    Ok(Json(LoginResponse { user, tokens }))
}

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::google::IdTokenError;
use crate::news::NewsError;

pub const NEWS_API_KEY_MISSING: &str =
    "NEWS_API_KEY missing on server. Please set NEWS_API_KEY in your .env file.";

/// Request-level errors, rendered as `{"detail": ...}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("This field is required.")]
    FieldRequired(&'static str),
    #[error("Authentication credentials were not provided.")]
    MissingCredentials,
    #[error("Given token not valid for any token type")]
    InvalidAccessToken,
    #[error("Token is invalid or expired")]
    InvalidRefreshToken,
    #[error("User not found")]
    UserNotFound,
    #[error("{0}")]
    Misconfigured(&'static str),
    #[error("{0}")]
    Upstream(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::FieldRequired(_) => StatusCode::BAD_REQUEST,
            Self::MissingCredentials
            | Self::InvalidAccessToken
            | Self::InvalidRefreshToken
            | Self::UserNotFound => StatusCode::UNAUTHORIZED,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Misconfigured(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            Self::InvalidAccessToken | Self::InvalidRefreshToken => Some("token_not_valid"),
            Self::UserNotFound => Some("user_not_found"),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        let body = match (&self, self.code()) {
            (Self::FieldRequired(field), _) => {
                let mut fields = serde_json::Map::new();
                fields.insert((*field).to_owned(), json!([detail]));
                serde_json::Value::Object(fields)
            }
            (_, Some(code)) => json!({ "detail": detail, "code": code }),
            (_, None) => json!({ "detail": detail }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        tracing::error!("request failed: {e:#}");
        Self::Internal("Internal server error".to_owned())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<IdTokenError> for ApiError {
    fn from(e: IdTokenError) -> Self {
        match e {
            IdTokenError::Invalid(reason) => Self::BadRequest(format!("Invalid token: {reason}")),
            IdTokenError::Audience => Self::BadRequest(e.to_string()),
            IdTokenError::Keys(_) => {
                tracing::error!("ID token verification unavailable: {e}");
                Self::Upstream(format!("Unable to verify token: {e}"))
            }
        }
    }
}

impl From<NewsError> for ApiError {
    fn from(e: NewsError) -> Self {
        if e.is_upstream() {
            tracing::warn!("News API failure: {e}");
            Self::Upstream(e.to_string())
        } else {
            tracing::error!("news request failed: {e}");
            Self::Internal(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn detail_body() {
        let (status, body) = body_json(ApiError::BadRequest("id_token missing".to_owned())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "detail": "id_token missing" }));
    }

    #[tokio::test]
    async fn auth_errors_carry_code() {
        let (status, body) = body_json(ApiError::InvalidRefreshToken).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "token_not_valid");
    }

    #[tokio::test]
    async fn missing_field_is_keyed_by_field() {
        let (status, body) = body_json(ApiError::FieldRequired("refresh")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "refresh": ["This field is required."] }));
    }

    #[test]
    fn id_token_errors_map_to_client_errors() {
        let err = ApiError::from(IdTokenError::Audience);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid audience");

        let err = ApiError::from(IdTokenError::Invalid("expired".to_owned()));
        assert_eq!(err.to_string(), "Invalid token: expired");

        let err = ApiError::from(IdTokenError::Keys("timeout".to_owned()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn news_errors_split_upstream_and_internal() {
        let err = ApiError::from(NewsError::Provider("apiKeyInvalid".to_owned()));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "News API error: apiKeyInvalid");

        let err = ApiError::from(NewsError::Unexpected("boom".to_owned()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Unexpected error: boom");
    }
}

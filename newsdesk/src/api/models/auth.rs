use serde::{Deserialize, Serialize};

use crate::api::models::user::UserInfo;
use crate::tokens::TokenPair;

/// Body of the Google sign-in request.
///
/// `id_token` is kept untyped so that a non-string value is reported as an
/// invalid token rather than a malformed body.
#[derive(Debug, Default, Deserialize)]
pub struct GoogleLoginRequest {
    #[serde(default)]
    pub id_token: Option<serde_json::Value>,
}

/// Response returned to the client after successful authentication.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: UserInfo,
    pub tokens: TokenPair,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

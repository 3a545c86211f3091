use std::fmt;
use std::time::Duration;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::config::JwtConfig;

use crate::utils::time::now_sec;

mod config;

/// JWT claims shared by access and refresh tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: internal user id.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub token_type: TokenType,
    /// Issued-at timestamp (Unix seconds).
    pub iat: u64,
    /// Expiration timestamp (Unix seconds).
    pub exp: u64,
    pub jti: String,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        })
    }
}

/// Identity a token pair is issued for.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: i64,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),
    #[error("token is invalid or expired: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("expected {expected} token, got {actual}")]
    WrongType {
        expected: TokenType,
        actual: TokenType,
    },
}

/// Mints and validates HS256 access/refresh tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn issue_pair(&self, subject: &TokenSubject) -> Result<TokenPair, TokenError> {
        let refresh = self.issue(
            subject.user_id.to_string(),
            &subject.email,
            &subject.name,
            TokenType::Refresh,
        )?;
        let access = self.issue(
            subject.user_id.to_string(),
            &subject.email,
            &subject.name,
            TokenType::Access,
        )?;

        Ok(TokenPair { access, refresh })
    }

    /// Mints a new access token from a valid refresh token.
    pub fn refresh_access(&self, refresh_token: &str) -> Result<String, TokenError> {
        let claims = self.decode(refresh_token, TokenType::Refresh)?;
        self.issue(claims.sub, &claims.email, &claims.name, TokenType::Access)
    }

    /// Decodes a token and checks signature, expiry and type.
    pub fn decode(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)?;

        if claims.token_type != expected {
            return Err(TokenError::WrongType {
                expected,
                actual: claims.token_type,
            });
        }

        Ok(claims)
    }

    fn issue(
        &self,
        sub: String,
        email: &str,
        name: &str,
        token_type: TokenType,
    ) -> Result<String, TokenError> {
        let ttl = match token_type {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let iat = now_sec();

        let claims = Claims {
            sub,
            email: email.to_owned(),
            name: name.to_owned(),
            token_type,
            iat,
            exp: iat + ttl.as_secs(),
            jti: Uuid::new_v4().simple().to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Sign)
    }
}

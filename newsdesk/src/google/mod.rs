//! Verification of Google-issued ID tokens presented by the frontend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use reqwest::header::{CACHE_CONTROL, HeaderMap};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

pub use self::config::GoogleConfig;

mod config;

const ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const CLOCK_SKEW_SECS: u64 = 60;

/// Identity extracted from a verified ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    pub email: String,
    pub name: String,
    pub subject: String,
}

#[derive(Debug, thiserror::Error)]
pub enum IdTokenError {
    #[error("{0}")]
    Invalid(String),
    #[error("Invalid audience")]
    Audience,
    #[error("failed to fetch Google signing keys: {0}")]
    Keys(String),
}

enum VerifierMode {
    Google,
    StaticKey {
        kid: String,
        algorithm: Algorithm,
        decoding_key: Arc<DecodingKey>,
    },
}

struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    fetched_at: Instant,
    expires_at: Instant,
}

pub struct GoogleIdTokenVerifier {
    http_client: reqwest::Client,
    client_id: String,
    config: GoogleConfig,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl GoogleIdTokenVerifier {
    /// Creates a verifier that fetches and caches Google's JWKS.
    pub fn new(client_id: &str, config: GoogleConfig) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .context("failed to build Google certs HTTP client")?;

        tracing::info!(certs_url = %config.certs_url, "initialized Google ID token verifier");

        Ok(Self::from_parts(http_client, client_id, config, VerifierMode::Google))
    }

    /// Creates a verifier that trusts a single fixed key.
    ///
    /// Intended for local setups and tests where tokens are signed locally.
    pub fn with_static_key(
        client_id: &str,
        kid: impl Into<String>,
        algorithm: Algorithm,
        decoding_key: DecodingKey,
    ) -> anyhow::Result<Self> {
        let kid = kid.into();
        if kid.trim().is_empty() {
            anyhow::bail!("static key id must not be empty");
        }

        let mode = VerifierMode::StaticKey {
            kid,
            algorithm,
            decoding_key: Arc::new(decoding_key),
        };

        Ok(Self::from_parts(
            reqwest::Client::new(),
            client_id,
            GoogleConfig::default(),
            mode,
        ))
    }

    fn from_parts(
        http_client: reqwest::Client,
        client_id: &str,
        config: GoogleConfig,
        mode: VerifierMode,
    ) -> Self {
        Self {
            http_client,
            client_id: client_id.to_owned(),
            config,
            mode,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Checks signature, issuer and expiry, then the audience.
    pub async fn verify(&self, token: &str) -> Result<VerifiedIdentity, IdTokenError> {
        let header = decode_header(token)
            .map_err(|e| IdTokenError::Invalid(format!("malformed token header: {e}")))?;

        let algorithm = match &self.mode {
            VerifierMode::Google => Algorithm::RS256,
            VerifierMode::StaticKey { algorithm, .. } => *algorithm,
        };
        if header.alg != algorithm {
            return Err(IdTokenError::Invalid(format!(
                "unexpected signing algorithm: {:?}",
                header.alg
            )));
        }

        let kid = header
            .kid
            .ok_or_else(|| IdTokenError::Invalid("missing key id".to_owned()))?;
        let decoding_key = self.decoding_key_for_kid(&kid).await?;

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "sub", "aud"]);
        validation.set_issuer(&ISSUERS);
        // Audience is compared separately to report it as its own error.
        validation.validate_aud = false;
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<GoogleIdTokenClaims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| IdTokenError::Invalid(e.to_string()))?;

        if !claims.aud.contains(&self.client_id) {
            tracing::warn!(subject = %claims.sub, "ID token issued for another audience");
            return Err(IdTokenError::Audience);
        }

        let email = claims
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| IdTokenError::Invalid("missing email claim".to_owned()))?;

        Ok(VerifiedIdentity {
            email,
            name: claims.name.unwrap_or_default(),
            subject: claims.sub,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdTokenError> {
        if let VerifierMode::StaticKey {
            kid: static_kid,
            decoding_key,
            ..
        } = &self.mode
        {
            return if kid == static_kid {
                Ok(decoding_key.clone())
            } else {
                Err(IdTokenError::Invalid(format!("unknown key id: {kid}")))
            };
        }

        if let Some(key) = self.cached_key(kid).await {
            return Ok(key);
        }

        // Keys rotate, so an unknown kid forces one refetch unless the keys
        // were fetched within `min_refetch_interval`.
        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.loaded_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdTokenError::Invalid(format!("unknown key id: {kid}")))
    }

    async fn cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > Instant::now())
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    // Ignores expiry: used right after a refresh attempt.
    async fn loaded_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        cache
            .as_ref()
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdTokenError> {
        let _guard = self.refresh_lock.lock().await;

        {
            let cache = self.jwks_cache.read().await;
            if let Some(entry) = cache.as_ref() {
                let fresh = if force_refresh {
                    entry.fetched_at.elapsed() < self.config.min_refetch_interval
                } else {
                    entry.expires_at > Instant::now()
                };
                if fresh {
                    return Ok(());
                }
            }
        }

        tracing::debug!(certs_url = %self.config.certs_url, "refreshing Google signing keys");

        let response = self
            .http_client
            .get(&self.config.certs_url)
            .send()
            .await
            .map_err(|e| IdTokenError::Keys(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IdTokenError::Keys(format!(
                "certs endpoint returned status {}",
                response.status()
            )));
        }

        let ttl = max_age(response.headers()).unwrap_or(self.config.default_cache_ttl);
        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdTokenError::Keys(format!("invalid JWKS body: {e}")))?;

        let keys_by_kid = jwks
            .keys
            .into_iter()
            .filter(Jwk::is_rsa_signing_key)
            .filter_map(|jwk| match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => Some((jwk.kid, Arc::new(key))),
                Err(e) => {
                    tracing::warn!(kid = %jwk.kid, "skipping invalid RSA key: {e}");
                    None
                }
            })
            .collect::<HashMap<_, _>>();

        if keys_by_kid.is_empty() {
            return Err(IdTokenError::Keys("no usable RSA keys".to_owned()));
        }

        tracing::debug!(keys = keys_by_kid.len(), ttl_secs = ttl.as_secs(), "Google signing keys cached");

        let fetched_at = Instant::now();
        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            fetched_at,
            expires_at: fetched_at + ttl,
        });

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    #[serde(rename = "use")]
    use_: Option<String>,
    #[serde(default)]
    n: String,
    #[serde(default)]
    e: String,
}

impl Jwk {
    fn is_rsa_signing_key(&self) -> bool {
        self.kty == "RSA"
            && !self.kid.trim().is_empty()
            && self.alg.as_deref().is_none_or(|alg| alg == "RS256")
            && self.use_.as_deref().is_none_or(|use_| use_ == "sig")
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GoogleIdTokenClaims {
    sub: String,
    aud: Audience,
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    fn contains(&self, client_id: &str) -> bool {
        match self {
            Self::One(aud) => aud == client_id,
            Self::Many(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

fn max_age(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(CACHE_CONTROL)?
        .to_str()
        .ok()?
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// JWKS endpoint with Google's ID token signing keys.
    ///
    /// Default: `https://www.googleapis.com/oauth2/v3/certs`
    pub certs_url: String,

    /// Timeout for fetching the signing keys.
    ///
    /// Default: `5s`
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,

    /// How long keys are cached when the response has no `max-age`.
    ///
    /// Default: `5m`
    #[serde(with = "humantime_serde")]
    pub default_cache_ttl: Duration,

    /// Minimum time between refetches caused by an unknown key id.
    ///
    /// Default: `30s`
    #[serde(with = "humantime_serde")]
    pub min_refetch_interval: Duration,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            certs_url: "https://www.googleapis.com/oauth2/v3/certs".to_owned(),
            http_timeout: Duration::from_secs(5),
            default_cache_ttl: Duration::from_secs(300),
            min_refetch_interval: Duration::from_secs(30),
        }
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtConfig {
    /// Lifetime of access tokens.
    ///
    /// Default: `5m`
    #[serde(with = "humantime_serde")]
    pub access_ttl: Duration,

    /// Lifetime of refresh tokens.
    ///
    /// Default: `1d`
    #[serde(with = "humantime_serde")]
    pub refresh_ttl: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_ttl: Duration::from_secs(5 * 60),
            refresh_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

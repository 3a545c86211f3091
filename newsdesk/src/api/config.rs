use std::net::{Ipv4Addr, SocketAddr};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::tokens::JwtConfig;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// TCP socket address to listen for incoming connections.
    ///
    /// Default: `0.0.0.0:8000`
    pub listen_addr: SocketAddr,

    pub jwt: JwtConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: (Ipv4Addr::UNSPECIFIED, 8000).into(),
            jwt: JwtConfig::default(),
        }
    }
}

/// Sensitive credentials, loaded exclusively from environment variables.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct ApiSecrets {
    pub jwt_secret: String,
    pub google_client_id: String,
    /// Absence is reported per news request rather than at startup.
    pub news_api_key: Option<String>,
}

impl ApiSecrets {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET not set")?,
            google_client_id: std::env::var("GOOGLE_CLIENT_ID")
                .context("GOOGLE_CLIENT_ID not set")?,
            news_api_key: std::env::var("NEWS_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
        })
    }
}

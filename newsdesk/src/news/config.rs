use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// NewsAPI base URL without the endpoint path.
    ///
    /// Default: `https://newsapi.org/v2`
    pub base_url: String,

    /// Timeout of the single upstream call.
    ///
    /// Default: `6s`
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Number of articles requested from either endpoint.
    ///
    /// Default: `20`
    pub page_size: u32,

    /// Country used for headlines when the client sends none.
    ///
    /// Default: `us`
    pub default_country: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://newsapi.org/v2".to_owned(),
            timeout: Duration::from_secs(6),
            page_size: 20,
            default_country: "us".to_owned(),
        }
    }
}

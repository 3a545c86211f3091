use serde::{Deserialize, Serialize};

use crate::api::config::ApiConfig;
use crate::google::GoogleConfig;
use crate::news::NewsConfig;
use crate::sqlx::PgConfig;
use crate::utils::logger::LoggerConfig;

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api: ApiConfig,

    pub news: NewsConfig,

    pub google: GoogleConfig,

    pub postgres: PgConfig,

    pub logger: LoggerConfig,
}

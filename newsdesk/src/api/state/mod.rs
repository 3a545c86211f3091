use std::sync::Arc;

use anyhow::Result;
use reqwest::Client as HttpClient;
use tokio::net::TcpListener;

use crate::api::config::{ApiConfig, ApiSecrets};
use crate::api::endpoint::ApiEndpoint;
use crate::config::AppConfig;
use crate::google::GoogleIdTokenVerifier;
use crate::news::NewsClient;
use crate::sqlx::SqlxClient;
use crate::tokens::TokenIssuer;

pub struct ApiStateBuilder<MandatoryFields = (HttpClient, SqlxClient)> {
    config: AppConfig,
    secrets: Option<ApiSecrets>,
    id_token_verifier: Option<GoogleIdTokenVerifier>,
    mandatory_fields: MandatoryFields,
}

impl ApiStateBuilder {
    /// Secrets fall back to the environment and the verifier to Google's
    /// JWKS when they were not provided explicitly.
    pub fn build(self) -> Result<ApiState> {
        let (http_client, sqlx_client) = self.mandatory_fields;
        let config = self.config;

        let secrets = match self.secrets {
            Some(secrets) => secrets,
            None => ApiSecrets::from_env()?,
        };

        let id_token_verifier = match self.id_token_verifier {
            Some(verifier) => verifier,
            None => GoogleIdTokenVerifier::new(&secrets.google_client_id, config.google.clone())?,
        };

        if secrets.news_api_key.is_none() {
            tracing::warn!("NEWS_API_KEY is not set, news requests will fail");
        }

        let token_issuer = TokenIssuer::new(secrets.jwt_secret.as_bytes(), &config.api.jwt);
        let news_client = NewsClient::new(http_client, config.news.clone());

        Ok(ApiState {
            inner: Arc::new(Inner {
                config,
                secrets,
                sqlx_client,
                news_client,
                token_issuer,
                id_token_verifier,
            }),
        })
    }
}

impl<T2> ApiStateBuilder<((), T2)> {
    pub fn with_http_client(self, http_client: HttpClient) -> ApiStateBuilder<(HttpClient, T2)> {
        let (_, sqlx_client) = self.mandatory_fields;

        ApiStateBuilder {
            config: self.config,
            secrets: self.secrets,
            id_token_verifier: self.id_token_verifier,
            mandatory_fields: (http_client, sqlx_client),
        }
    }
}

impl<T1> ApiStateBuilder<(T1, ())> {
    pub fn with_sqlx_client(self, sqlx_client: SqlxClient) -> ApiStateBuilder<(T1, SqlxClient)> {
        let (http_client, _) = self.mandatory_fields;

        ApiStateBuilder {
            config: self.config,
            secrets: self.secrets,
            id_token_verifier: self.id_token_verifier,
            mandatory_fields: (http_client, sqlx_client),
        }
    }
}

impl<T1, T2> ApiStateBuilder<(T1, T2)> {
    pub fn with_config(self, config: AppConfig) -> ApiStateBuilder<(T1, T2)> {
        ApiStateBuilder { config, ..self }
    }

    pub fn with_secrets(self, secrets: ApiSecrets) -> ApiStateBuilder<(T1, T2)> {
        ApiStateBuilder {
            secrets: Some(secrets),
            ..self
        }
    }

    pub fn with_id_token_verifier(
        self,
        verifier: GoogleIdTokenVerifier,
    ) -> ApiStateBuilder<(T1, T2)> {
        ApiStateBuilder {
            id_token_verifier: Some(verifier),
            ..self
        }
    }
}

#[derive(Clone)]
#[repr(transparent)]
pub struct ApiState {
    inner: Arc<Inner>,
}

impl ApiState {
    pub fn builder() -> ApiStateBuilder<((), ())> {
        ApiStateBuilder {
            config: AppConfig::default(),
            secrets: None,
            id_token_verifier: None,
            mandatory_fields: ((), ()),
        }
    }

    pub async fn bind_socket(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind(self.api_config().listen_addr).await
    }

    pub async fn bind_endpoint(&self) -> Result<ApiEndpoint> {
        ApiEndpoint::builder().bind(self.clone()).await
    }

    pub fn api_config(&self) -> &ApiConfig {
        &self.inner.config.api
    }

    pub fn secrets(&self) -> &ApiSecrets {
        &self.inner.secrets
    }

    pub fn sqlx_client(&self) -> &SqlxClient {
        &self.inner.sqlx_client
    }

    pub fn news_client(&self) -> &NewsClient {
        &self.inner.news_client
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.token_issuer
    }

    pub fn id_token_verifier(&self) -> &GoogleIdTokenVerifier {
        &self.inner.id_token_verifier
    }
}

struct Inner {
    config: AppConfig,
    secrets: ApiSecrets,
    sqlx_client: SqlxClient,
    news_client: NewsClient,
    token_issuer: TokenIssuer,
    id_token_verifier: GoogleIdTokenVerifier,
}

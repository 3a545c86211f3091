use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Json;
use axum::body::Body;
use axum::extract::Query;
use axum::http::{Request, StatusCode, Uri, header};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, encode};
use newsdesk::api::config::ApiSecrets;
use newsdesk::api::endpoint::ApiEndpoint;
use newsdesk::api::state::ApiState;
use newsdesk::config::AppConfig;
use newsdesk::google::GoogleIdTokenVerifier;
use newsdesk::sqlx::{PgConfig, SqlxClient};
use newsdesk::tokens::{TokenPair, TokenSubject};
use newsdesk::utils::time::now_sec;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const CLIENT_ID: &str = "newsdesk-test.apps.googleusercontent.com";
pub const JWT_SECRET: &str = "newsdesk-test-jwt-secret";
pub const GOOGLE_KEY: &[u8] = b"newsdesk-test-google-key";
pub const GOOGLE_KID: &str = "test-kid";
pub const NEWS_API_KEY: &str = "test-news-key";
pub const GOOGLE_RSA_PEM: &[u8] = include_bytes!("../fixtures/google-rsa.pem");

/// Skip test with message if no database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        match common::database_url() {
            Some(url) => url,
            None => {
                eprintln!("⚠️  Skipping: DATABASE_URL not set");
                return;
            }
        }
    };
}

#[allow(dead_code)]
pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty())
}

/// Connects to the test database and applies migrations.
#[allow(dead_code)]
pub async fn test_db(url: &str) -> SqlxClient {
    SqlxClient::connect(url, &PgConfig::default())
        .await
        .expect("failed to connect to test database")
}

/// A client whose pool never connects unless a query is issued.
#[allow(dead_code)]
pub fn test_db_offline() -> SqlxClient {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://newsdesk@127.0.0.1:1/newsdesk")
        .expect("invalid offline database URL");
    SqlxClient::new(pool)
}

#[allow(dead_code)]
pub fn test_config(news_base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.news.base_url = news_base_url.to_owned();
    config.news.timeout = Duration::from_millis(500);
    config
}

#[allow(dead_code)]
pub fn test_secrets(news_api_key: Option<&str>) -> ApiSecrets {
    ApiSecrets {
        jwt_secret: JWT_SECRET.to_owned(),
        google_client_id: CLIENT_ID.to_owned(),
        news_api_key: news_api_key.map(str::to_owned),
    }
}

#[allow(dead_code)]
pub fn test_verifier() -> GoogleIdTokenVerifier {
    GoogleIdTokenVerifier::with_static_key(
        CLIENT_ID,
        GOOGLE_KID,
        Algorithm::HS256,
        DecodingKey::from_secret(GOOGLE_KEY),
    )
    .expect("failed to build static verifier")
}

/// Builds a state with locally verifiable Google tokens.
#[allow(dead_code)]
pub fn test_state(
    config: AppConfig,
    news_api_key: Option<&str>,
    sqlx_client: SqlxClient,
) -> ApiState {
    test_state_with_verifier(config, news_api_key, sqlx_client, test_verifier())
}

#[allow(dead_code)]
pub fn test_state_with_verifier(
    config: AppConfig,
    news_api_key: Option<&str>,
    sqlx_client: SqlxClient,
    verifier: GoogleIdTokenVerifier,
) -> ApiState {
    ApiState::builder()
        .with_config(config)
        .with_http_client(reqwest::Client::new())
        .with_sqlx_client(sqlx_client)
        .with_secrets(test_secrets(news_api_key))
        .with_id_token_verifier(verifier)
        .build()
        .expect("failed to build test state")
}

#[allow(dead_code)]
pub fn create_test_app(state: &ApiState) -> axum::Router {
    ApiEndpoint::builder().build(state.clone())
}

/// Signs a Google-shaped ID token with the static test key.
#[allow(dead_code)]
pub fn google_id_token(aud: &str, email: &str, name: &str, sub: &str) -> String {
    let now = now_sec();
    let claims = json!({
        "iss": "https://accounts.google.com",
        "aud": aud,
        "sub": sub,
        "email": email,
        "email_verified": true,
        "name": name,
        "iat": now,
        "exp": now + 600,
    });

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(GOOGLE_KID.to_owned());
    encode(&header, &claims, &EncodingKey::from_secret(GOOGLE_KEY)).unwrap()
}

/// Signs an RS256 ID token the way Google does, with the fixture key.
#[allow(dead_code)]
pub fn google_rs256_id_token(kid: &str, email: &str) -> String {
    let now = now_sec();
    let claims = json!({
        "iss": "accounts.google.com",
        "aud": CLIENT_ID,
        "sub": "rs256-subject",
        "email": email,
        "iat": now,
        "exp": now + 600,
    });

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_owned());
    let key = EncodingKey::from_rsa_pem(GOOGLE_RSA_PEM).unwrap();
    encode(&header, &claims, &key).unwrap()
}

#[allow(dead_code)]
pub fn token_pair(state: &ApiState, user_id: i64) -> TokenPair {
    state
        .tokens()
        .issue_pair(&TokenSubject {
            user_id,
            email: format!("user{user_id}@example.com"),
            name: "Test User".to_owned(),
        })
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// A POST whose body and content type are sent as given.
#[allow(dead_code)]
pub fn post_raw(uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

/// Sends a request and decodes the JSON response body.
#[allow(dead_code)]
pub async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

/// A request observed by the fake NewsAPI.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedRequest {
    pub path: String,
    pub params: HashMap<String, String>,
}

pub type Recorded = Arc<Mutex<Vec<RecordedRequest>>>;

/// Serves `body` with `status` for every path after an optional delay.
///
/// Returns the base URL (ending in `/v2`) and the recorded requests.
#[allow(dead_code)]
pub async fn spawn_fake_news(status: StatusCode, body: Value, delay: Duration) -> (String, Recorded) {
    let recorded = Recorded::default();

    let app = axum::Router::new().fallback({
        let recorded = recorded.clone();
        move |uri: Uri, Query(params): Query<HashMap<String, String>>| {
            let recorded = recorded.clone();
            let body = body.clone();
            async move {
                recorded.lock().unwrap().push(RecordedRequest {
                    path: uri.path().to_owned(),
                    params,
                });
                tokio::time::sleep(delay).await;
                (status, Json(body))
            }
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/v2"), recorded)
}

/// A base URL nothing listens on.
#[allow(dead_code)]
pub async fn closed_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/v2")
}

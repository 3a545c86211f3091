//! News proxy tests against a local fake NewsAPI.

use std::time::Duration;

use axum::http::StatusCode;
use newsdesk::api::error::NEWS_API_KEY_MISSING;
use serde_json::{Value, json};

mod common;

fn upstream_articles() -> Value {
    json!({
        "status": "ok",
        "totalResults": 3,
        "articles": [
            {
                "source": { "id": "the-daily", "name": "The Daily" },
                "author": "Reporter",
                "title": "Polls open across the country",
                "description": "Voting has started",
                "url": "https://example.com/polls",
                "urlToImage": "https://example.com/polls.jpg",
                "publishedAt": "2026-10-01T08:00:00Z",
                "content": "..."
            },
            {
                "source": { "id": null, "name": "Wire" },
                "title": null,
                "url": "https://example.com/untitled"
            },
            {
                "source": { "id": null, "name": "Wire" },
                "title": "Link missing",
                "url": null
            }
        ]
    })
}

async fn app_with_upstream(
    base_url: &str,
    news_api_key: Option<&str>,
) -> (axum::Router, String) {
    let state = common::test_state(
        common::test_config(base_url),
        news_api_key,
        common::test_db_offline(),
    );
    let access = common::token_pair(&state, 1).access;
    (common::create_test_app(&state), access)
}

#[tokio::test]
async fn test_missing_api_key_is_reported_for_any_query() {
    let (base_url, recorded) =
        common::spawn_fake_news(StatusCode::OK, upstream_articles(), Duration::ZERO).await;
    let (app, access) = app_with_upstream(&base_url, None).await;

    for uri in [
        "/api/news/",
        "/api/news/?q=election",
        "/api/news/?category=technology&country=gb",
    ] {
        let (status, body) = common::send(&app, common::get(uri, Some(&access))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(body, json!({ "detail": NEWS_API_KEY_MISSING }), "{uri}");
    }

    assert!(recorded.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_free_text_query_uses_search_endpoint() {
    let (base_url, recorded) =
        common::spawn_fake_news(StatusCode::OK, upstream_articles(), Duration::ZERO).await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    let (status, _) =
        common::send(&app, common::get("/api/news/?q=election", Some(&access))).await;
    assert_eq!(status, StatusCode::OK);

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    let request = &recorded[0];
    assert_eq!(request.path, "/v2/everything");
    assert_eq!(request.params["q"], "election");
    assert_eq!(request.params["sortBy"], "publishedAt");
    assert_eq!(request.params["language"], "en");
    assert_eq!(request.params["pageSize"], "20");
    assert_eq!(request.params["apiKey"], common::NEWS_API_KEY);
}

#[tokio::test]
async fn test_category_without_text_uses_headlines_endpoint() {
    let (base_url, recorded) =
        common::spawn_fake_news(StatusCode::OK, upstream_articles(), Duration::ZERO).await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    let (status, _) = common::send(
        &app,
        common::get("/api/news/?q=&category=technology", Some(&access)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let recorded = recorded.lock().unwrap();
    let request = &recorded[0];
    assert_eq!(request.path, "/v2/top-headlines");
    assert_eq!(request.params["category"], "technology");
    assert_eq!(request.params["country"], "us");
    assert!(!request.params.contains_key("q"));
}

#[tokio::test]
async fn test_text_and_category_are_combined() {
    let (base_url, recorded) =
        common::spawn_fake_news(StatusCode::OK, upstream_articles(), Duration::ZERO).await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    common::send(
        &app,
        common::get("/api/news/?q=rust&category=technology", Some(&access)),
    )
    .await;

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded[0].path, "/v2/everything");
    assert_eq!(recorded[0].params["q"], "rust technology");
}

#[tokio::test]
async fn test_articles_are_normalized() {
    let (base_url, _) =
        common::spawn_fake_news(StatusCode::OK, upstream_articles(), Duration::ZERO).await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    let (status, body) = common::send(&app, common::get("/api/news/", Some(&access))).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(
        body,
        json!({
            "count": 1,
            "articles": [{
                "title": "Polls open across the country",
                "description": "Voting has started",
                "url": "https://example.com/polls",
                "image": "https://example.com/polls.jpg",
                "source": "The Daily",
                "publishedAt": "2026-10-01T08:00:00Z"
            }]
        })
    );
}

#[tokio::test]
async fn test_upstream_error_status_is_bad_gateway() {
    let (base_url, _) = common::spawn_fake_news(
        StatusCode::UNAUTHORIZED,
        json!({ "status": "error", "code": "apiKeyInvalid", "message": "Your API key is invalid." }),
        Duration::ZERO,
    )
    .await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    let (status, body) = common::send(&app, common::get("/api/news/", Some(&access))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("News API returned status 401"), "{detail}");
}

#[tokio::test]
async fn test_upstream_error_payload_is_bad_gateway() {
    let (base_url, _) = common::spawn_fake_news(
        StatusCode::OK,
        json!({ "status": "error", "code": "rateLimited", "message": "Too many requests" }),
        Duration::ZERO,
    )
    .await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    let (status, body) = common::send(&app, common::get("/api/news/", Some(&access))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["detail"], "News API error: Too many requests");
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let base_url = common::closed_base_url().await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    let (status, body) = common::send(&app, common::get("/api/news/", Some(&access))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.starts_with("News API request error"), "{detail}");
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let (base_url, recorded) = common::spawn_fake_news(
        StatusCode::OK,
        upstream_articles(),
        Duration::from_secs(3),
    )
    .await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    let (status, _) = common::send(&app, common::get("/api/news/?q=slow", Some(&access))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(recorded.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_repeated_param_uses_last_value() {
    let (base_url, recorded) =
        common::spawn_fake_news(StatusCode::OK, upstream_articles(), Duration::ZERO).await;
    let (app, access) = app_with_upstream(&base_url, Some(common::NEWS_API_KEY)).await;

    let (status, body) = common::send(
        &app,
        common::get("/api/news/?q=first&q=second&page=3", Some(&access)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded[0].path, "/v2/everything");
    assert_eq!(recorded[0].params["q"], "second");
}

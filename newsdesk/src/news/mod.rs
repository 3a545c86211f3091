//! Pass-through search over NewsAPI.

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

pub use self::config::NewsConfig;

mod config;

/// Categories accepted by the headlines endpoint.
pub const CATEGORIES: [&str; 7] = [
    "business",
    "entertainment",
    "general",
    "health",
    "science",
    "sports",
    "technology",
];

/// Query parameters accepted from clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsQuery {
    pub q: Option<String>,
    pub country: Option<String>,
    pub category: Option<String>,
}

impl NewsQuery {
    /// A repeated key keeps its last value. Unknown keys are ignored.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        pairs
            .into_iter()
            .fold(Self::default(), |mut query, (key, value)| {
                match key.as_str() {
                    "q" => query.q = Some(value),
                    "country" => query.country = Some(value),
                    "category" => query.category = Some(value),
                    _ => {}
                }
                query
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsEndpoint {
    TopHeadlines,
    Everything,
}

impl NewsEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Self::TopHeadlines => "top-headlines",
            Self::Everything => "everything",
        }
    }
}

impl fmt::Display for NewsEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A single upstream call: endpoint plus query string, API key excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRequest {
    pub endpoint: NewsEndpoint,
    pub params: Vec<(&'static str, String)>,
}

impl NewsRequest {
    /// Picks the endpoint and parameters for a client query.
    ///
    /// Without free text the headlines endpoint is used and an unknown
    /// category becomes the search term. With free text the search
    /// endpoint is used and any category is appended to the text.
    pub fn build(query: &NewsQuery, config: &NewsConfig) -> Self {
        let q = non_empty(&query.q);
        let category = non_empty(&query.category);
        let page_size = config.page_size.to_string();

        match q {
            None => {
                let country = non_empty(&query.country).unwrap_or(config.default_country.as_str());
                let mut params = vec![
                    ("country", country.to_owned()),
                    ("pageSize", page_size),
                ];
                match category {
                    Some(category) if CATEGORIES.contains(&category) => {
                        params.push(("category", category.to_owned()));
                    }
                    Some(category) => params.push(("q", category.to_owned())),
                    None => {}
                }

                Self {
                    endpoint: NewsEndpoint::TopHeadlines,
                    params,
                }
            }
            Some(q) => {
                let terms = match category {
                    Some(category) => format!("{q} {category}"),
                    None => q.to_owned(),
                };

                Self {
                    endpoint: NewsEndpoint::Everything,
                    params: vec![
                        ("q", terms),
                        ("sortBy", "publishedAt".to_owned()),
                        ("language", "en".to_owned()),
                        ("pageSize", page_size),
                    ],
                }
            }
        }
    }

    pub fn url(&self, base_url: &str, api_key: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.endpoint.path()
        ))?;

        url.query_pairs_mut()
            .extend_pairs(self.params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("apiKey", api_key);

        Ok(url)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Normalized article returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub image: Option<String>,
    pub source: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsPage {
    pub count: usize,
    pub articles: Vec<Article>,
}

impl NewsPage {
    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self {
            count: articles.len(),
            articles,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpstreamResponse {
    status: Option<String>,
    message: Option<String>,
    error: Option<serde_json::Value>,
    articles: Vec<UpstreamArticle>,
}

impl UpstreamResponse {
    fn error_message(&self) -> Option<String> {
        if let Some(error) = &self.error {
            return Some(match error {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });
        }

        (self.status.as_deref() == Some("error")).then(|| {
            self.message
                .clone()
                .unwrap_or_else(|| "unknown error".to_owned())
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct UpstreamArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    source: Option<UpstreamSource>,
    published_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpstreamSource {
    name: Option<String>,
}

impl UpstreamArticle {
    /// Articles without a title or url are dropped.
    fn normalize(self) -> Option<Article> {
        let title = self.title.filter(|t| !t.is_empty())?;
        let url = self.url.filter(|u| !u.is_empty())?;

        Some(Article {
            title,
            description: self.description,
            url,
            image: self.url_to_image,
            source: self.source.and_then(|s| s.name),
            published_at: self.published_at,
        })
    }
}

fn normalize(articles: Vec<UpstreamArticle>) -> NewsPage {
    NewsPage::from_articles(
        articles
            .into_iter()
            .filter_map(UpstreamArticle::normalize)
            .collect(),
    )
}

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("News API returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("News API error: {0}")]
    Provider(String),
    #[error("News API request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("News API request error: malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl NewsError {
    /// Whether the failure originates from the upstream provider.
    pub fn is_upstream(&self) -> bool {
        !matches!(self, Self::Unexpected(_))
    }
}

pub struct NewsClient {
    http_client: reqwest::Client,
    config: NewsConfig,
}

impl NewsClient {
    pub fn new(http_client: reqwest::Client, config: NewsConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    /// Performs exactly one upstream call, without retries.
    pub async fn search(&self, api_key: &str, query: &NewsQuery) -> Result<NewsPage, NewsError> {
        let request = NewsRequest::build(query, &self.config);
        let url = request
            .url(&self.config.base_url, api_key)
            .map_err(|e| NewsError::Unexpected(format!("invalid News API URL: {e}")))?;

        tracing::info!(endpoint = %request.endpoint, params = ?request.params, "querying News API");

        let response = self
            .http_client
            .get(url)
            .timeout(self.config.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(%status, "News API responded");

        if status != StatusCode::OK {
            tracing::warn!(%status, "News API returned an error status");
            return Err(NewsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data = serde_json::from_str::<UpstreamResponse>(&body)?;
        if let Some(message) = data.error_message() {
            return Err(NewsError::Provider(message));
        }

        let page = normalize(data.articles);
        tracing::info!(count = page.count, "normalized News API articles");

        Ok(page)
    }
}

pub mod auth;
pub mod news;
pub mod token;
pub mod user;

/// Liveness probe.
pub async fn home() -> &'static str {
    "Welcome to the newsdesk backend!"
}

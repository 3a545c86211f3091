//! Google sign-in and NewsAPI search backend.

pub mod api;
pub mod cli;
pub mod config;
pub mod google;
pub mod news;
pub mod sqlx;
pub mod tokens;
pub mod utils;

use serde::{Deserialize, Serialize};

use crate::sqlx::User;

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.full_name(),
        }
    }
}

/// Splits a display name into the first word and the rest.
pub fn split_full_name(name: &str) -> (&str, &str) {
    name.split_once(' ').unwrap_or((name, ""))
}

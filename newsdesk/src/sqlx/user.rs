use crate::sqlx::{Profile, SqlxClient, User, username};

/// Identity data taken from a verified Google ID token.
#[derive(Debug, Clone)]
pub struct GoogleSignIn<'a> {
    pub email: &'a str,
    pub subject: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

impl SqlxClient {
    /// Finds or creates the user for a Google sign-in and links the
    /// Google subject to it.
    ///
    /// Lookup, creation, name update and profile upsert share one
    /// transaction.
    pub async fn sign_in_google(&self, sign_in: &GoogleSignIn<'_>) -> anyhow::Result<User> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(sign_in.email)
        .fetch_optional(&mut *tx)
        .await?;

        let user = match existing {
            None => {
                let base = username::base_from_email(sign_in.email);
                let taken = sqlx::query_scalar::<_, String>(
                    "SELECT username FROM users WHERE username LIKE $1",
                )
                .bind(format!("{base}%"))
                .fetch_all(&mut *tx)
                .await?;
                let username = username::pick_available(&base, taken.iter().map(String::as_str));

                let user = sqlx::query_as::<_, User>(
                    r#"
                    INSERT INTO users (username, email, first_name, last_name)
                    VALUES ($1, $2, $3, $4)
                    RETURNING id, username, email, first_name, last_name, created_at, updated_at
                    "#,
                )
                .bind(&username)
                .bind(sign_in.email)
                .bind(sign_in.first_name)
                .bind(sign_in.last_name)
                .fetch_one(&mut *tx)
                .await?;

                tracing::info!(user_id = user.id, username = %user.username, "user created");
                user
            }
            Some(user) => {
                let first_name = pick_name(&user.first_name, sign_in.first_name);
                let last_name = pick_name(&user.last_name, sign_in.last_name);

                if first_name == user.first_name && last_name == user.last_name {
                    user
                } else {
                    tracing::debug!(user_id = user.id, "updating user name");
                    sqlx::query_as::<_, User>(
                        r#"
                        UPDATE users
                        SET first_name = $2,
                            last_name  = $3,
                            updated_at = now()
                        WHERE id = $1
                        RETURNING id, username, email, first_name, last_name, created_at, updated_at
                        "#,
                    )
                    .bind(user.id)
                    .bind(first_name)
                    .bind(last_name)
                    .fetch_one(&mut *tx)
                    .await?
                }
            }
        };

        sqlx::query(
            r#"
            INSERT INTO profiles (user_id, google_sub)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
                SET google_sub = EXCLUDED.google_sub,
                    updated_at = now()
            "#,
        )
        .bind(user.id)
        .bind(sign_in.subject)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, first_name, last_name, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_profile(&self, user_id: i64) -> anyhow::Result<Option<Profile>> {
        let profile = sqlx::query_as::<_, Profile>(
            "SELECT user_id, google_sub FROM profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}

/// Empty incoming names never overwrite stored ones.
fn pick_name<'a>(current: &'a str, incoming: &'a str) -> &'a str {
    if incoming.is_empty() { current } else { incoming }
}

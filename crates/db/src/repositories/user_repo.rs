//! Repository for the `users` table.

use sqlx::PgPool;

use crate::models::user::User;

/// Column list for users queries.
const COLUMNS: &str = "id, username, role, created_at";

/// Creates the users referenced by revisions.
pub struct UserRepo;

impl UserRepo {
    pub async fn create(pool: &PgPool, username: &str, role: &str) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, role) VALUES ($1, $2) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .bind(role)
            .fetch_one(pool)
            .await
    }
}

use sqlx::{FromRow, SqlitePool};
use time::OffsetDateTime;

use crate::users::error::UserError;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: OffsetDateTime,
}

/// Partial update. A `None` field leaves the stored value untouched.
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }
}

impl User {
    /// Insert a new user and return it as stored, including the generated
    /// id and timestamp. Uniqueness collisions become `UserError::Conflict`.
    pub async fn create(db: &SqlitePool, username: &str, email: &str) -> Result<User, UserError> {
        let mut conn = db.acquire().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email)
            VALUES ($1, $2)
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(&mut *conn)
        .await
        .map_err(UserError::from_db)?;
        Ok(user)
    }

    /// All users, newest first. Id breaks ties within the same millisecond.
    pub async fn list_all(db: &SqlitePool) -> Result<Vec<User>, UserError> {
        let mut conn = db.acquire().await?;
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, created_at
            FROM users
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(users)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, UserError> {
        let mut conn = db.acquire().await?;
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(user)
    }

    /// Apply a partial update and return the row as re-read from the store.
    /// Returns `None` when no user with `id` exists. An empty patch is a
    /// successful no-op returning the current row.
    pub async fn update(
        db: &SqlitePool,
        id: i64,
        patch: UserPatch,
    ) -> Result<Option<User>, UserError> {
        let mut conn = db.acquire().await?;

        let Some(current) = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        else {
            return Ok(None);
        };

        if patch.is_empty() {
            return Ok(Some(current));
        }

        // Read-merge-write: overlay the set fields on the current row and
        // write both columns back in one statement. created_at is immutable.
        let username = patch.username.unwrap_or(current.username);
        let email = patch.email.unwrap_or(current.email);

        let updated = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $1, email = $2
            WHERE id = $3
            RETURNING id, username, email, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(id)
        .fetch_one(&mut *conn)
        .await
        .map_err(UserError::from_db)?;
        Ok(Some(updated))
    }

    /// Remove the user if present. `true` when a row was actually deleted.
    pub async fn delete(db: &SqlitePool, id: i64) -> Result<bool, UserError> {
        let mut conn = db.acquire().await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

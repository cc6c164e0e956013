use thiserror::Error;

/// Errors surfaced by the user repository.
///
/// "Not found" is not an error here; lookups return `Option` and deletes
/// return whether a row was removed.
#[derive(Debug, Error)]
pub enum UserError {
    /// A write would violate the `username` or `email` uniqueness constraint.
    #[error("{0}")]
    Conflict(String),

    /// Anything else the store reports. Fatal from the caller's perspective.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl UserError {
    /// Translate a store-level error, turning UNIQUE violations into a typed
    /// conflict naming the colliding field. SQLite reports them as
    /// `UNIQUE constraint failed: users.<column>`.
    pub(crate) fn from_db(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                let field = if db.message().contains("users.username") {
                    "username"
                } else if db.message().contains("users.email") {
                    "email"
                } else {
                    "username or email"
                };
                return UserError::Conflict(format!("User with this {field} already exists"));
            }
        }
        UserError::Database(e)
    }
}

use thiserror::Error;

/// Error type for store operations, independent of the backend in use.
#[derive(Error, Debug)]
pub enum DbError {
    /// Unique constraint violation (e.g. duplicate username)
    #[error("unique constraint violation on {constraint}")]
    UniqueViolation { constraint: String },

    /// A bind value could not be encoded for the query
    #[error("failed to encode query argument: {0}")]
    Encode(String),

    /// A stored value could not be decoded into its domain type
    #[error("failed to decode stored value: {0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return DbError::UniqueViolation {
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
        }
        DbError::Sqlx(err)
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

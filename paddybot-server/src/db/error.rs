//! Database error type
//!
//! Raw sqlx errors are classified once, here, so handlers never see a
//! store-level error for conditions they are expected to handle (duplicate
//! keys, exhausted or closed pools).

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// `acquire_session()` before the host ran startup
    #[error("database pool not initialized")]
    NotInitialized,

    /// `acquire_session()` after shutdown began
    #[error("database pool closed")]
    PoolClosed,

    /// The store could not be reached (refused, timed out, TLS, exhausted pool)
    #[error("database unreachable: {0}")]
    Connection(#[source] sqlx::Error),

    /// Malformed connection settings
    #[error("invalid database configuration: {0}")]
    Config(String),

    /// Unique constraint violated
    #[error("{field} already exists")]
    Conflict { field: &'static str },

    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    /// The session was used after commit or rollback
    #[error("session already finished")]
    SessionFinished,

    #[error("database error: {0}")]
    Sqlx(#[source] sqlx::Error),
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolClosed => Self::PoolClosed,
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::Tls(_) => {
                Self::Connection(e)
            }
            sqlx::Error::Configuration(ref inner) => Self::Config(inner.to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Conflict {
                    field: unique_field(db.constraint()),
                }
            }
            other => Self::Sqlx(other),
        }
    }
}

/// Map a unique constraint name to the column it protects.
fn unique_field(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(name) if name.contains("username") => "username",
        Some(name) if name.contains("email") => "email",
        _ => "value",
    }
}

//! Request-scoped session broker
//!
//! Each request borrows exactly one pooled connection wrapped in a
//! transaction. The broker owns the bookkeeping:
//!
//! - `Open` → `Committed` when the handler succeeds
//! - `Open` → `RolledBack` when the handler fails
//! - always → `Closed`, even if commit or rollback itself errors
//!
//! Handler errors are returned unchanged after cleanup. If the request future
//! is dropped mid-flight, the session's `Drop` rolls back and hands the
//! connection back to the pool.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{PgConnection, Postgres, Transaction};

use super::error::DbError;

/// Transactional state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Committed,
    RolledBack,
    Closed,
}

/// A unit of work over one borrowed connection.
#[async_trait]
pub trait Transactional: Send {
    fn state(&self) -> SessionState;

    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;

    /// Return the connection. Called exactly once by the broker.
    async fn close(&mut self);
}

/// Anything that can hand out sessions (the database pool, or a fake in tests).
#[async_trait]
pub trait SessionSource: Send + Sync {
    type Session: Transactional;

    async fn acquire_session(&self) -> Result<Self::Session, DbError>;
}

/// Run `handler` inside a fresh session from `source`.
///
/// Exactly one of commit or rollback runs, then close. A commit failure is
/// returned as the request's error; a rollback failure is only logged so the
/// handler's own error reaches the caller unchanged.
pub async fn with_session<S, F, T, E>(source: &S, handler: F) -> Result<T, E>
where
    S: SessionSource + ?Sized,
    F: for<'s> FnOnce(&'s mut S::Session) -> BoxFuture<'s, Result<T, E>> + Send,
    T: Send,
    E: From<DbError> + Send,
{
    let mut session = source.acquire_session().await?;

    let result = match handler(&mut session).await {
        Ok(value) => match session.commit().await {
            Ok(()) => Ok(value),
            Err(e) => {
                tracing::error!(error = %e, "Commit failed");
                Err(E::from(e))
            }
        },
        Err(err) => {
            if let Err(e) = session.rollback().await {
                tracing::warn!(error = %e, "Rollback failed");
            }
            Err(err)
        }
    };

    session.close().await;
    result
}

/// Postgres session: one pooled connection inside a transaction.
pub struct DbSession {
    tx: Option<Transaction<'static, Postgres>>,
    state: SessionState,
}

impl DbSession {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            tx: Some(tx),
            state: SessionState::Open,
        }
    }

    /// Connection to run queries on. Only valid while the session is open.
    pub fn conn(&mut self) -> Result<&mut PgConnection, DbError> {
        match (self.state, self.tx.as_mut()) {
            (SessionState::Open, Some(tx)) => Ok(&mut **tx),
            _ => Err(DbError::SessionFinished),
        }
    }

    fn take_open(&mut self) -> Result<Transaction<'static, Postgres>, DbError> {
        if self.state != SessionState::Open {
            return Err(DbError::SessionFinished);
        }
        self.tx.take().ok_or(DbError::SessionFinished)
    }
}

#[async_trait]
impl Transactional for DbSession {
    fn state(&self) -> SessionState {
        self.state
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        let tx = self.take_open()?;
        let result = tx.commit().await;
        // A failed COMMIT leaves nothing applied
        self.state = if result.is_ok() {
            SessionState::Committed
        } else {
            SessionState::RolledBack
        };
        result.map_err(DbError::from)
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        let tx = self.take_open()?;
        self.state = SessionState::RolledBack;
        tx.rollback().await.map_err(DbError::from)
    }

    async fn close(&mut self) {
        // Dropping an unfinished transaction queues a ROLLBACK and returns
        // the connection to the pool.
        self.tx.take();
        self.state = SessionState::Closed;
    }
}

impl Drop for DbSession {
    fn drop(&mut self) {
        if self.tx.is_some() {
            tracing::debug!("Session dropped while open, rolling back");
        }
    }
}

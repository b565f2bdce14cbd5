//! Database connection pool management
//!
//! Uses a sqlx PgPool bounded by pool size plus overflow. The pool is built
//! lazily: startup parses and validates the settings but makes no round trip,
//! so an unreachable store surfaces as a connection error on first use.

use std::str::FromStr;

use async_trait::async_trait;
use futures::future::BoxFuture;
use paddybot_core::DatabaseSettings;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgPool};
use tokio::sync::RwLock;

use super::error::DbError;
use super::session::{with_session, DbSession, SessionSource};
use crate::lifecycle::{BoxError, ManagedResource, ResourceStatus};

enum PoolState {
    Uninitialized,
    Ready(PgPool),
    Closed,
}

/// Build a lazily connecting pool from settings.
///
/// Borrowed connections are pinged before use (`test_before_acquire`), and
/// acquisition waits at most `pool_timeout_secs` for a free slot.
pub fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, DbError> {
    let mut options =
        PgConnectOptions::from_str(&settings.url).map_err(|e| DbError::Config(e.to_string()))?;
    if !settings.echo {
        options = options.disable_statement_logging();
    }

    Ok(PgPoolOptions::new()
        .max_connections(settings.max_connections())
        .min_connections(0)
        .acquire_timeout(settings.acquire_timeout())
        .test_before_acquire(true)
        .connect_lazy_with(options))
}

/// Process-scoped owner of the Postgres pool.
pub struct DatabasePool {
    settings: DatabaseSettings,
    state: RwLock<PoolState>,
}

impl DatabasePool {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(PoolState::Uninitialized),
        }
    }

    /// Create the pool. Calling it again while ready is a no-op; a closed
    /// pool cannot be reopened.
    pub async fn init(&self) -> Result<(), DbError> {
        let mut state = self.state.write().await;
        match *state {
            PoolState::Ready(_) => return Ok(()),
            PoolState::Closed => return Err(DbError::PoolClosed),
            PoolState::Uninitialized => {}
        }

        let pool = create_pool(&self.settings)?;
        tracing::info!(
            url = %self.settings.redacted_url(),
            max_connections = self.settings.max_connections(),
            "Database pool ready (lazy connect)"
        );
        *state = PoolState::Ready(pool);
        Ok(())
    }

    /// Shared pool handle.
    pub async fn handle(&self) -> Result<PgPool, DbError> {
        match &*self.state.read().await {
            PoolState::Ready(pool) => Ok(pool.clone()),
            PoolState::Uninitialized => Err(DbError::NotInitialized),
            PoolState::Closed => Err(DbError::PoolClosed),
        }
    }

    pub async fn status(&self) -> ResourceStatus {
        match &*self.state.read().await {
            PoolState::Uninitialized => ResourceStatus::Uninitialized,
            PoolState::Ready(_) => ResourceStatus::Ready,
            PoolState::Closed => ResourceStatus::Closed,
        }
    }

    /// Begin a transaction on one pooled connection.
    ///
    /// Suspends while the pool is exhausted, up to the acquire timeout.
    pub async fn acquire_session(&self) -> Result<DbSession, DbError> {
        let pool = self.handle().await?;
        let tx = pool.begin().await?;
        Ok(DbSession::new(tx))
    }

    /// Run `handler` in a request-scoped session (see [`with_session`]).
    pub async fn scoped<F, T, E>(&self, handler: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut DbSession) -> BoxFuture<'s, Result<T, E>> + Send,
        T: Send,
        E: From<DbError> + Send,
    {
        with_session(self, handler).await
    }

    /// Round trip used by readiness checks.
    pub async fn ping(&self) -> Result<(), DbError> {
        let pool = self.handle().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }

    /// Reject new sessions, wait for checked-out ones to come back, then
    /// drop every connection. Safe to call more than once.
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.write().await, PoolState::Closed);
        if let PoolState::Ready(pool) = previous {
            let in_use = pool.size().saturating_sub(pool.num_idle() as u32);
            tracing::info!(in_use, "Closing database pool");
            pool.close().await;
            tracing::info!("Database connection closed");
        }
    }
}

#[async_trait]
impl SessionSource for DatabasePool {
    type Session = DbSession;

    async fn acquire_session(&self) -> Result<DbSession, DbError> {
        DatabasePool::acquire_session(self).await
    }
}

#[async_trait]
impl ManagedResource for DatabasePool {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn status(&self) -> ResourceStatus {
        DatabasePool::status(self).await
    }

    async fn init(&self) -> Result<(), BoxError> {
        DatabasePool::init(self).await.map_err(Into::into)
    }

    async fn close(&self) {
        DatabasePool::close(self).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> DatabaseSettings {
        DatabaseSettings {
            url: url.to_string(),
            pool_timeout_secs: 1,
            ..DatabaseSettings::default()
        }
    }

    // Nothing listens on port 1, and init never dials anyway
    const UNREACHABLE: &str = "postgres://user:pw@127.0.0.1:1/paddybot";

    #[tokio::test]
    async fn acquire_before_init_is_not_initialized() {
        let db = DatabasePool::new(settings(UNREACHABLE));
        assert_eq!(db.status().await, ResourceStatus::Uninitialized);
        assert!(matches!(
            db.acquire_session().await,
            Err(DbError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn init_is_lazy() {
        let db = DatabasePool::new(settings(UNREACHABLE));
        db.init().await.expect("lazy init must not dial the store");
        assert_eq!(db.status().await, ResourceStatus::Ready);
        db.close().await;
    }

    #[tokio::test]
    async fn malformed_url_fails_init() {
        let db = DatabasePool::new(settings("definitely not a url"));
        assert!(matches!(db.init().await, Err(DbError::Config(_))));
        assert_eq!(db.status().await, ResourceStatus::Uninitialized);
    }

    #[tokio::test]
    async fn unreachable_store_fails_on_first_use() {
        let db = DatabasePool::new(settings(UNREACHABLE));
        db.init().await.unwrap();

        let err = db.acquire_session().await.err().expect("store is unreachable");
        assert!(matches!(err, DbError::Connection(_)), "got {err:?}");
        db.close().await;
    }

    #[tokio::test]
    async fn acquire_after_close_is_pool_closed() {
        let db = DatabasePool::new(settings(UNREACHABLE));
        db.init().await.unwrap();
        db.close().await;

        assert_eq!(db.status().await, ResourceStatus::Closed);
        assert!(matches!(db.acquire_session().await, Err(DbError::PoolClosed)));
        assert!(matches!(db.init().await, Err(DbError::PoolClosed)));

        // Second close is a no-op
        db.close().await;
    }

    #[tokio::test]
    async fn close_without_init_marks_closed() {
        let db = DatabasePool::new(settings(UNREACHABLE));
        db.close().await;
        assert!(matches!(db.handle().await, Err(DbError::PoolClosed)));
    }

    // Integration tests require a real database
    // Run with: DATABASE_URL=postgres://... cargo test -p paddybot-server -- --ignored

    fn live_pool() -> DatabasePool {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        DatabasePool::new(DatabaseSettings {
            url,
            ..DatabaseSettings::default()
        })
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn session_runs_queries() {
        let db = live_pool();
        db.init().await.unwrap();

        let value: i32 = db
            .scoped(|session| {
                Box::pin(async move {
                    let row: (i32,) = sqlx::query_as("SELECT 1")
                        .fetch_one(session.conn()?)
                        .await
                        .map_err(DbError::from)?;
                    Ok::<_, DbError>(row.0)
                })
            })
            .await
            .unwrap();

        assert_eq!(value, 1);
        db.close().await;
    }

    #[tokio::test]
    #[ignore = "requires database"]
    async fn close_waits_for_open_sessions() {
        let db = live_pool();
        db.init().await.unwrap();

        let mut first = db.acquire_session().await.unwrap();
        let mut second = db.acquire_session().await.unwrap();

        let closing = tokio::spawn(async move {
            db.close().await;
            db
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Open sessions keep working while close is pending
        for session in [&mut first, &mut second] {
            let row: (i32,) = sqlx::query_as("SELECT 2")
                .fetch_one(session.conn().unwrap())
                .await
                .unwrap();
            assert_eq!(row.0, 2);
        }
        assert!(!closing.is_finished());

        use crate::db::Transactional;
        for session in [&mut first, &mut second] {
            session.commit().await.unwrap();
            session.close().await;
        }

        let db = closing.await.unwrap();
        assert!(matches!(db.acquire_session().await, Err(DbError::PoolClosed)));
    }
}

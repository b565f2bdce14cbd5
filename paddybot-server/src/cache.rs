//! Best-effort Redis cache
//!
//! One multiplexed `ConnectionManager` shared by every request. `init` dials
//! and PINGs so a dead cache fails startup. After that, operations never
//! surface errors: they log and return `None`, `false` or `0`.

use std::time::Duration;

use async_trait::async_trait;
use paddybot_core::CacheSettings;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, RedisError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::lifecycle::{BoxError, ManagedResource, ResourceStatus};

/// TTL for callers with no opinion (1 hour)
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache unreachable: {0}")]
    Connection(#[source] RedisError),

    #[error("cache did not answer within {secs}s")]
    Timeout { secs: u64 },

    #[error("unexpected PING reply: {0}")]
    Handshake(String),

    #[error("cache closed")]
    Closed,
}

enum CacheState {
    Uninitialized,
    Ready(ConnectionManager),
    Closed,
}

/// `redis://[:password@]host:port/db`
pub fn redis_url(settings: &CacheSettings) -> String {
    let auth = settings
        .password
        .as_ref()
        .map(|pw| format!(":{}@", urlencoding::encode(pw.expose())))
        .unwrap_or_default();
    format!(
        "redis://{auth}{}:{}/{}",
        settings.host, settings.port, settings.db
    )
}

/// Process-scoped owner of the Redis connection.
pub struct CacheManager {
    settings: CacheSettings,
    state: RwLock<CacheState>,
}

impl CacheManager {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            settings,
            state: RwLock::new(CacheState::Uninitialized),
        }
    }

    /// Connect and PING. Idempotent while ready.
    pub async fn init(&self) -> Result<(), CacheError> {
        let mut state = self.state.write().await;
        match *state {
            CacheState::Ready(_) => return Ok(()),
            CacheState::Closed => return Err(CacheError::Closed),
            CacheState::Uninitialized => {}
        }

        let timeout = self.settings.connect_timeout();
        let conn = tokio::time::timeout(timeout, self.connect())
            .await
            .map_err(|_| CacheError::Timeout {
                secs: timeout.as_secs(),
            })??;

        tracing::info!(
            host = %self.settings.host,
            port = self.settings.port,
            db = self.settings.db,
            "Redis connection ready"
        );
        *state = CacheState::Ready(conn);
        Ok(())
    }

    async fn connect(&self) -> Result<ConnectionManager, CacheError> {
        let client = Client::open(redis_url(&self.settings)).map_err(CacheError::Connection)?;
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);
        let mut conn = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(CacheError::Connection)?;

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Connection)?;
        if pong != "PONG" {
            return Err(CacheError::Handshake(pong));
        }
        Ok(conn)
    }

    pub async fn status(&self) -> ResourceStatus {
        match &*self.state.read().await {
            CacheState::Uninitialized => ResourceStatus::Uninitialized,
            CacheState::Ready(_) => ResourceStatus::Ready,
            CacheState::Closed => ResourceStatus::Closed,
        }
    }

    /// PING round trip used by readiness checks.
    pub async fn ping(&self) -> bool {
        let Some(mut conn) = self.conn().await else {
            return false;
        };
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map(|pong| pong == "PONG")
            .unwrap_or_else(|e| degraded("ping", "", e))
    }

    /// Clone of the shared connection, or `None` when not ready.
    async fn conn(&self) -> Option<ConnectionManager> {
        match &*self.state.read().await {
            CacheState::Ready(conn) => Some(conn.clone()),
            _ => None,
        }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .unwrap_or_else(|e| degraded("get", key, e))
    }

    /// Decode a cached JSON value. Undecodable entries read as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "Cached value is not valid JSON");
                None
            }
        }
    }

    /// Store `value` for `ttl`. Strings are stored as-is, anything else as JSON.
    pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl: Duration) -> bool {
        let encoded = match encode(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache value could not be encoded");
                return false;
            }
        };
        let Some(mut conn) = self.conn().await else {
            return false;
        };
        conn.set_ex::<_, _, ()>(key, encoded, ttl.as_secs().max(1))
            .await
            .map(|()| true)
            .unwrap_or_else(|e| degraded("set", key, e))
    }

    /// `true` when a key was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let Some(mut conn) = self.conn().await else {
            return false;
        };
        conn.del::<_, i64>(key)
            .await
            .map(|removed| removed > 0)
            .unwrap_or_else(|e| degraded("delete", key, e))
    }

    pub async fn exists(&self, key: &str) -> bool {
        let Some(mut conn) = self.conn().await else {
            return false;
        };
        conn.exists::<_, bool>(key)
            .await
            .unwrap_or_else(|e| degraded("exists", key, e))
    }

    /// Add `amount` and return the new value.
    pub async fn increment(&self, key: &str, amount: i64) -> i64 {
        let Some(mut conn) = self.conn().await else {
            return 0;
        };
        conn.incr::<_, _, i64>(key, amount)
            .await
            .unwrap_or_else(|e| degraded("increment", key, e))
    }

    pub async fn expire(&self, key: &str, ttl: Duration) -> bool {
        let Some(mut conn) = self.conn().await else {
            return false;
        };
        let secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        conn.expire::<_, bool>(key, secs)
            .await
            .unwrap_or_else(|e| degraded("expire", key, e))
    }

    /// Drop the connection. Later operations return their defaults.
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.write().await, CacheState::Closed);
        if let CacheState::Ready(conn) = previous {
            drop(conn);
            tracing::info!("Redis connection closed");
        }
    }
}

fn encode<V: Serialize + ?Sized>(value: &V) -> Result<String, serde_json::Error> {
    Ok(match serde_json::to_value(value)? {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

fn degraded<T: Default>(op: &'static str, key: &str, error: RedisError) -> T {
    tracing::warn!(op, key, error = %error, "Cache operation failed");
    T::default()
}

#[async_trait]
impl ManagedResource for CacheManager {
    fn name(&self) -> &'static str {
        "cache"
    }

    async fn status(&self) -> ResourceStatus {
        CacheManager::status(self).await
    }

    async fn init(&self) -> Result<(), BoxError> {
        CacheManager::init(self).await.map_err(Into::into)
    }

    async fn close(&self) {
        CacheManager::close(self).await
    }
}

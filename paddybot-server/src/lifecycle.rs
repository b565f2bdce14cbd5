//! Application lifecycle: ordered startup and shutdown of shared resources
//!
//! The host registers each long-lived resource once. `on_startup` must finish
//! before the listener is bound; `on_shutdown` runs only after axum has
//! stopped taking requests and drained the in-flight ones.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

/// Boxed error returned by a resource that failed to initialize
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Where a managed resource is in its life.
///
/// `Uninitialized` and `Closed` are distinct: the first means
/// startup has not reached the resource yet, the second that shutdown has
/// already begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Uninitialized,
    Ready,
    Closed,
}

/// A process-scoped resource with an init/close pair.
#[async_trait]
pub trait ManagedResource: Send + Sync {
    /// Short name used in logs and startup errors
    fn name(&self) -> &'static str;

    async fn status(&self) -> ResourceStatus;

    async fn init(&self) -> Result<(), BoxError>;

    /// Release the resource. Must be safe to call more than once.
    async fn close(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("failed to initialize {resource}: {source}")]
    Startup {
        resource: &'static str,
        #[source]
        source: BoxError,
    },
}

/// Ordered set of managed resources.
#[derive(Default, Clone)]
pub struct Lifecycle {
    resources: Vec<Arc<dyn ManagedResource>>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource. Registration order is startup order.
    pub fn with(mut self, resource: Arc<dyn ManagedResource>) -> Self {
        self.resources.push(resource);
        self
    }

    /// Initialize every resource in registration order.
    ///
    /// The first failure stops the sequence: later resources are never
    /// touched, the ones already initialized are closed again, and the
    /// error is returned to the caller.
    pub async fn on_startup(&self) -> Result<(), LifecycleError> {
        for (index, resource) in self.resources.iter().enumerate() {
            tracing::info!(resource = resource.name(), "Initializing");

            if let Err(source) = resource.init().await {
                tracing::error!(resource = resource.name(), error = %source, "Startup aborted");
                for started in &self.resources[..index] {
                    started.close().await;
                }
                return Err(LifecycleError::Startup {
                    resource: resource.name(),
                    source,
                });
            }

            tracing::info!(resource = resource.name(), "Initialized");
        }
        Ok(())
    }

    /// Close every resource in registration order.
    ///
    /// The database comes first: closing it waits for sessions still held by
    /// finishing requests, and those may touch the cache until they return.
    pub async fn on_shutdown(&self) {
        for resource in &self.resources {
            resource.close().await;
            tracing::info!(resource = resource.name(), "Closed");
        }
    }

    /// Snapshot of every resource's status, in registration order.
    pub async fn statuses(&self) -> Vec<(&'static str, ResourceStatus)> {
        let mut out = Vec::with_capacity(self.resources.len());
        for resource in &self.resources {
            out.push((resource.name(), resource.status().await));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Journal = Arc<Mutex<Vec<String>>>;

    struct Recording {
        name: &'static str,
        fail: bool,
        journal: Journal,
        status: Mutex<ResourceStatus>,
    }

    impl Recording {
        fn new(name: &'static str, fail: bool, journal: &Journal) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                journal: journal.clone(),
                status: Mutex::new(ResourceStatus::Uninitialized),
            })
        }
    }

    #[async_trait]
    impl ManagedResource for Recording {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn status(&self) -> ResourceStatus {
            *self.status.lock().unwrap()
        }

        async fn init(&self) -> Result<(), BoxError> {
            self.journal.lock().unwrap().push(format!("init {}", self.name));
            if self.fail {
                return Err("unreachable".into());
            }
            *self.status.lock().unwrap() = ResourceStatus::Ready;
            Ok(())
        }

        async fn close(&self) {
            self.journal.lock().unwrap().push(format!("close {}", self.name));
            *self.status.lock().unwrap() = ResourceStatus::Closed;
        }
    }

    #[tokio::test]
    async fn startup_then_shutdown_order() {
        let journal = Journal::default();
        let lifecycle = Lifecycle::new()
            .with(Recording::new("database", false, &journal))
            .with(Recording::new("cache", false, &journal));

        lifecycle.on_startup().await.unwrap();
        assert_eq!(
            lifecycle.statuses().await,
            vec![
                ("database", ResourceStatus::Ready),
                ("cache", ResourceStatus::Ready)
            ]
        );

        lifecycle.on_shutdown().await;
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["init database", "init cache", "close database", "close cache"]
        );
    }

    #[tokio::test]
    async fn failed_first_step_aborts_remaining_startup() {
        let journal = Journal::default();
        let cache = Recording::new("cache", false, &journal);
        let lifecycle = Lifecycle::new()
            .with(Recording::new("database", true, &journal))
            .with(cache.clone());

        let err = lifecycle.on_startup().await.unwrap_err();
        let LifecycleError::Startup { resource, .. } = &err;
        assert_eq!(*resource, "database");
        assert!(err.to_string().contains("unreachable"));

        assert_eq!(*journal.lock().unwrap(), vec!["init database"]);
        assert_eq!(cache.status().await, ResourceStatus::Uninitialized);
    }

    #[tokio::test]
    async fn failed_later_step_closes_earlier_resources() {
        let journal = Journal::default();
        let lifecycle = Lifecycle::new()
            .with(Recording::new("database", false, &journal))
            .with(Recording::new("cache", true, &journal));

        assert!(lifecycle.on_startup().await.is_err());
        assert_eq!(
            *journal.lock().unwrap(),
            vec!["init database", "init cache", "close database"]
        );
    }
}

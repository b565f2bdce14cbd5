//! paddybot-server: HTTP service scaffold
//!
//! Wires a lazily connected Postgres pool and an eagerly checked Redis
//! connection into an axum router. Handlers get one transaction per request
//! from the session broker in [`db`]; the host in [`http::server`] runs the
//! [`lifecycle`] around the listener.

pub mod cache;
pub mod db;
pub mod http;
pub mod lifecycle;
pub mod models;
pub mod serializers;

pub use cache::{CacheError, CacheManager};
pub use db::{DatabasePool, DbError};
pub use http::{build_router, run_server, ApiError, AppState, ServerError};
pub use lifecycle::{Lifecycle, LifecycleError, ManagedResource, ResourceStatus};

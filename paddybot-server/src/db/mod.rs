//! Database layer - pool manager, session broker and repositories
//!
//! # Design Principles
//!
//! - One pool per process, created at startup and closed at shutdown
//! - One transaction per request, finalized by the broker
//! - Rely on DB constraints, handle conflicts - no check-then-insert
//! - Schema changes are applied out-of-band (`migrations/`)

pub mod error;
pub mod pool;
pub mod repos;
pub mod session;

pub use error::DbError;
pub use pool::{create_pool, DatabasePool};
pub use repos::*;
pub use session::{with_session, DbSession, SessionSource, SessionState, Transactional};

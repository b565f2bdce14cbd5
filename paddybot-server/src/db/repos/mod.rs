//! Repository implementations for database access
//!
//! Repositories borrow a session's connection, so every query they run
//! belongs to the request's transaction.

pub mod users;

pub use users::{User, UserRepo};

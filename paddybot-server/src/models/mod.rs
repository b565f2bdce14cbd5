//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod pagination;
pub mod user;
pub mod validation;

pub use pagination::{calculate_pagination, offset_limit, Pagination, PaginationMeta, PaginationParams};
pub use user::{full_name, Email, NewUser, Password, UserChanges, Username};
pub use validation::ValidationError;

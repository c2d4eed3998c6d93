//! Credential store implementations
//!
//! Provides the data access layer for user records.

pub mod memory;
pub mod user;

pub use memory::InMemoryUserStore;
pub use user::{CreateUserError, NewUser, PgUserStore, UserRecord, UserStore};

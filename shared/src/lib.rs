//! Account Auth Shared Library
//!
//! Request/response types and validation helpers shared between the
//! backend and its clients.

pub mod types;
pub mod validation;

pub use types::*;

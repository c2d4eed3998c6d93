//! Account Auth Backend Library
//!
//! Registration, login and session tokens for user accounts. Exposed as a
//! library so the integration tests can build the router directly.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;

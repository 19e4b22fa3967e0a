//! Auth
//!
//! Session management lives outside this system; the boundary consumed
//! here is "resolve the current customer from a bearer token". Tokens
//! are issued by the admin CLI and stored as SHA-256 hashes.

pub mod errors;
pub mod models;
mod repository;
pub mod service;
pub mod token;

pub use errors::AuthServiceError;
pub use service::*;

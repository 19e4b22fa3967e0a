//! Carts

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::CartsServiceError;
pub(crate) use repository::{PgCartItemsRepository, PgCartsRepository};
pub use service::*;

//! Catalog

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::CatalogServiceError;
pub(crate) use repository::PgCatalogRepository;
pub use service::*;

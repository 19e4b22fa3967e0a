//! Wallet

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::WalletServiceError;
pub(crate) use repository::PgWalletRepository;
pub use service::*;

//! Payments
//!
//! The three payment paths: wallet balance, cash on delivery, and the
//! external card/UPI gateway.

pub mod errors;
pub mod gateway;
pub mod models;
pub(crate) mod strategy;

pub use errors::GatewayError;
pub use gateway::{
    GatewayConfig, GatewaySecret, HttpPaymentGateway, MockPaymentGateway, PaymentGateway,
};

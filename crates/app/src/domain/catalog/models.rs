//! Catalog Models

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Product UUID
pub type ProductUuid = TypedUuid<Product>;

/// Product Model
#[derive(Debug, Clone)]
pub struct Product {
    pub uuid: ProductUuid,
    pub name: String,
    pub list_price: u64,
    pub sale_price: u64,
    /// Seasonal/category offer percentage, if one is running.
    pub offer_pct: Option<u8>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

/// Stock level for one (product, size).
#[derive(Debug, Clone)]
pub struct StockLevel {
    pub product_uuid: ProductUuid,
    pub size: String,
    pub stock: u64,
}

/// New Product Model
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub list_price: u64,
    pub sale_price: u64,
    pub offer_pct: Option<u8>,
}

//! Customer Models

use jiff::Timestamp;

use crate::uuids::TypedUuid;

/// Customer UUID
pub type CustomerUuid = TypedUuid<Customer>;

/// Address UUID
pub type AddressUuid = TypedUuid<Address>;

/// Customer Model
#[derive(Debug, Clone)]
pub struct Customer {
    pub uuid: CustomerUuid,
    pub name: String,
    pub is_admin: bool,
    /// Unspent referral credit, minor currency units. Consumed at
    /// checkout as the referral bonus discount.
    pub referral_credit: u64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// New Customer Model
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub uuid: CustomerUuid,
    pub name: String,
    pub token_hash: String,
    pub is_admin: bool,
}

/// Shipping address, owned by a customer. Snapshotted into orders at
/// checkout; the order keeps its copy even if this row later changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub uuid: AddressUuid,
    pub customer_uuid: CustomerUuid,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
}

/// New Address Model
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub uuid: AddressUuid,
    pub customer_uuid: CustomerUuid,
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
}

//! Auth Models

use crate::domain::customers::models::CustomerUuid;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub customer: CustomerUuid,
    pub is_admin: bool,
}

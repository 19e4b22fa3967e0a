//! Depot helper extensions.

use std::any::Any;

use salvo::prelude::{Depot, StatusError};

use kitbag_app::{auth::models::Identity, domain::customers::models::CustomerUuid};

const IDENTITY_KEY: &str = "kitbag.identity";

/// Helpers for pulling request state out of the depot.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError>;

    fn insert_identity(&mut self, identity: Identity);

    fn identity_or_401(&self) -> Result<Identity, StatusError>;

    fn customer_uuid_or_401(&self) -> Result<CustomerUuid, StatusError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, StatusError> {
        self.obtain::<T>()
            .map_err(|_ignored| StatusError::internal_server_error())
    }

    fn insert_identity(&mut self, identity: Identity) {
        self.insert(IDENTITY_KEY, identity);
    }

    fn identity_or_401(&self) -> Result<Identity, StatusError> {
        self.get::<Identity>(IDENTITY_KEY)
            .copied()
            .map_err(|_ignored| StatusError::unauthorized())
    }

    fn customer_uuid_or_401(&self) -> Result<CustomerUuid, StatusError> {
        self.identity_or_401().map(|identity| identity.customer)
    }
}

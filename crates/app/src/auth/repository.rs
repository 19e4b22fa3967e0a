//! Auth Repository

use sqlx::{FromRow, PgPool, Postgres, Row, postgres::PgRow, query_as};

use crate::{auth::models::Identity, domain::customers::models::CustomerUuid};

const FIND_IDENTITY_SQL: &str = include_str!("sql/find_identity_by_token_hash.sql");

#[derive(Debug, Clone)]
pub(crate) struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    #[must_use]
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) async fn find_identity_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Identity>, sqlx::Error> {
        query_as::<Postgres, Identity>(FIND_IDENTITY_SQL)
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for Identity {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            customer: CustomerUuid::from_uuid(row.try_get("uuid")?),
            is_admin: row.try_get("is_admin")?,
        })
    }
}

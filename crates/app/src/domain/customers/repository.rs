//! Customers Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::{
    database::try_get_amount,
    domain::customers::models::{
        Address, AddressUuid, Customer, CustomerUuid, NewAddress, NewCustomer,
    },
};

const GET_CUSTOMER_SQL: &str = include_str!("sql/get_customer.sql");
const LOCK_CUSTOMER_SQL: &str = include_str!("sql/lock_customer.sql");
const CREATE_CUSTOMER_SQL: &str = include_str!("sql/create_customer.sql");
const CONSUME_REFERRAL_CREDIT_SQL: &str = include_str!("sql/consume_referral_credit.sql");
const RESTORE_REFERRAL_CREDIT_SQL: &str = include_str!("sql/restore_referral_credit.sql");
const GET_ADDRESS_SQL: &str = include_str!("sql/get_address.sql");
const CREATE_ADDRESS_SQL: &str = include_str!("sql/create_address.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCustomersRepository;

impl PgCustomersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_customer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<Customer, sqlx::Error> {
        query_as::<Postgres, Customer>(GET_CUSTOMER_SQL)
            .bind(customer.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Take a row lock on the customer, serialising wallet and referral
    /// credit mutations for that customer within the transaction.
    pub(crate) async fn lock_customer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
    ) -> Result<(), sqlx::Error> {
        query(LOCK_CUSTOMER_SQL)
            .bind(customer.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn create_customer(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: &NewCustomer,
    ) -> Result<Customer, sqlx::Error> {
        query_as::<Postgres, Customer>(CREATE_CUSTOMER_SQL)
            .bind(customer.uuid.into_uuid())
            .bind(&customer.name)
            .bind(&customer.token_hash)
            .bind(customer.is_admin)
            .fetch_one(&mut **tx)
            .await
    }

    /// Conditionally spend referral credit. Returns `false` when the
    /// customer does not hold `amount` of credit; nothing changes then.
    pub(crate) async fn consume_referral_credit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        amount: u64,
    ) -> Result<bool, sqlx::Error> {
        let amount = i64::try_from(amount).map_err(|e| sqlx::Error::ColumnDecode {
            index: "referral_credit".to_string(),
            source: Box::new(e),
        })?;

        let rows_affected = query(CONSUME_REFERRAL_CREDIT_SQL)
            .bind(customer.into_uuid())
            .bind(amount)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(crate) async fn restore_referral_credit(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        amount: u64,
    ) -> Result<(), sqlx::Error> {
        let amount = i64::try_from(amount).map_err(|e| sqlx::Error::ColumnDecode {
            index: "referral_credit".to_string(),
            source: Box::new(e),
        })?;

        query(RESTORE_REFERRAL_CREDIT_SQL)
            .bind(customer.into_uuid())
            .bind(amount)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn get_address(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        customer: CustomerUuid,
        address: AddressUuid,
    ) -> Result<Address, sqlx::Error> {
        query_as::<Postgres, Address>(GET_ADDRESS_SQL)
            .bind(address.into_uuid())
            .bind(customer.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_address(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        address: &NewAddress,
    ) -> Result<Address, sqlx::Error> {
        query_as::<Postgres, Address>(CREATE_ADDRESS_SQL)
            .bind(address.uuid.into_uuid())
            .bind(address.customer_uuid.into_uuid())
            .bind(&address.recipient)
            .bind(&address.line1)
            .bind(address.line2.as_deref())
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.postal_code)
            .bind(&address.phone)
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for Customer {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CustomerUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            is_admin: row.try_get("is_admin")?,
            referral_credit: try_get_amount(row, "referral_credit")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Address {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: AddressUuid::from_uuid(row.try_get("uuid")?),
            customer_uuid: CustomerUuid::from_uuid(row.try_get("customer_uuid")?),
            recipient: row.try_get("recipient")?,
            line1: row.try_get("line1")?,
            line2: row.try_get("line2")?,
            city: row.try_get("city")?,
            state: row.try_get("state")?,
            postal_code: row.try_get("postal_code")?,
            phone: row.try_get("phone")?,
        })
    }
}

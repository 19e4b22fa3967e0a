//! Catalog Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};

use crate::{
    database::{try_amount_param, try_get_amount},
    domain::catalog::models::{NewProduct, Product, ProductUuid, StockLevel},
};

const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const GET_STOCK_SQL: &str = include_str!("sql/get_stock.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const UPSERT_STOCK_SQL: &str = include_str!("sql/upsert_stock.sql");
const RESERVE_STOCK_SQL: &str = include_str!("sql/reserve_stock.sql");
const RESTOCK_SQL: &str = include_str!("sql/restock.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCatalogRepository;

impl PgCatalogRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        size: &str,
    ) -> Result<StockLevel, sqlx::Error> {
        query_as::<Postgres, StockLevel>(GET_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(size)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: &NewProduct,
    ) -> Result<Product, sqlx::Error> {
        let list_price = try_amount_param(product.list_price, "list_price")?;
        let sale_price = try_amount_param(product.sale_price, "sale_price")?;

        query_as::<Postgres, Product>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(&product.name)
            .bind(list_price)
            .bind(sale_price)
            .bind(product.offer_pct.map(i16::from))
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn upsert_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        size: &str,
        stock: u64,
    ) -> Result<(), sqlx::Error> {
        let stock = try_amount_param(stock, "stock")?;

        query(UPSERT_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(size)
            .bind(stock)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Conditionally decrement stock. Returns `false` when fewer than
    /// `quantity` units remain; nothing is changed in that case.
    pub(crate) async fn reserve_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        size: &str,
        quantity: u32,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = query(RESERVE_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(size)
            .bind(i64::from(quantity))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(crate) async fn restock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        size: &str,
        quantity: u32,
    ) -> Result<(), sqlx::Error> {
        query(RESTOCK_SQL)
            .bind(product.into_uuid())
            .bind(size)
            .bind(i64::from(quantity))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let offer_pct: Option<i16> = row.try_get("offer_pct")?;

        let offer_pct = offer_pct
            .map(|pct| {
                u8::try_from(pct).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "offer_pct".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()?;

        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            list_price: try_get_amount(row, "list_price")?,
            sale_price: try_get_amount(row, "sale_price")?,
            offer_pct,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
            deleted_at: row
                .try_get::<Option<SqlxTimestamp>, _>("deleted_at")?
                .map(SqlxTimestamp::to_jiff),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for StockLevel {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            size: row.try_get("size")?,
            stock: try_get_amount(row, "stock")?,
        })
    }
}

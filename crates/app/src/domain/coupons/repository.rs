//! Coupons Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};

use crate::{
    database::{try_amount_param, try_get_amount},
    domain::{
        coupons::models::{Coupon, CouponUuid, NewCoupon},
        customers::models::CustomerUuid,
        orders::models::OrderUuid,
        pricing::models::CouponKind,
    },
};

const FIND_BY_CODE_SQL: &str = include_str!("sql/find_by_code.sql");
const COUNT_CUSTOMER_REDEMPTIONS_SQL: &str = include_str!("sql/count_customer_redemptions.sql");
const CONSUME_SQL: &str = include_str!("sql/consume.sql");
const CREATE_REDEMPTION_SQL: &str = include_str!("sql/create_redemption.sql");
const CREATE_COUPON_SQL: &str = include_str!("sql/create_coupon.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCouponsRepository;

impl PgCouponsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn find_by_code(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        code: &str,
    ) -> Result<Option<Coupon>, sqlx::Error> {
        query_as::<Postgres, Coupon>(FIND_BY_CODE_SQL)
            .bind(code.to_uppercase())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn count_customer_redemptions(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        customer: CustomerUuid,
    ) -> Result<u32, sqlx::Error> {
        let count: i64 = query_scalar(COUNT_CUSTOMER_REDEMPTIONS_SQL)
            .bind(coupon.into_uuid())
            .bind(customer.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Record a redemption against an order. When `enforce_limit` is set
    /// the global counter increment is guarded by `usage_limit` and
    /// `false` is returned (with nothing changed) once the budget is
    /// spent.
    pub(crate) async fn consume(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: CouponUuid,
        order: OrderUuid,
        customer: CustomerUuid,
        enforce_limit: bool,
    ) -> Result<bool, sqlx::Error> {
        let rows_affected = query(CONSUME_SQL)
            .bind(coupon.into_uuid())
            .bind(enforce_limit)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Ok(false);
        }

        query(CREATE_REDEMPTION_SQL)
            .bind(coupon.into_uuid())
            .bind(order.into_uuid())
            .bind(customer.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(true)
    }

    pub(crate) async fn create_coupon(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        coupon: &NewCoupon,
    ) -> Result<Coupon, sqlx::Error> {
        let value = try_amount_param(coupon.value, "value")?;
        let min_purchase = try_amount_param(coupon.min_purchase, "min_purchase")?;

        let max_discount = coupon
            .max_discount
            .map(|cap| try_amount_param(cap, "max_discount"))
            .transpose()?;

        query_as::<Postgres, Coupon>(CREATE_COUPON_SQL)
            .bind(coupon.uuid.into_uuid())
            .bind(coupon.code.to_uppercase())
            .bind(coupon.kind.as_str())
            .bind(value)
            .bind(min_purchase)
            .bind(max_discount)
            .bind(coupon.usage_limit.map(i64::from))
            .bind(i64::from(coupon.per_user_limit))
            .bind(SqlxTimestamp::from(coupon.starts_at))
            .bind(SqlxTimestamp::from(coupon.expires_at))
            .fetch_one(&mut **tx)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for Coupon {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let kind: String = row.try_get("kind")?;

        let kind = match kind.as_str() {
            "FIXED" => CouponKind::Fixed,
            "PERCENTAGE" => CouponKind::Percentage,
            other => {
                return Err(sqlx::Error::ColumnDecode {
                    index: "kind".to_string(),
                    source: format!("unknown coupon kind {other:?}").into(),
                });
            }
        };

        Ok(Self {
            uuid: CouponUuid::from_uuid(row.try_get("uuid")?),
            code: row.try_get("code")?,
            kind,
            value: try_get_amount(row, "value")?,
            min_purchase: try_get_amount(row, "min_purchase")?,
            max_discount: row
                .try_get::<Option<i64>, _>("max_discount")?
                .map(|cap| {
                    u64::try_from(cap).map_err(|e| sqlx::Error::ColumnDecode {
                        index: "max_discount".to_string(),
                        source: Box::new(e),
                    })
                })
                .transpose()?,
            usage_limit: row
                .try_get::<Option<i32>, _>("usage_limit")?
                .map(|limit| u32::try_from(limit).unwrap_or(0)),
            per_user_limit: u32::try_from(row.try_get::<i32, _>("per_user_limit")?).unwrap_or(1),
            starts_at: row.try_get::<SqlxTimestamp, _>("starts_at")?.to_jiff(),
            expires_at: row.try_get::<SqlxTimestamp, _>("expires_at")?.to_jiff(),
            active: row.try_get("active")?,
            used_count: u32::try_from(row.try_get::<i32, _>("used_count")?).unwrap_or(0),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

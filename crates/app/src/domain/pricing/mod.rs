//! Pricing Engine
//!
//! Pure price computation for a set of cart lines plus an optional coupon.
//! Performs no I/O; re-running with the same inputs yields the same
//! breakdown.

pub mod errors;
pub mod models;

use jiff::Timestamp;

pub use errors::{CouponRejection, PricingError};
pub use models::{CouponKind, CouponTerms, DeliveryPolicy, PriceBreakdown, PricedLine};

/// Price a set of lines.
///
/// `subtotal` is the gross (list price) value, `discount` the markdown to
/// sale price, `special_discount` the seasonal offer on the sale value.
/// The coupon is validated against the payable base after markdown and
/// offers; rejections are always surfaced, never silently dropped.
///
/// # Errors
///
/// Returns [`PricingError::Coupon`] when the coupon does not qualify and
/// [`PricingError::AmountOverflow`] if any intermediate sum exceeds `u64`.
pub fn quote(
    lines: &[PricedLine],
    coupon: Option<&CouponTerms>,
    referral_credit: u64,
    now: Timestamp,
    policy: &DeliveryPolicy,
) -> Result<PriceBreakdown, PricingError> {
    let mut subtotal: u64 = 0;
    let mut discount: u64 = 0;
    let mut special_discount: u64 = 0;

    for line in lines {
        let quantity = u64::from(line.quantity);

        let gross = line
            .list_price
            .checked_mul(quantity)
            .ok_or(PricingError::AmountOverflow)?;

        let markdown = line
            .list_price
            .saturating_sub(line.sale_price)
            .checked_mul(quantity)
            .ok_or(PricingError::AmountOverflow)?;

        let offer = (line.sale_price * u64::from(line.offer_pct) / 100)
            .checked_mul(quantity)
            .ok_or(PricingError::AmountOverflow)?;

        subtotal = subtotal.checked_add(gross).ok_or(PricingError::AmountOverflow)?;
        discount = discount.checked_add(markdown).ok_or(PricingError::AmountOverflow)?;
        special_discount = special_discount
            .checked_add(offer)
            .ok_or(PricingError::AmountOverflow)?;
    }

    let payable = subtotal - discount - special_discount;

    let coupon_discount = match coupon {
        Some(terms) => coupon_discount(terms, payable, now)?,
        None => 0,
    };

    let after_coupon = payable - coupon_discount;
    let referral_bonus = referral_credit.min(after_coupon);
    let fee_base = after_coupon - referral_bonus;

    let delivery_fee = policy.fee_for(after_coupon);

    Ok(PriceBreakdown {
        subtotal,
        discount,
        special_discount,
        coupon_discount,
        referral_bonus,
        delivery_fee,
        total: fee_base + delivery_fee,
    })
}

/// Validate a coupon against the payable base and compute its discount.
fn coupon_discount(
    terms: &CouponTerms,
    payable: u64,
    now: Timestamp,
) -> Result<u64, PricingError> {
    if !terms.active {
        return Err(CouponRejection::Inactive.into());
    }

    if now < terms.starts_at {
        return Err(CouponRejection::NotStarted.into());
    }

    if now > terms.expires_at {
        return Err(CouponRejection::Expired.into());
    }

    if payable < terms.min_purchase {
        return Err(CouponRejection::MinPurchaseNotMet {
            required: terms.min_purchase,
        }
        .into());
    }

    if terms
        .usage_limit
        .is_some_and(|limit| terms.used_count >= limit)
    {
        return Err(CouponRejection::UsageLimitExhausted.into());
    }

    if terms.used_by_customer >= terms.per_user_limit {
        return Err(CouponRejection::PerUserLimitExhausted.into());
    }

    let raw = match terms.kind {
        CouponKind::Fixed => terms.value,
        CouponKind::Percentage => {
            let pct = payable
                .checked_mul(terms.value)
                .ok_or(PricingError::AmountOverflow)?
                / 100;

            match terms.max_discount {
                Some(cap) => pct.min(cap),
                None => pct,
            }
        }
    };

    Ok(raw.min(payable))
}

/// An item's share of an order-level deduction (coupon, offer, referral),
/// prorated by sale value. Used when refunding a single cancelled or
/// returned item so that the sum of per-item refunds never exceeds the
/// amount actually paid.
#[must_use]
pub fn prorated_deduction(item_sale_value: u64, order_sale_value: u64, deduction: u64) -> u64 {
    if order_sale_value == 0 {
        return 0;
    }

    // u128 to avoid overflow on the cross product.
    let share = u128::from(item_sale_value) * u128::from(deduction) / u128::from(order_sale_value);

    u64::try_from(share).unwrap_or(deduction)
}

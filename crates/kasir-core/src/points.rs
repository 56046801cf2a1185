//! # Loyalty Points
//!
//! Redemption and earning rules for member points.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Checkout with points_to_use = 3, two lines                             │
//! │                                                                         │
//! │   line A: Rp30.000 ──► floor(3 × 30.000 / 40.000) = 2 points            │
//! │   line B: Rp10.000 ──► floor(3 × 10.000 / 40.000) = 0 points            │
//! │                                           ───────────────────           │
//! │                        allocated 2, unallocated 1 (reported)            │
//! │                                                                         │
//! │   cash keluar = 3 × Rp1.000 = Rp3.000 (the full redemption)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The per-line split is floor division. The remainder is not pushed onto
//! any line; callers surface it as `unallocated_points`.

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::{POINT_EARN_STEP_RUPIAH, POINT_VALUE_RUPIAH};

/// Rupiah value of `points` when redeemed.
#[inline]
pub fn redemption_value(points: i64) -> Money {
    Money::from_rupiah(points * POINT_VALUE_RUPIAH)
}

/// Points actually redeemed, given the business feature flag.
///
/// A disabled feature redeems nothing regardless of the request.
#[inline]
pub fn effective_redemption(points_enabled: bool, requested: i64) -> i64 {
    if points_enabled {
        requested.max(0)
    } else {
        0
    }
}

/// Splits `points` across lines proportionally to each line's subtotal.
///
/// `line_points[i] = floor(points × line[i] / Σ line)`. The sum of the
/// result is at most `points` and falls short by less than `lines.len()`.
/// An empty or zero-valued order allocates nothing.
pub fn allocate_points(line_subtotals: &[Money], points: i64) -> Vec<i64> {
    let order_subtotal: Money = line_subtotals.iter().sum();
    if points <= 0 || !order_subtotal.is_positive() {
        return vec![0; line_subtotals.len()];
    }

    line_subtotals
        .iter()
        .map(|line| {
            (points as i128 * line.rupiah() as i128 / order_subtotal.rupiah() as i128) as i64
        })
        .collect()
}

/// Points earned on a post-discount amount: one per full Rp10.000.
#[inline]
pub fn points_earned(amount: Money) -> i64 {
    if amount.is_positive() {
        amount.rupiah() / POINT_EARN_STEP_RUPIAH
    } else {
        0
    }
}

/// Checks a redemption request against the member and the order.
///
/// Only called when the feature is enabled and `requested > 0`.
pub fn validate_redemption(
    requested: i64,
    has_member: bool,
    balance: i64,
    order_subtotal: Money,
) -> CoreResult<()> {
    if !has_member {
        return Err(CoreError::MemberRequired);
    }
    if requested > balance {
        return Err(CoreError::InsufficientPoints { balance, requested });
    }
    if redemption_value(requested) > order_subtotal {
        return Err(CoreError::RedemptionExceedsTotal {
            points: requested,
            subtotal: order_subtotal.rupiah(),
        });
    }
    Ok(())
}

//! Refund math for returned transaction lines (retur).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Transaction, TransactionStatus};
use crate::validation::validate_quantity;

/// What a return against one line will do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReturnPlan {
    pub quantity: i64,
    /// `floor(line.total × quantity / line.quantity)`.
    pub refund: Money,
    /// Quantity still returnable after this return.
    pub remaining_after: i64,
    /// True when this return brings the line to zero remaining.
    pub fully_returned: bool,
}

/// Quantity still returnable on a line.
#[inline]
pub fn remaining_quantity(line_quantity: i64, already_returned: i64) -> i64 {
    (line_quantity - already_returned).max(0)
}

/// Refund for `quantity` units of a line, pro rata on the post-discount
/// total.
pub fn refund_amount(line_total: Money, line_quantity: i64, quantity: i64) -> Money {
    line_total.proportion(quantity, line_quantity)
}

/// Plans a return of `quantity` units against `line`.
pub fn plan_return(line: &Transaction, already_returned: i64, quantity: i64) -> CoreResult<ReturnPlan> {
    validate_quantity(quantity)?;

    let remaining = match line.status {
        TransactionStatus::Returned => 0,
        TransactionStatus::Completed => remaining_quantity(line.quantity, already_returned),
    };
    if quantity > remaining {
        return Err(CoreError::ReturnExceedsQuantity {
            remaining,
            requested: quantity,
        });
    }

    let remaining_after = remaining - quantity;
    Ok(ReturnPlan {
        quantity,
        refund: refund_amount(line.total_money(), line.quantity, quantity),
        remaining_after,
        fully_returned: remaining_after == 0,
    })
}

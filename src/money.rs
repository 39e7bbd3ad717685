use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{PlanError, PlanResult};

/// Amount in minor currency units (fen/cents).
pub type Cents = i64;

/// Converts a major-unit amount (e.g. yuan) to cents, dropping any fraction
/// of a cent.
pub fn to_cents(amount: Decimal) -> PlanResult<Cents> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|c| c.trunc().to_i64())
        .ok_or_else(|| PlanError::overflow("amount to cents conversion"))
}

/// Major-unit value of `cents`, with two decimal places.
pub fn to_major(cents: Cents) -> Decimal {
    Decimal::new(cents, 2)
}

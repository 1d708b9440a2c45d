//! Weight budget rules for weighted-rotation links.
//!
//! The storage layer runs this check inside the same transaction as the
//! write, so two racing edits cannot both observe a stale sum.

use thiserror::Error;

/// Maximum combined weight across one user's weighted links.
pub const WEIGHT_BUDGET: i64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WeightBudgetError {
    #[error("weight must be between 1 and 100, got {0}")]
    OutOfRange(i64),
    #[error("weight is required for weighted rotation")]
    Missing,
    #[error(
        "weight budget exceeded: other weighted links total {current}, \
         adding {attempted} would bring the total to {}",
        .current + .attempted
    )]
    Exceeded { current: i64, attempted: i64 },
}

/// Validate a new or updated weight against the sum over the user's *other*
/// weighted links (the link being edited must already be excluded from
/// `current_sum`).
pub fn check_weight_budget(
    weight: Option<i64>,
    current_sum: i64,
) -> Result<i64, WeightBudgetError> {
    let weight = weight.ok_or(WeightBudgetError::Missing)?;
    if !(1..=WEIGHT_BUDGET).contains(&weight) {
        return Err(WeightBudgetError::OutOfRange(weight));
    }
    if current_sum + weight > WEIGHT_BUDGET {
        return Err(WeightBudgetError::Exceeded {
            current: current_sum,
            attempted: weight,
        });
    }
    Ok(weight)
}

//! Link rotation policy evaluation and weight budget rules.

pub mod visibility;
pub mod weight;

pub use visibility::{is_visible, visible_links};
pub use weight::{check_weight_budget, WeightBudgetError, WEIGHT_BUDGET};

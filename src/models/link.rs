use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// How a link participates in profile rendering.
///
/// Kept as a closed enum so the visibility evaluator matches exhaustively
/// and a new policy is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RotationType {
    /// Shown whenever the link is active.
    Always,
    /// Shown whenever active; ordering/emphasis among random links is the
    /// renderer's business, visibility is never probabilistic.
    Random,
    /// Shown whenever active; `weight` is a relative display share exposed
    /// to the renderer, constrained by the per-user weight budget.
    Weighted,
    /// Shown only inside the `[schedule_start, schedule_end]` window.
    Scheduled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub type_id: Option<i64>,
    pub rotation_type: RotationType,
    /// Relative display weight (1-100), set only for weighted rotation.
    pub weight: Option<i64>,
    /// Schedule bounds as Unix milliseconds, both inclusive. A missing
    /// bound is unbounded on that side.
    pub schedule_start: Option<i64>,
    pub schedule_end: Option<i64>,
    pub is_active: bool,
    /// Dense 1-based display rank within the owner's link set.
    pub position: i64,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateLinkRequest {
    pub title: String,
    pub url: String,
    pub icon: Option<String>,
    pub type_id: Option<i64>,
    #[serde(default = "default_rotation")]
    pub rotation_type: RotationType,
    pub weight: Option<i64>,
    pub schedule_start: Option<i64>,
    pub schedule_end: Option<i64>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

fn default_rotation() -> RotationType {
    RotationType::Always
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLinkRequest {
    pub title: Option<String>,
    pub url: Option<String>,
    pub icon: Option<String>,
    pub type_id: Option<i64>,
    pub rotation_type: Option<RotationType>,
    pub weight: Option<i64>,
    pub schedule_start: Option<i64>,
    pub schedule_end: Option<i64>,
    pub is_active: Option<bool>,
    pub category: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<i64>,
}

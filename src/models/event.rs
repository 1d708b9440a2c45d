use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum EventType {
    ProfileView,
    LinkClick,
}

/// One immutable analytics event as stored. Never updated; deleted only by
/// the age-based prune or account deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalyticsEvent {
    pub id: i64,
    pub event_type: EventType,
    pub user_id: i64,
    /// Null for profile views and for social-media-platform clicks.
    pub link_id: Option<i64>,
    /// Set only for social-media clicks.
    pub platform: Option<String>,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub ip: Option<String>,
    pub ab_test_group: Option<String>,
    pub ts_millis: i64,
}

/// Event fields resolved by the ingestion pipeline, ready to persist.
#[derive(Debug, Clone)]
pub struct NewAnalyticsEvent {
    pub event_type: EventType,
    pub user_id: i64,
    pub link_id: Option<i64>,
    pub platform: Option<String>,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub ip: Option<String>,
    pub ab_test_group: Option<String>,
    pub ts_millis: i64,
}

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::analytics::models::{DimensionCounts, LinkClicks, PlatformClicks, TimeRange};
use crate::links::WeightBudgetError;
use crate::models::{
    CreateLinkRequest, EventType, Link, NewAnalyticsEvent, UpdateLinkRequest, User,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    WeightBudget(#[from] WeightBudgetError),
    #[error("duplicate entry")]
    Conflict,
    #[error("not found")]
    NotFound,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// One day bucket as it comes back from storage: day index (Unix days,
/// `ts_millis / 86_400_000`), view count, click count. Days with no
/// activity are absent; the aggregator zero-fills them.
pub type DailyCountsRow = (i64, i64, i64);

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, indexes).
    async fn init(&self) -> Result<()>;

    // --- users ---

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        api_token: &str,
    ) -> StorageResult<User>;

    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Resolve the dashboard user from an opaque bearer token.
    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>>;

    /// Mark the user matched by email premium and attach the billing
    /// customer id. Returns rows affected; zero means no such user, which
    /// callers treat as a no-op.
    async fn set_premium_by_email(&self, email: &str, customer_id: &str) -> Result<u64>;

    /// Set the premium flag on the user matched by billing customer id.
    /// Returns rows affected.
    async fn set_premium_by_customer(&self, customer_id: &str, premium: bool) -> Result<u64>;

    /// Manual premium override by email; used only by the admin CLI.
    /// Returns rows affected.
    async fn override_premium(&self, email: &str, premium: bool) -> Result<u64>;

    /// Delete a user and everything they own (links, analytics events,
    /// campaign memberships).
    async fn delete_user(&self, id: i64) -> Result<bool>;

    // --- links ---

    /// Create a link at the next display position. When the rotation type
    /// is weighted, the weight budget check runs inside the same
    /// transaction as the insert.
    async fn create_link(&self, user_id: i64, req: &CreateLinkRequest) -> StorageResult<Link>;

    /// Merge a partial update into a link owned by `user_id`. Weight budget
    /// is re-checked transactionally whenever the resulting rotation type
    /// is weighted.
    async fn update_link(
        &self,
        user_id: i64,
        link_id: i64,
        req: &UpdateLinkRequest,
    ) -> StorageResult<Link>;

    async fn delete_link(&self, user_id: i64, link_id: i64) -> Result<bool>;

    async fn get_link(&self, link_id: i64) -> Result<Option<Link>>;

    /// All of a user's links in display order.
    async fn list_links(&self, user_id: i64) -> Result<Vec<Link>>;

    async fn count_links(&self, user_id: i64) -> Result<i64>;

    /// Reassign positions so `ids[i]` gets position `i + 1`, scoped to the
    /// owner. Ids not owned by the user are ignored.
    async fn reorder_links(&self, user_id: i64, ids: &[i64]) -> Result<()>;

    // --- analytics events ---

    async fn insert_event(&self, event: &NewAnalyticsEvent) -> Result<()>;

    async fn count_events(
        &self,
        user_id: i64,
        event_type: EventType,
        range: TimeRange,
    ) -> Result<i64>;

    /// Per-link click counts in range, joined with the current link title,
    /// most-clicked first.
    async fn per_link_clicks(&self, user_id: i64, range: TimeRange) -> Result<Vec<LinkClicks>>;

    /// Distinct non-null IPs among profile views in range.
    async fn distinct_view_ips(&self, user_id: i64, range: TimeRange) -> Result<i64>;

    /// Social-media click counts (clicks with no link id) grouped by
    /// platform.
    async fn platform_clicks(&self, user_id: i64, range: TimeRange) -> Result<Vec<PlatformClicks>>;

    /// Per-day view/click counts for days with activity in range.
    async fn daily_counts(&self, user_id: i64, range: TimeRange) -> Result<Vec<DailyCountsRow>>;

    /// View/click counts per raw country string, most active first.
    async fn counts_by_country(
        &self,
        user_id: i64,
        range: TimeRange,
    ) -> Result<Vec<DimensionCounts>>;

    /// View/click counts per raw referrer string, most active first.
    async fn counts_by_referrer(
        &self,
        user_id: i64,
        range: TimeRange,
    ) -> Result<Vec<DimensionCounts>>;

    /// Age-based cleanup, run only on explicit admin action. Returns the
    /// number of events removed.
    async fn prune_events_before(&self, ts_millis: i64) -> Result<u64>;

    // --- waitlist / campaigns ---

    /// Record a waitlist signup. A duplicate `(email, topic)` pair is a
    /// `Conflict`; the same email on a different topic is fine.
    async fn add_waitlist_entry(&self, email: &str, topic: &str) -> StorageResult<()>;

    /// Upsert one user's opt-in/opt-out state for a campaign. Never
    /// duplicates the `(user, campaign)` pair.
    async fn upsert_user_campaign(
        &self,
        user_id: i64,
        campaign_id: i64,
        joined: bool,
    ) -> Result<()>;
}

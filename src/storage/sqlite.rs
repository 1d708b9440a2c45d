use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::analytics::models::{DimensionCounts, LinkClicks, PlatformClicks, TimeRange};
use crate::links::check_weight_budget;
use crate::models::{
    CreateLinkRequest, EventType, Link, NewAnalyticsEvent, RotationType, UpdateLinkRequest, User,
};
use crate::storage::trait_def::DailyCountsRow;
use crate::storage::{Storage, StorageError, StorageResult};

const LINK_COLUMNS: &str = "id, user_id, title, url, icon, type_id, rotation_type, weight, \
     schedule_start, schedule_end, is_active, position, category, tags, created_at";

const USER_COLUMNS: &str =
    "id, username, email, api_token, premium, stripe_customer_id, created_at";

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                api_token TEXT NOT NULL UNIQUE,
                premium INTEGER NOT NULL DEFAULT 0,
                stripe_customer_id TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                url TEXT NOT NULL,
                icon TEXT,
                type_id INTEGER,
                rotation_type TEXT NOT NULL DEFAULT 'always',
                weight INTEGER,
                schedule_start INTEGER,
                schedule_end INTEGER,
                is_active INTEGER NOT NULL DEFAULT 1,
                position INTEGER NOT NULL,
                category TEXT,
                tags TEXT,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_links_user ON links(user_id)")
            .execute(self.pool.as_ref())
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analytics_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_type TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                link_id INTEGER,
                platform TEXT,
                referrer TEXT,
                country TEXT,
                ip TEXT,
                ab_test_group TEXT,
                ts_millis INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_events_user_ts ON analytics_events(user_id, ts_millis)",
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_campaigns (
                user_id INTEGER NOT NULL,
                campaign_id INTEGER NOT NULL,
                joined INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (user_id, campaign_id)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS waitlist (
                email TEXT NOT NULL,
                topic TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (email, topic)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn create_user(
        &self,
        username: &str,
        email: &str,
        api_token: &str,
    ) -> StorageResult<User> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO users (username, email, api_token, premium, created_at)
            VALUES (?, ?, ?, 0, ?)
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(api_token)
        .bind(Self::now_millis())
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(user)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(user)
    }

    async fn get_user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE api_token = ?"
        ))
        .bind(token)
        .fetch_optional(self.pool.as_ref())
        .await?;
        Ok(user)
    }

    async fn set_premium_by_email(&self, email: &str, customer_id: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET premium = 1, stripe_customer_id = ?
            WHERE email = ?
            "#,
        )
        .bind(customer_id)
        .bind(email)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn set_premium_by_customer(&self, customer_id: &str, premium: bool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET premium = ?
            WHERE stripe_customer_id = ?
            "#,
        )
        .bind(premium)
        .bind(customer_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected())
    }

    async fn override_premium(&self, email: &str, premium: bool) -> Result<u64> {
        let result = sqlx::query("UPDATE users SET premium = ? WHERE email = ?")
            .bind(premium)
            .bind(email)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM links WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM analytics_events WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_campaigns WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_link(&self, user_id: i64, req: &CreateLinkRequest) -> StorageResult<Link> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        // Weight budget check shares the insert's transaction, so a racing
        // edit cannot sneak past the sum.
        let weight = if req.rotation_type == RotationType::Weighted {
            let current: i64 = sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(weight), 0)
                FROM links
                WHERE user_id = ? AND rotation_type = 'weighted'
                "#,
            )
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

            Some(check_weight_budget(req.weight, current)?)
        } else {
            None
        };

        let position: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(position), 0) + 1 FROM links WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| StorageError::Other(e.into()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO links (
                user_id, title, url, icon, type_id, rotation_type, weight,
                schedule_start, schedule_end, is_active, position, category,
                tags, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(&req.title)
        .bind(&req.url)
        .bind(&req.icon)
        .bind(req.type_id)
        .bind(req.rotation_type)
        .bind(weight)
        .bind(req.schedule_start)
        .bind(req.schedule_end)
        .bind(position)
        .bind(&req.category)
        .bind(&req.tags)
        .bind(Self::now_millis())
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        let link =
            sqlx::query_as::<_, Link>(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?"))
                .bind(result.last_insert_rowid())
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| StorageError::Other(e.into()))?;

        tx.commit().await.map_err(|e| StorageError::Other(e.into()))?;
        Ok(link)
    }

    async fn update_link(
        &self,
        user_id: i64,
        link_id: i64,
        req: &UpdateLinkRequest,
    ) -> StorageResult<Link> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        let existing = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE id = ? AND user_id = ?"
        ))
        .bind(link_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| StorageError::Other(e.into()))?
        .ok_or(StorageError::NotFound)?;

        let rotation_type = req.rotation_type.unwrap_or(existing.rotation_type);

        // Switching away from weighted drops the stored weight, so the link
        // leaves future sum computations on its own.
        let weight = if rotation_type == RotationType::Weighted {
            let current: i64 = sqlx::query_scalar(
                r#"
                SELECT COALESCE(SUM(weight), 0)
                FROM links
                WHERE user_id = ? AND rotation_type = 'weighted' AND id != ?
                "#,
            )
            .bind(user_id)
            .bind(link_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

            Some(check_weight_budget(req.weight.or(existing.weight), current)?)
        } else {
            None
        };

        let title = req.title.clone().unwrap_or(existing.title);
        let url = req.url.clone().unwrap_or(existing.url);
        let icon = req.icon.clone().or(existing.icon);
        let type_id = req.type_id.or(existing.type_id);
        let schedule_start = req.schedule_start.or(existing.schedule_start);
        let schedule_end = req.schedule_end.or(existing.schedule_end);
        let is_active = req.is_active.unwrap_or(existing.is_active);
        let category = req.category.clone().or(existing.category);
        let tags = req.tags.clone().or(existing.tags);

        sqlx::query(
            r#"
            UPDATE links
            SET title = ?, url = ?, icon = ?, type_id = ?, rotation_type = ?,
                weight = ?, schedule_start = ?, schedule_end = ?, is_active = ?,
                category = ?, tags = ?
            WHERE id = ?
            "#,
        )
        .bind(&title)
        .bind(&url)
        .bind(&icon)
        .bind(type_id)
        .bind(rotation_type)
        .bind(weight)
        .bind(schedule_start)
        .bind(schedule_end)
        .bind(is_active)
        .bind(&category)
        .bind(&tags)
        .bind(link_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        let link =
            sqlx::query_as::<_, Link>(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?"))
                .bind(link_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| StorageError::Other(e.into()))?;

        tx.commit().await.map_err(|e| StorageError::Other(e.into()))?;
        Ok(link)
    }

    async fn delete_link(&self, user_id: i64, link_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM links WHERE id = ? AND user_id = ?")
            .bind(link_id)
            .bind(user_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_link(&self, link_id: i64) -> Result<Option<Link>> {
        let link =
            sqlx::query_as::<_, Link>(&format!("SELECT {LINK_COLUMNS} FROM links WHERE id = ?"))
                .bind(link_id)
                .fetch_optional(self.pool.as_ref())
                .await?;
        Ok(link)
    }

    async fn list_links(&self, user_id: i64) -> Result<Vec<Link>> {
        let links = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM links WHERE user_id = ? ORDER BY position ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool.as_ref())
        .await?;
        Ok(links)
    }

    async fn count_links(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool.as_ref())
            .await?;
        Ok(count)
    }

    async fn reorder_links(&self, user_id: i64, ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for (index, link_id) in ids.iter().enumerate() {
            sqlx::query("UPDATE links SET position = ? WHERE id = ? AND user_id = ?")
                .bind(index as i64 + 1)
                .bind(link_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_event(&self, event: &NewAnalyticsEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO analytics_events (
                event_type, user_id, link_id, platform, referrer, country,
                ip, ab_test_group, ts_millis
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.event_type)
        .bind(event.user_id)
        .bind(event.link_id)
        .bind(&event.platform)
        .bind(&event.referrer)
        .bind(&event.country)
        .bind(&event.ip)
        .bind(&event.ab_test_group)
        .bind(event.ts_millis)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn count_events(
        &self,
        user_id: i64,
        event_type: EventType,
        range: TimeRange,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM analytics_events
            WHERE user_id = ? AND event_type = ? AND ts_millis BETWEEN ? AND ?
            "#,
        )
        .bind(user_id)
        .bind(event_type)
        .bind(range.start_ms)
        .bind(range.end_ms)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn per_link_clicks(&self, user_id: i64, range: TimeRange) -> Result<Vec<LinkClicks>> {
        let rows = sqlx::query_as::<_, LinkClicks>(
            r#"
            SELECT e.link_id AS link_id, l.title AS title, COUNT(*) AS clicks
            FROM analytics_events e
            LEFT JOIN links l ON l.id = e.link_id
            WHERE e.user_id = ? AND e.event_type = ? AND e.link_id IS NOT NULL
              AND e.ts_millis BETWEEN ? AND ?
            GROUP BY e.link_id
            ORDER BY clicks DESC
            "#,
        )
        .bind(user_id)
        .bind(EventType::LinkClick)
        .bind(range.start_ms)
        .bind(range.end_ms)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn distinct_view_ips(&self, user_id: i64, range: TimeRange) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(DISTINCT ip)
            FROM analytics_events
            WHERE user_id = ? AND event_type = ? AND ip IS NOT NULL
              AND ts_millis BETWEEN ? AND ?
            "#,
        )
        .bind(user_id)
        .bind(EventType::ProfileView)
        .bind(range.start_ms)
        .bind(range.end_ms)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(count)
    }

    async fn platform_clicks(
        &self,
        user_id: i64,
        range: TimeRange,
    ) -> Result<Vec<PlatformClicks>> {
        let rows = sqlx::query_as::<_, PlatformClicks>(
            r#"
            SELECT platform, COUNT(*) AS clicks
            FROM analytics_events
            WHERE user_id = ? AND event_type = ? AND link_id IS NULL
              AND platform IS NOT NULL AND ts_millis BETWEEN ? AND ?
            GROUP BY platform
            ORDER BY clicks DESC
            "#,
        )
        .bind(user_id)
        .bind(EventType::LinkClick)
        .bind(range.start_ms)
        .bind(range.end_ms)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn daily_counts(&self, user_id: i64, range: TimeRange) -> Result<Vec<DailyCountsRow>> {
        let rows = sqlx::query_as::<_, DailyCountsRow>(
            r#"
            SELECT ts_millis / 86400000 AS day_index,
                   SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS views,
                   SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS clicks
            FROM analytics_events
            WHERE user_id = ? AND ts_millis BETWEEN ? AND ?
            GROUP BY day_index
            ORDER BY day_index ASC
            "#,
        )
        .bind(EventType::ProfileView)
        .bind(EventType::LinkClick)
        .bind(user_id)
        .bind(range.start_ms)
        .bind(range.end_ms)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn counts_by_country(
        &self,
        user_id: i64,
        range: TimeRange,
    ) -> Result<Vec<DimensionCounts>> {
        let rows = sqlx::query_as::<_, DimensionCounts>(
            r#"
            SELECT COALESCE(country, 'Unknown') AS dimension,
                   SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS views,
                   SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS clicks
            FROM analytics_events
            WHERE user_id = ? AND ts_millis BETWEEN ? AND ?
            GROUP BY dimension
            ORDER BY (views + clicks) DESC
            "#,
        )
        .bind(EventType::ProfileView)
        .bind(EventType::LinkClick)
        .bind(user_id)
        .bind(range.start_ms)
        .bind(range.end_ms)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn counts_by_referrer(
        &self,
        user_id: i64,
        range: TimeRange,
    ) -> Result<Vec<DimensionCounts>> {
        let rows = sqlx::query_as::<_, DimensionCounts>(
            r#"
            SELECT COALESCE(referrer, 'Unknown') AS dimension,
                   SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS views,
                   SUM(CASE WHEN event_type = ? THEN 1 ELSE 0 END) AS clicks
            FROM analytics_events
            WHERE user_id = ? AND ts_millis BETWEEN ? AND ?
            GROUP BY dimension
            ORDER BY (views + clicks) DESC
            "#,
        )
        .bind(EventType::ProfileView)
        .bind(EventType::LinkClick)
        .bind(user_id)
        .bind(range.start_ms)
        .bind(range.end_ms)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows)
    }

    async fn prune_events_before(&self, ts_millis: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM analytics_events WHERE ts_millis < ?")
            .bind(ts_millis)
            .execute(self.pool.as_ref())
            .await?;

        Ok(result.rows_affected())
    }

    async fn add_waitlist_entry(&self, email: &str, topic: &str) -> StorageResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO waitlist (email, topic, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(email, topic) DO NOTHING
            "#,
        )
        .bind(email)
        .bind(topic)
        .bind(Self::now_millis())
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict);
        }

        Ok(())
    }

    async fn upsert_user_campaign(
        &self,
        user_id: i64,
        campaign_id: i64,
        joined: bool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_campaigns (user_id, campaign_id, joined, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, campaign_id) DO UPDATE SET
                joined = excluded.joined,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(user_id)
        .bind(campaign_id)
        .bind(joined)
        .bind(Self::now_millis())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }
}

//! Dashboard aggregation queries
//!
//! Every method reads straight through to storage; results are never
//! cached, and aggregation never mutates past events.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::analytics::models::{DailyCounts, DateRange, DimensionCounts, SummaryReport};
use crate::storage::Storage;

/// Label shown for clicks on links that were deleted or left untitled.
const UNTITLED: &str = "(untitled)";

const MILLIS_PER_DAY: i64 = 86_400_000;

pub struct AnalyticsAggregator {
    storage: Arc<dyn Storage>,
}

impl AnalyticsAggregator {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// The dashboard summary: views, per-link clicks, unique visitors,
    /// conversion rate and social-media click counts.
    pub async fn summary(&self, user_id: i64, dates: DateRange) -> Result<SummaryReport> {
        let range = dates.to_time_range();

        let profile_views = self
            .storage
            .count_events(user_id, crate::models::EventType::ProfileView, range)
            .await?;

        let mut per_link_clicks = self.storage.per_link_clicks(user_id, range).await?;
        for row in &mut per_link_clicks {
            if row.title.as_deref().map_or(true, str::is_empty) {
                row.title = Some(UNTITLED.to_string());
            }
        }

        let total_clicks: i64 = per_link_clicks.iter().map(|row| row.clicks).sum();
        let unique_visitors = self.storage.distinct_view_ips(user_id, range).await?;
        let social_media_clicks = self.storage.platform_clicks(user_id, range).await?;

        Ok(SummaryReport {
            profile_views,
            per_link_clicks,
            total_clicks,
            unique_visitors,
            conversion_rate: conversion_rate(total_clicks, unique_visitors),
            social_media_clicks,
        })
    }

    /// Daily view/click buckets for every calendar day in range, zero
    /// filled so the chart has no gaps.
    pub async fn timeseries(&self, user_id: i64, dates: DateRange) -> Result<Vec<DailyCounts>> {
        let rows = self
            .storage
            .daily_counts(user_id, dates.to_time_range())
            .await?;

        let by_day: HashMap<i64, (i64, i64)> = rows
            .into_iter()
            .map(|(day_index, views, clicks)| (day_index, (views, clicks)))
            .collect();

        let series = dates
            .days()
            .into_iter()
            .map(|day| {
                let day_index = day
                    .and_hms_opt(0, 0, 0)
                    .expect("midnight is always valid")
                    .and_utc()
                    .timestamp_millis()
                    / MILLIS_PER_DAY;
                let (views, clicks) = by_day.get(&day_index).copied().unwrap_or((0, 0));
                DailyCounts { day, views, clicks }
            })
            .collect();

        Ok(series)
    }

    /// View/click counts per raw country string, most active first.
    pub async fn geography(&self, user_id: i64, dates: DateRange) -> Result<Vec<DimensionCounts>> {
        self.storage
            .counts_by_country(user_id, dates.to_time_range())
            .await
    }

    /// View/click counts per raw referrer string, most active first.
    pub async fn referrer(&self, user_id: i64, dates: DateRange) -> Result<Vec<DimensionCounts>> {
        self.storage
            .counts_by_referrer(user_id, dates.to_time_range())
            .await
    }
}

/// Whole-percent clicks per unique visitor, capped at 100. Zero visitors
/// means zero, not a division error.
fn conversion_rate(total_clicks: i64, unique_visitors: i64) -> i64 {
    if unique_visitors == 0 {
        return 0;
    }
    let rate = total_clicks as f64 / unique_visitors as f64 * 100.0;
    rate.min(100.0).round() as i64
}

//! Data models for dashboard analytics

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive Unix-millisecond range used by storage queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start_ms: i64,
    pub end_ms: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateRangeError {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Invalid(String),
    #[error("start date is after end date")]
    Inverted,
}

/// A calendar date range, end inclusive through 23:59:59.999 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .map_err(|_| DateRangeError::Invalid(start.to_string()))?;
        let end = NaiveDate::parse_from_str(end, "%Y-%m-%d")
            .map_err(|_| DateRangeError::Invalid(end.to_string()))?;
        if start > end {
            return Err(DateRangeError::Inverted);
        }
        Ok(Self { start, end })
    }

    /// Millisecond bounds: midnight of `start` through the last millisecond
    /// of `end`. A record at `end 23:59:59.999` is in range, one at
    /// `end+1d 00:00:00.000` is not.
    pub fn to_time_range(self) -> TimeRange {
        let start_ms = self
            .start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc()
            .timestamp_millis();
        let end_ms = (self.end + Duration::days(1))
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc()
            .timestamp_millis()
            - 1;
        TimeRange { start_ms, end_ms }
    }

    /// Every calendar day in `[start, end]`, in order.
    pub fn days(self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        let mut day = self.start;
        while day <= self.end {
            days.push(day);
            day += Duration::days(1);
        }
        days
    }
}

/// Click count for one link, joined with its current title.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LinkClicks {
    pub link_id: i64,
    /// Current link title; "(untitled)" when the link was deleted or the
    /// title is empty (applied by the aggregator).
    pub title: Option<String>,
    pub clicks: i64,
}

/// Click count for one social-media platform (clicks with no link id).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformClicks {
    pub platform: String,
    pub clicks: i64,
}

/// One zero-filled day bucket of the time series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCounts {
    pub day: NaiveDate,
    pub views: i64,
    pub clicks: i64,
}

/// View/click counts for one raw dimension value (country or referrer).
/// No normalization: "US" and "United States" are distinct buckets.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DimensionCounts {
    pub dimension: String,
    pub views: i64,
    pub clicks: i64,
}

/// The dashboard summary object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub profile_views: i64,
    pub per_link_clicks: Vec<LinkClicks>,
    pub total_clicks: i64,
    /// Distinct IPs among profile views in range. An IP shared by several
    /// people undercounts; a visitor with rotating IPs overcounts.
    pub unique_visitors: i64,
    /// Whole-percent clicks-per-visitor, capped at 100; 0 when there are
    /// no unique visitors.
    pub conversion_rate: i64,
    pub social_media_clicks: Vec<PlatformClicks>,
}

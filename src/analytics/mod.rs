//! Dashboard analytics aggregation
//!
//! Read-only summaries derived from the append-only analytics event table.
//! There is no caching layer: every dashboard date-range change runs fresh
//! aggregation queries against storage.

pub mod aggregator;
pub mod models;

pub use aggregator::AnalyticsAggregator;
pub use models::{
    DailyCounts, DateRange, DimensionCounts, LinkClicks, PlatformClicks, SummaryReport, TimeRange,
};

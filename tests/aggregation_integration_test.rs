//! Integration tests for analytics aggregation: summary correctness,
//! range boundaries, zero-filled timeseries, geography and referrer
//! breakdowns.

use std::sync::Arc;

use chrono::NaiveDate;
use trellis::analytics::{AnalyticsAggregator, DateRange};
use trellis::models::{CreateLinkRequest, EventType, NewAnalyticsEvent, RotationType, User};
use trellis::storage::{SqliteStorage, Storage};

async fn create_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

async fn create_user(storage: &Arc<dyn Storage>) -> User {
    storage.create_user("ada", "ada@x.com", "tok-a").await.unwrap()
}

async fn create_link(storage: &Arc<dyn Storage>, user_id: i64, title: &str) -> i64 {
    let req = CreateLinkRequest {
        title: title.to_string(),
        url: format!("https://example.com/{title}"),
        icon: None,
        type_id: None,
        rotation_type: RotationType::Always,
        weight: None,
        schedule_start: None,
        schedule_end: None,
        category: None,
        tags: None,
    };
    storage.create_link(user_id, &req).await.unwrap().id
}

fn millis(date: &str, h: u32, m: u32, s: u32, ms: u32) -> i64 {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_milli_opt(h, m, s, ms)
        .unwrap()
        .and_utc()
        .timestamp_millis()
}

fn event(event_type: EventType, user_id: i64, ts_millis: i64) -> NewAnalyticsEvent {
    NewAnalyticsEvent {
        event_type,
        user_id,
        link_id: None,
        platform: None,
        referrer: None,
        country: None,
        ip: None,
        ab_test_group: None,
        ts_millis,
    }
}

fn click(user_id: i64, link_id: i64, ts_millis: i64) -> NewAnalyticsEvent {
    NewAnalyticsEvent {
        link_id: Some(link_id),
        ..event(EventType::LinkClick, user_id, ts_millis)
    }
}

fn view(user_id: i64, ip: &str, ts_millis: i64) -> NewAnalyticsEvent {
    NewAnalyticsEvent {
        ip: Some(ip.to_string()),
        ..event(EventType::ProfileView, user_id, ts_millis)
    }
}

fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).unwrap()
}

#[tokio::test]
async fn summary_counts_views_clicks_and_visitors() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let first = create_link(&storage, user.id, "first").await;
    let second = create_link(&storage, user.id, "second").await;

    let noon = millis("2025-01-15", 12, 0, 0, 0);
    for _ in 0..3 {
        storage.insert_event(&click(user.id, first, noon)).await.unwrap();
    }
    for _ in 0..2 {
        storage.insert_event(&click(user.id, second, noon)).await.unwrap();
    }
    // Four views from two distinct addresses; the nameless view leaves
    // unique_visitors untouched.
    storage.insert_event(&view(user.id, "1.1.1.1", noon)).await.unwrap();
    storage.insert_event(&view(user.id, "1.1.1.1", noon)).await.unwrap();
    storage.insert_event(&view(user.id, "2.2.2.2", noon)).await.unwrap();
    storage
        .insert_event(&event(EventType::ProfileView, user.id, noon))
        .await
        .unwrap();

    let aggregator = AnalyticsAggregator::new(storage.clone());
    let report = aggregator
        .summary(user.id, range("2025-01-01", "2025-01-31"))
        .await
        .unwrap();

    assert_eq!(report.profile_views, 4);
    assert_eq!(report.total_clicks, 5);
    assert_eq!(report.unique_visitors, 2);
    // 5 clicks / 2 visitors caps at 100 percent.
    assert_eq!(report.conversion_rate, 100);

    assert_eq!(report.per_link_clicks.len(), 2);
    assert_eq!(report.per_link_clicks[0].link_id, first);
    assert_eq!(report.per_link_clicks[0].clicks, 3);
    assert_eq!(report.per_link_clicks[0].title.as_deref(), Some("first"));
    assert_eq!(report.per_link_clicks[1].link_id, second);
    assert_eq!(report.per_link_clicks[1].clicks, 2);
}

#[tokio::test]
async fn summary_labels_deleted_links_untitled() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let link = create_link(&storage, user.id, "gone").await;

    let noon = millis("2025-01-15", 12, 0, 0, 0);
    storage.insert_event(&click(user.id, link, noon)).await.unwrap();
    storage.delete_link(user.id, link).await.unwrap();

    let aggregator = AnalyticsAggregator::new(storage.clone());
    let report = aggregator
        .summary(user.id, range("2025-01-01", "2025-01-31"))
        .await
        .unwrap();

    assert_eq!(report.per_link_clicks[0].title.as_deref(), Some("(untitled)"));
    assert_eq!(report.per_link_clicks[0].clicks, 1);
}

#[tokio::test]
async fn summary_includes_social_platform_clicks() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;

    let noon = millis("2025-01-15", 12, 0, 0, 0);
    for _ in 0..2 {
        let ev = NewAnalyticsEvent {
            platform: Some("instagram".to_string()),
            ..event(EventType::LinkClick, user.id, noon)
        };
        storage.insert_event(&ev).await.unwrap();
    }

    let aggregator = AnalyticsAggregator::new(storage.clone());
    let report = aggregator
        .summary(user.id, range("2025-01-01", "2025-01-31"))
        .await
        .unwrap();

    assert_eq!(report.social_media_clicks.len(), 1);
    assert_eq!(report.social_media_clicks[0].platform, "instagram");
    assert_eq!(report.social_media_clicks[0].clicks, 2);
    // Platform clicks have no link id and never inflate per-link totals.
    assert!(report.per_link_clicks.is_empty());
}

#[tokio::test]
async fn range_end_includes_last_millisecond_only() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;

    storage
        .insert_event(&view(user.id, "1.1.1.1", millis("2025-01-31", 23, 59, 59, 999)))
        .await
        .unwrap();
    storage
        .insert_event(&view(user.id, "2.2.2.2", millis("2025-02-01", 0, 0, 0, 0)))
        .await
        .unwrap();
    storage
        .insert_event(&view(user.id, "3.3.3.3", millis("2024-12-31", 23, 59, 59, 999)))
        .await
        .unwrap();

    let aggregator = AnalyticsAggregator::new(storage.clone());
    let report = aggregator
        .summary(user.id, range("2025-01-01", "2025-01-31"))
        .await
        .unwrap();

    assert_eq!(report.profile_views, 1);
}

#[tokio::test]
async fn summary_is_scoped_to_the_requested_user() {
    let storage = create_storage().await;
    let ada = storage.create_user("ada", "ada@x.com", "tok-a").await.unwrap();
    let bob = storage.create_user("bob", "bob@x.com", "tok-b").await.unwrap();

    let noon = millis("2025-01-15", 12, 0, 0, 0);
    storage.insert_event(&view(ada.id, "1.1.1.1", noon)).await.unwrap();
    storage.insert_event(&view(bob.id, "2.2.2.2", noon)).await.unwrap();

    let aggregator = AnalyticsAggregator::new(storage.clone());
    let report = aggregator
        .summary(ada.id, range("2025-01-01", "2025-01-31"))
        .await
        .unwrap();

    assert_eq!(report.profile_views, 1);
    assert_eq!(report.unique_visitors, 1);
}

#[tokio::test]
async fn timeseries_zero_fills_quiet_days() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let link = create_link(&storage, user.id, "only").await;

    storage
        .insert_event(&view(user.id, "1.1.1.1", millis("2025-03-01", 9, 0, 0, 0)))
        .await
        .unwrap();
    storage
        .insert_event(&click(user.id, link, millis("2025-03-03", 18, 0, 0, 0)))
        .await
        .unwrap();
    storage
        .insert_event(&click(user.id, link, millis("2025-03-03", 19, 0, 0, 0)))
        .await
        .unwrap();

    let aggregator = AnalyticsAggregator::new(storage.clone());
    let series = aggregator
        .timeseries(user.id, range("2025-03-01", "2025-03-04"))
        .await
        .unwrap();

    assert_eq!(series.len(), 4);
    assert_eq!(series[0].day, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());
    assert_eq!((series[0].views, series[0].clicks), (1, 0));
    assert_eq!((series[1].views, series[1].clicks), (0, 0));
    assert_eq!((series[2].views, series[2].clicks), (0, 2));
    assert_eq!((series[3].views, series[3].clicks), (0, 0));
}

#[tokio::test]
async fn geography_buckets_missing_country_as_unknown() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let link = create_link(&storage, user.id, "only").await;

    let noon = millis("2025-01-15", 12, 0, 0, 0);
    let with_country = |country: &str, ev: NewAnalyticsEvent| NewAnalyticsEvent {
        country: Some(country.to_string()),
        ..ev
    };

    storage
        .insert_event(&with_country("US", view(user.id, "1.1.1.1", noon)))
        .await
        .unwrap();
    storage
        .insert_event(&with_country("US", click(user.id, link, noon)))
        .await
        .unwrap();
    storage
        .insert_event(&with_country("DE", view(user.id, "2.2.2.2", noon)))
        .await
        .unwrap();
    storage.insert_event(&view(user.id, "3.3.3.3", noon)).await.unwrap();

    let aggregator = AnalyticsAggregator::new(storage.clone());
    let rows = aggregator
        .geography(user.id, range("2025-01-01", "2025-01-31"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 3);
    // Most active bucket first.
    assert_eq!(rows[0].dimension, "US");
    assert_eq!((rows[0].views, rows[0].clicks), (1, 1));
    let unknown = rows.iter().find(|r| r.dimension == "Unknown").unwrap();
    assert_eq!((unknown.views, unknown.clicks), (1, 0));
}

#[tokio::test]
async fn referrer_breakdown_keeps_raw_values() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;

    let noon = millis("2025-01-15", 12, 0, 0, 0);
    let with_referrer = |referrer: &str, ev: NewAnalyticsEvent| NewAnalyticsEvent {
        referrer: Some(referrer.to_string()),
        ..ev
    };

    // Raw strings are distinct buckets, no host normalization.
    storage
        .insert_event(&with_referrer("https://t.co/abc", view(user.id, "1.1.1.1", noon)))
        .await
        .unwrap();
    storage
        .insert_event(&with_referrer("t.co", view(user.id, "2.2.2.2", noon)))
        .await
        .unwrap();

    let aggregator = AnalyticsAggregator::new(storage.clone());
    let rows = aggregator
        .referrer(user.id, range("2025-01-01", "2025-01-31"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|r| r.dimension == "https://t.co/abc"));
    assert!(rows.iter().any(|r| r.dimension == "t.co"));
}

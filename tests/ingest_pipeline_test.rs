//! Integration tests for the ingestion pipeline: admission gates,
//! click resolution, country enrichment and persistence.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use trellis::analytics::TimeRange;
use trellis::config::RateLimitConfig;
use trellis::ingest::{
    ClickRequest, CountryResolver, IngestError, IngestPipeline, NoopResolver, RateLimiter,
    RequestContext, ViewRequest,
};
use trellis::models::{CreateLinkRequest, EventType, RotationType, User};
use trellis::storage::{SqliteStorage, Storage};

/// Resolver that always answers with a fixed country.
struct FixedResolver(&'static str);

#[async_trait]
impl CountryResolver for FixedResolver {
    async fn resolve(&self, _ip: IpAddr) -> Option<String> {
        Some(self.0.to_string())
    }
}

const ALL_TIME: TimeRange = TimeRange {
    start_ms: 0,
    end_ms: i64::MAX,
};

async fn create_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn pipeline(storage: Arc<dyn Storage>, resolver: Arc<dyn CountryResolver>) -> IngestPipeline {
    let limiter = Arc::new(RateLimiter::new(&RateLimitConfig {
        window_secs: 60,
        max_requests: 10,
    }));
    IngestPipeline::new(storage, limiter, resolver)
}

async fn create_user(storage: &Arc<dyn Storage>) -> User {
    storage.create_user("ada", "ada@x.com", "tok-a").await.unwrap()
}

async fn create_link(storage: &Arc<dyn Storage>, user_id: i64) -> i64 {
    let req = CreateLinkRequest {
        title: "portfolio".to_string(),
        url: "https://example.com".to_string(),
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

fn ctx(ip: &str) -> RequestContext {
    RequestContext {
        user_agent: Some("Mozilla/5.0".to_string()),
        ip: ip.parse().unwrap(),
    }
}

fn click_body(link_id: i64) -> ClickRequest {
    ClickRequest {
        link_id: Some(link_id),
        platform: None,
        username: None,
        referrer: None,
        country: None,
        ab_test_group: None,
    }
}

#[tokio::test]
async fn link_click_is_persisted_for_the_owner() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let link = create_link(&storage, user.id).await;
    let pipeline = pipeline(storage.clone(), Arc::new(NoopResolver));

    pipeline
        .record_click(click_body(link), ctx("203.0.113.7"))
        .await
        .unwrap();

    let count = storage
        .count_events(user.id, EventType::LinkClick, ALL_TIME)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn platform_click_resolves_the_user_by_username() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let pipeline = pipeline(storage.clone(), Arc::new(NoopResolver));

    let req = ClickRequest {
        link_id: None,
        platform: Some("instagram".to_string()),
        username: Some("ada".to_string()),
        referrer: None,
        country: None,
        ab_test_group: None,
    };
    pipeline.record_click(req, ctx("203.0.113.7")).await.unwrap();

    let count = storage
        .count_events(user.id, EventType::LinkClick, ALL_TIME)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn platform_click_without_username_is_invalid() {
    let storage = create_storage().await;
    let pipeline = pipeline(storage, Arc::new(NoopResolver));

    let req = ClickRequest {
        link_id: None,
        platform: Some("instagram".to_string()),
        username: None,
        referrer: None,
        country: None,
        ab_test_group: None,
    };
    assert!(matches!(
        pipeline.record_click(req, ctx("203.0.113.7")).await,
        Err(IngestError::Invalid(_))
    ));
}

#[tokio::test]
async fn click_without_link_or_platform_is_invalid() {
    let storage = create_storage().await;
    let pipeline = pipeline(storage, Arc::new(NoopResolver));

    let req = ClickRequest {
        link_id: None,
        platform: None,
        username: None,
        referrer: None,
        country: None,
        ab_test_group: None,
    };
    assert!(matches!(
        pipeline.record_click(req, ctx("203.0.113.7")).await,
        Err(IngestError::Invalid(_))
    ));
}

#[tokio::test]
async fn unknown_link_and_unknown_user_are_not_found() {
    let storage = create_storage().await;
    let pipeline = pipeline(storage, Arc::new(NoopResolver));

    assert!(matches!(
        pipeline.record_click(click_body(9999), ctx("203.0.113.7")).await,
        Err(IngestError::NotFound)
    ));

    let view = ViewRequest {
        user_id: 9999,
        referrer: None,
        country: None,
    };
    assert!(matches!(
        pipeline.record_view(view, ctx("203.0.113.7")).await,
        Err(IngestError::NotFound)
    ));
}

#[tokio::test]
async fn crawler_user_agents_are_denied_and_leave_no_event() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let link = create_link(&storage, user.id).await;
    let pipeline = pipeline(storage.clone(), Arc::new(NoopResolver));

    let bot_ctx = RequestContext {
        user_agent: Some("Googlebot/2.1".to_string()),
        ip: "203.0.113.7".parse().unwrap(),
    };
    assert!(matches!(
        pipeline.record_click(click_body(link), bot_ctx).await,
        Err(IngestError::BotDenied)
    ));

    let count = storage
        .count_events(user.id, EventType::LinkClick, ALL_TIME)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn eleventh_request_from_one_ip_is_rate_limited() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let pipeline = pipeline(storage.clone(), Arc::new(NoopResolver));

    let view = ViewRequest {
        user_id: user.id,
        referrer: None,
        country: None,
    };
    for _ in 0..10 {
        pipeline
            .record_view(view.clone(), ctx("203.0.113.7"))
            .await
            .unwrap();
    }
    assert!(matches!(
        pipeline.record_view(view.clone(), ctx("203.0.113.7")).await,
        Err(IngestError::RateLimited)
    ));

    // Another address still gets through.
    pipeline.record_view(view, ctx("198.51.100.4")).await.unwrap();

    let count = storage
        .count_events(user.id, EventType::ProfileView, ALL_TIME)
        .await
        .unwrap();
    assert_eq!(count, 11);
}

#[tokio::test]
async fn resolver_fills_in_a_missing_country() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let pipeline = pipeline(storage.clone(), Arc::new(FixedResolver("SE")));

    let view = ViewRequest {
        user_id: user.id,
        referrer: None,
        country: None,
    };
    pipeline.record_view(view, ctx("203.0.113.7")).await.unwrap();

    let rows = storage.counts_by_country(user.id, ALL_TIME).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].dimension, "SE");
}

#[tokio::test]
async fn client_supplied_country_wins_over_the_resolver() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let pipeline = pipeline(storage.clone(), Arc::new(FixedResolver("SE")));

    let view = ViewRequest {
        user_id: user.id,
        referrer: None,
        country: Some("BR".to_string()),
    };
    pipeline.record_view(view, ctx("203.0.113.7")).await.unwrap();

    let rows = storage.counts_by_country(user.id, ALL_TIME).await.unwrap();
    assert_eq!(rows[0].dimension, "BR");
}

#[tokio::test]
async fn empty_supplied_country_falls_back_to_the_resolver() {
    let storage = create_storage().await;
    let user = create_user(&storage).await;
    let pipeline = pipeline(storage.clone(), Arc::new(FixedResolver("SE")));

    let view = ViewRequest {
        user_id: user.id,
        referrer: None,
        country: Some(String::new()),
    };
    pipeline.record_view(view, ctx("203.0.113.7")).await.unwrap();

    let rows = storage.counts_by_country(user.id, ALL_TIME).await.unwrap();
    assert_eq!(rows[0].dimension, "SE");
}

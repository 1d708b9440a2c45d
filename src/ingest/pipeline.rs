//! Ingestion pipeline: validate -> filter -> resolve -> enrich -> persist.

use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

use crate::ingest::bot_filter::is_bot;
use crate::ingest::geoip::CountryResolver;
use crate::ingest::rate_limiter::RateLimiter;
use crate::models::{EventType, NewAnalyticsEvent};
use crate::storage::Storage;

#[derive(Debug, Clone, Deserialize)]
pub struct ClickRequest {
    pub link_id: Option<i64>,
    /// Social-media platform name; used together with `username` when the
    /// click is not tied to a stored link.
    pub platform: Option<String>,
    pub username: Option<String>,
    pub referrer: Option<String>,
    pub country: Option<String>,
    pub ab_test_group: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewRequest {
    pub user_id: i64,
    pub referrer: Option<String>,
    pub country: Option<String>,
}

/// Per-request facts the pipeline needs beyond the JSON body.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub ip: IpAddr,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("request denied")]
    BotDenied,
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("{0}")]
    Invalid(String),
    #[error("not found")]
    NotFound,
    #[error("failed to record event")]
    Storage(#[source] anyhow::Error),
}

pub struct IngestPipeline {
    storage: Arc<dyn Storage>,
    limiter: Arc<RateLimiter>,
    resolver: Arc<dyn CountryResolver>,
}

impl IngestPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        limiter: Arc<RateLimiter>,
        resolver: Arc<dyn CountryResolver>,
    ) -> Self {
        Self {
            storage,
            limiter,
            resolver,
        }
    }

    /// Record a link or social-media click.
    pub async fn record_click(
        &self,
        req: ClickRequest,
        ctx: RequestContext,
    ) -> Result<(), IngestError> {
        self.admit(&ctx)?;

        // A click is tied to a stored link or names a social platform on a
        // user's profile; anything else is malformed.
        let (user_id, link_id, platform) = if let Some(link_id) = req.link_id {
            let link = self
                .storage
                .get_link(link_id)
                .await
                .map_err(IngestError::Storage)?
                .ok_or(IngestError::NotFound)?;
            (link.user_id, Some(link.id), None)
        } else if let Some(platform) = req.platform {
            let username = req.username.ok_or_else(|| {
                IngestError::Invalid("platform clicks require a username".to_string())
            })?;
            let user = self
                .storage
                .get_user_by_username(&username)
                .await
                .map_err(IngestError::Storage)?
                .ok_or(IngestError::NotFound)?;
            (user.id, None, Some(platform))
        } else {
            return Err(IngestError::Invalid(
                "click requires a link_id or a platform".to_string(),
            ));
        };

        let country = self.enrich_country(req.country, ctx.ip).await;

        let event = NewAnalyticsEvent {
            event_type: EventType::LinkClick,
            user_id,
            link_id,
            platform,
            referrer: req.referrer,
            country,
            ip: Some(ctx.ip.to_string()),
            ab_test_group: req.ab_test_group,
            ts_millis: chrono::Utc::now().timestamp_millis(),
        };

        self.persist(event).await
    }

    /// Record a profile view.
    pub async fn record_view(
        &self,
        req: ViewRequest,
        ctx: RequestContext,
    ) -> Result<(), IngestError> {
        self.admit(&ctx)?;

        let user = self
            .storage
            .get_user(req.user_id)
            .await
            .map_err(IngestError::Storage)?
            .ok_or(IngestError::NotFound)?;

        let country = self.enrich_country(req.country, ctx.ip).await;

        let event = NewAnalyticsEvent {
            event_type: EventType::ProfileView,
            user_id: user.id,
            link_id: None,
            platform: None,
            referrer: req.referrer,
            country,
            ip: Some(ctx.ip.to_string()),
            ab_test_group: None,
            ts_millis: chrono::Utc::now().timestamp_millis(),
        };

        self.persist(event).await
    }

    /// Bot and rate-limit gates. Rejected attempts leave no record beyond
    /// these log lines.
    fn admit(&self, ctx: &RequestContext) -> Result<(), IngestError> {
        if is_bot(ctx.user_agent.as_deref()) {
            warn!(ip = %ctx.ip, "dropping event from crawler user-agent");
            return Err(IngestError::BotDenied);
        }
        if !self.limiter.check(ctx.ip) {
            warn!(ip = %ctx.ip, "dropping event over rate limit");
            return Err(IngestError::RateLimited);
        }
        Ok(())
    }

    /// Client-supplied country wins; otherwise ask the resolver, which
    /// degrades to None on any failure.
    async fn enrich_country(&self, supplied: Option<String>, ip: IpAddr) -> Option<String> {
        match supplied.filter(|c| !c.is_empty()) {
            Some(country) => Some(country),
            None => self.resolver.resolve(ip).await,
        }
    }

    async fn persist(&self, event: NewAnalyticsEvent) -> Result<(), IngestError> {
        if let Err(err) = self.storage.insert_event(&event).await {
            // Event loss is accepted over blocking the client; no retry.
            error!(error = %err, "failed to persist analytics event");
            return Err(IngestError::Storage(err));
        }
        Ok(())
    }
}

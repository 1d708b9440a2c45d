//! Click/view event ingestion
//!
//! Incoming events are validated, bot-filtered, rate-limited and
//! geo-enriched before being appended to the analytics event table.

pub mod bot_filter;
pub mod geoip;
pub mod ip_extractor;
pub mod pipeline;
pub mod rate_limiter;

pub use geoip::{CountryResolver, HttpGeoIpResolver, NoopResolver};
pub use ip_extractor::extract_client_ip;
pub use pipeline::{ClickRequest, IngestError, IngestPipeline, RequestContext, ViewRequest};
pub use rate_limiter::RateLimiter;

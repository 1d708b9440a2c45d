use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub geoip: GeoIpConfig,
    pub billing: BillingConfig,
    pub plans: PlanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Fixed-window ingestion rate limit, keyed by source IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_secs: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoIpConfig {
    /// Base URL of the HTTP geo-IP lookup service.
    /// If None, country enrichment is disabled entirely.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Shared secret for webhook signature verification.
    /// If None, all webhook deliveries are rejected.
    pub webhook_secret: Option<String>,
}

/// Per-plan link count ceilings. The premium limit is effectively
/// unbounded but kept finite as an abuse backstop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    pub free_link_limit: i64,
    pub premium_link_limit: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./trellis.db".to_string());
        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()?;

        let window_secs = std::env::var("RATE_LIMIT_WINDOW_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);
        let max_requests = std::env::var("RATE_LIMIT_MAX_REQUESTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let geoip_endpoint = std::env::var("GEOIP_ENDPOINT")
            .ok()
            .filter(|v| !v.is_empty());
        if geoip_endpoint.is_none() {
            tracing::warn!("GEOIP_ENDPOINT not set, country enrichment disabled");
        }

        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|v| !v.is_empty());
        if webhook_secret.is_none() {
            tracing::warn!("STRIPE_WEBHOOK_SECRET not set, billing webhooks will be rejected");
        }

        let free_link_limit = std::env::var("FREE_PLAN_LINK_LIMIT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(5);
        let premium_link_limit = std::env::var("PREMIUM_PLAN_LINK_LIMIT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(1000);

        Ok(Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            server: ServerConfig { host, port },
            rate_limit: RateLimitConfig {
                window_secs,
                max_requests,
            },
            geoip: GeoIpConfig {
                endpoint: geoip_endpoint,
            },
            billing: BillingConfig { webhook_secret },
            plans: PlanConfig {
                free_link_limit,
                premium_link_limit,
            },
        })
    }
}

//! Country enrichment via an external HTTP geo-IP service
//!
//! The resolver is a trait so the pipeline can run against a stub in tests
//! and a no-op when no endpoint is configured. Lookup failures of any kind
//! degrade to `None`; they never fail the parent request.

use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait CountryResolver: Send + Sync {
    /// Best-effort country code for an IP; `None` when the IP is not
    /// globally routable or the lookup fails.
    async fn resolve(&self, ip: IpAddr) -> Option<String>;
}

/// Resolver backed by an ip-api-style JSON endpoint
/// (`GET {endpoint}/{ip}` -> `{"countryCode": "US", ...}`).
pub struct HttpGeoIpResolver {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GeoIpResponse {
    #[serde(alias = "countryCode", alias = "country_code")]
    country_code: Option<String>,
}

impl HttpGeoIpResolver {
    pub fn new(endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .unwrap_or_default();
        Self { client, endpoint }
    }
}

/// Loopback, unspecified and private-range IPs are never worth a lookup.
fn is_lookupable(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !v4.is_loopback() && !v4.is_unspecified() && !v4.is_private() && !v4.is_link_local()
        }
        IpAddr::V6(v6) => !v6.is_loopback() && !v6.is_unspecified(),
    }
}

#[async_trait]
impl CountryResolver for HttpGeoIpResolver {
    async fn resolve(&self, ip: IpAddr) -> Option<String> {
        if !is_lookupable(ip) {
            return None;
        }

        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), ip);
        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                debug!(%ip, error = %err, "geo-ip lookup failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(%ip, status = %response.status(), "geo-ip lookup returned non-success");
            return None;
        }

        match response.json::<GeoIpResponse>().await {
            Ok(body) => body.country_code.filter(|c| !c.is_empty()),
            Err(err) => {
                debug!(%ip, error = %err, "geo-ip response body unreadable");
                None
            }
        }
    }
}

/// Resolver used when no geo-IP endpoint is configured.
pub struct NoopResolver;

#[async_trait]
impl CountryResolver for NoopResolver {
    async fn resolve(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_addresses_are_not_lookupable() {
        assert!(!is_lookupable("127.0.0.1".parse().unwrap()));
        assert!(!is_lookupable("0.0.0.0".parse().unwrap()));
        assert!(!is_lookupable("10.1.2.3".parse().unwrap()));
        assert!(!is_lookupable("192.168.0.10".parse().unwrap()));
        assert!(!is_lookupable("::1".parse().unwrap()));
    }

    #[test]
    fn public_addresses_are_lookupable() {
        assert!(is_lookupable("8.8.8.8".parse().unwrap()));
        assert!(is_lookupable("2001:4860:4860::8888".parse().unwrap()));
    }

    #[tokio::test]
    async fn unroutable_ip_short_circuits_without_network() {
        let resolver = HttpGeoIpResolver::new("http://geoip.invalid".to_string());
        assert_eq!(resolver.resolve("127.0.0.1".parse().unwrap()).await, None);
    }

    #[tokio::test]
    async fn network_failure_degrades_to_none() {
        // .invalid never resolves, so this exercises the error path.
        let resolver = HttpGeoIpResolver::new("http://geoip.invalid".to_string());
        assert_eq!(resolver.resolve("8.8.8.8".parse().unwrap()).await, None);
    }
}

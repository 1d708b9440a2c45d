//! Client IP extraction from HTTP headers
//!
//! Prefers proxy-supplied headers (X-Forwarded-For, X-Real-IP) and falls
//! back to the socket remote address. With X-Forwarded-For we take the
//! rightmost parseable address, the one appended by the closest proxy.

use axum::http::HeaderMap;
use std::net::IpAddr;

pub fn extract_client_ip(headers: &HeaderMap, socket_addr: IpAddr) -> IpAddr {
    if let Some(ip) = extract_from_x_forwarded_for(headers) {
        return ip;
    }
    if let Some(ip) = extract_from_x_real_ip(headers) {
        return ip;
    }
    socket_addr
}

fn extract_from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = headers.get("x-forwarded-for")?.to_str().ok()?;

    xff.split(',')
        .rev()
        .find_map(|s| s.trim().parse::<IpAddr>().ok())
}

fn extract_from_x_real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

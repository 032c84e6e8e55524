//! Fixed-window rate limiting per client address.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::observability::metrics;

const LIMIT_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const REMAINING_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const RESET_HEADER: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Request count for one client within the current window.
struct WindowEntry {
    count: u32,
    window_start: Instant,
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the client's window resets.
    pub reset_after: Duration,
}

/// State for the rate limiter.
pub struct RateLimiterState {
    entries: DashMap<String, WindowEntry>,
    max_requests: u32,
    window: Duration,
    trust_proxy_hops: usize,
}

impl RateLimiterState {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
            trust_proxy_hops: config.trust_proxy_hops,
        }
    }

    /// Count a request from `key` against its current window.
    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Decision {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                count: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.count = 0;
            entry.window_start = now;
        }

        let allowed = entry.count < self.max_requests;
        if allowed {
            entry.count += 1;
        }

        Decision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(entry.count),
            reset_after: self
                .window
                .saturating_sub(now.duration_since(entry.window_start)),
        }
    }

    /// Drop clients whose window has expired. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    fn sweep_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.window_start) < self.window);
        before.saturating_sub(self.entries.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.entries.len()
    }

    /// Identify the client. With `trust_proxy_hops = n`, the address `n`
    /// hops back along `X-Forwarded-For` is used; otherwise the peer address.
    pub fn client_key(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
        if self.trust_proxy_hops > 0 {
            let forwarded: Vec<&str> = headers
                .get_all("x-forwarded-for")
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .collect();

            if !forwarded.is_empty() {
                let index = forwarded.len() - self.trust_proxy_hops.min(forwarded.len());
                if let Ok(ip) = forwarded[index].parse::<IpAddr>() {
                    return ip.to_string();
                }
            }
        }

        peer.map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

fn insert_headers(headers: &mut HeaderMap, decision: &Decision) {
    let reset_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        + decision.reset_after.as_secs();

    headers.insert(LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining));
    headers.insert(RESET_HEADER, HeaderValue::from(reset_at));
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<Arc<RateLimiterState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = state.client_key(request.headers(), peer);
    let decision = state.check(&key);

    if !decision.allowed {
        tracing::warn!(client = %key, reset_after = ?decision.reset_after, "Rate limit exceeded");
        metrics::record_rejection("rate_limit");

        let mut response = Response::new(Body::from("Too many requests, please try again later."));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        insert_headers(response.headers_mut(), &decision);
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(decision.reset_after.as_secs().max(1)),
        );
        return response;
    }

    let mut response = next.run(request).await;
    insert_headers(response.headers_mut(), &decision);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64, trust_proxy_hops: usize) -> RateLimiterState {
        RateLimiterState::new(&RateLimitConfig {
            enabled: true,
            max_requests,
            window_secs,
            trust_proxy_hops,
            sweep_interval_secs: 60,
        })
    }

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let state = limiter(100, 900, 0);
        let now = Instant::now();
        for i in 0..100 {
            let decision = state.check_at("1.2.3.4", now);
            assert!(decision.allowed, "request {} should pass", i + 1);
        }
        let decision = state.check_at("1.2.3.4", now);
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
    }

    #[test]
    fn rejection_does_not_carry_into_next_window() {
        let state = limiter(2, 900, 0);
        let start = Instant::now();
        assert!(state.check_at("c", start).allowed);
        assert!(state.check_at("c", start).allowed);
        assert!(!state.check_at("c", start).allowed);
        assert!(!state.check_at("c", start + Duration::from_secs(10)).allowed);

        let next_window = start + Duration::from_secs(900);
        let decision = state.check_at("c", next_window);
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        assert!(state.check_at("c", next_window).allowed);
    }

    #[test]
    fn clients_are_independent() {
        let state = limiter(1, 900, 0);
        let now = Instant::now();
        assert!(state.check_at("a", now).allowed);
        assert!(!state.check_at("a", now).allowed);
        assert!(state.check_at("b", now).allowed);
    }

    #[test]
    fn reset_counts_down() {
        let state = limiter(5, 900, 0);
        let start = Instant::now();
        state.check_at("a", start);
        let decision = state.check_at("a", start + Duration::from_secs(100));
        assert_eq!(decision.reset_after, Duration::from_secs(800));
    }

    #[test]
    fn sweep_drops_expired_windows() {
        let state = limiter(5, 60, 0);
        let start = Instant::now();
        state.check_at("old", start);
        state.check_at("new", start + Duration::from_secs(50));
        assert_eq!(state.sweep_at(start + Duration::from_secs(70)), 1);
        assert_eq!(state.tracked_clients(), 1);
    }

    #[test]
    fn client_key_uses_trusted_hop() {
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 198.51.100.2"));

        assert_eq!(limiter(1, 1, 1).client_key(&headers, Some(peer)), "198.51.100.2");
        assert_eq!(limiter(1, 1, 2).client_key(&headers, Some(peer)), "203.0.113.7");
        assert_eq!(limiter(1, 1, 5).client_key(&headers, Some(peer)), "203.0.113.7");
        assert_eq!(limiter(1, 1, 0).client_key(&headers, Some(peer)), "10.0.0.1");
    }

    #[test]
    fn default_config_ignores_forwarded_header() {
        let state = RateLimiterState::new(&RateLimitConfig {
            max_requests: 2,
            ..RateLimitConfig::default()
        });
        let peer: SocketAddr = "192.0.2.10:4000".parse().unwrap();
        let now = Instant::now();

        let allowed: Vec<bool> = (0..6)
            .map(|i| {
                let mut headers = HeaderMap::new();
                let spoofed = format!("198.51.100.{}", i);
                headers.insert("x-forwarded-for", HeaderValue::from_str(&spoofed).unwrap());
                let key = state.client_key(&headers, Some(peer));
                state.check_at(&key, now).allowed
            })
            .collect();

        assert_eq!(allowed, [true, true, false, false, false, false]);
    }

    #[test]
    fn client_key_falls_back_to_peer() {
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(limiter(1, 1, 1).client_key(&headers, Some(peer)), "10.0.0.1");

        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        assert_eq!(limiter(1, 1, 1).client_key(&headers, Some(peer)), "10.0.0.1");
        assert_eq!(limiter(1, 1, 1).client_key(&HeaderMap::new(), None), "unknown");
    }
}

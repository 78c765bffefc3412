//! Per-client rate limiting with a sliding window.
//!
//! Every (client IP, tier) pair gets a bucket of tokens that refills
//! gradually over the window and fully once the window has elapsed.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::ApiError;
use crate::config::RateLimitConfig;
use crate::AppState;

/// Which budget a request draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitTier {
    /// Resource endpoints
    Api,
    /// Register and login, kept tighter against credential stuffing
    Auth,
}

#[derive(Debug, Clone)]
struct Bucket {
    tokens: u32,
    window_start: Instant,
    last_request: Instant,
}

impl Bucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self {
            tokens: capacity,
            window_start: now,
            last_request: now,
        }
    }
}

/// Remaining budget after an accepted request
#[derive(Debug, Clone, Copy)]
pub struct RateLimitInfo {
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the window resets
    pub reset_after: u64,
}

/// Returned when a client has used up its budget
#[derive(Debug, Clone, Copy)]
pub struct RateLimited {
    pub limit: u32,
    pub retry_after: u64,
}

#[derive(Debug)]
pub struct RateLimiter {
    buckets: DashMap<(IpAddr, RateLimitTier), Bucket>,
    config: RateLimitConfig,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: DashMap::new(),
            window: Duration::from_secs(config.window_seconds),
            config,
        }
    }

    fn capacity(&self, tier: RateLimitTier) -> u32 {
        match tier {
            RateLimitTier::Api => self.config.api_requests_per_window,
            RateLimitTier::Auth => self.config.auth_requests_per_window,
        }
    }

    /// Take one token for this client and tier
    pub fn check(&self, ip: IpAddr, tier: RateLimitTier) -> Result<RateLimitInfo, RateLimited> {
        if !self.config.enabled {
            return Ok(RateLimitInfo {
                limit: u32::MAX,
                remaining: u32::MAX,
                reset_after: 0,
            });
        }

        let capacity = self.capacity(tier);
        let now = Instant::now();
        let mut bucket = self
            .buckets
            .entry((ip, tier))
            .or_insert_with(|| Bucket::full(capacity, now));

        let elapsed = now.duration_since(bucket.window_start);
        if elapsed >= self.window {
            *bucket = Bucket::full(capacity, now);
        } else {
            let idle = now.duration_since(bucket.last_request).as_secs_f64();
            let per_second = capacity as f64 / self.window.as_secs_f64();
            let refill = (idle * per_second) as u32;
            bucket.tokens = bucket.tokens.saturating_add(refill).min(capacity);
        }
        bucket.last_request = now;

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(bucket.window_start))
            .as_secs();

        if bucket.tokens == 0 {
            return Err(RateLimited {
                limit: capacity,
                retry_after: reset_after.max(1),
            });
        }

        bucket.tokens -= 1;
        Ok(RateLimitInfo {
            limit: capacity,
            remaining: bucket.tokens,
            reset_after,
        })
    }

    /// Forget clients idle for more than two windows
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let keep_for = self.window * 2;
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.window_start) < keep_for);
    }

    pub fn entry_count(&self) -> usize {
        self.buckets.len()
    }
}

/// Client address. Proxy headers are consulted only when trusted, otherwise
/// the socket peer is the only source.
fn client_ip(request: &Request<Body>, trust_proxy_headers: bool) -> IpAddr {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(request.headers()) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok());
    if forwarded.is_some() {
        return forwarded;
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok())
}

fn set_limit_headers(headers: &mut HeaderMap, limit: u32, remaining: u32, reset: u64) {
    headers.insert("X-RateLimit-Limit", HeaderValue::from(limit));
    headers.insert("X-RateLimit-Remaining", HeaderValue::from(remaining));
    headers.insert("X-RateLimit-Reset", HeaderValue::from(reset));
}

pub async fn rate_limit_api(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state, request, next, RateLimitTier::Api).await
}

pub async fn rate_limit_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    enforce(&state, request, next, RateLimitTier::Auth).await
}

async fn enforce(
    state: &AppState,
    request: Request<Body>,
    next: Next,
    tier: RateLimitTier,
) -> Response {
    let ip = client_ip(&request, state.config.rate_limit.trust_proxy_headers);

    match state.rate_limiter.check(ip, tier) {
        Ok(info) => {
            let mut response = next.run(request).await;
            if state.config.rate_limit.enabled {
                set_limit_headers(
                    response.headers_mut(),
                    info.limit,
                    info.remaining,
                    info.reset_after,
                );
            }
            response
        }
        Err(limited) => {
            tracing::warn!(client = %ip, tier = ?tier, "Rate limit exceeded");
            let mut response = ApiError::rate_limited(format!(
                "Rate limit exceeded. Try again in {} seconds.",
                limited.retry_after
            ))
            .into_response();
            let headers = response.headers_mut();
            headers.insert("Retry-After", HeaderValue::from(limited.retry_after));
            set_limit_headers(headers, limited.limit, 0, limited.retry_after);
            response
        }
    }
}

/// Periodically drop stale buckets
pub fn spawn_cleanup_task(rate_limiter: Arc<RateLimiter>, interval_secs: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            rate_limiter.cleanup_expired();
            tracing::debug!(
                entries = rate_limiter.entry_count(),
                "Rate limiter cleanup complete"
            );
        }
    });
}

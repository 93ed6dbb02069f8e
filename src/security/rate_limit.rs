use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use dashmap::{DashMap, mapref::entry::Entry};

use crate::config::RateLimitConfig;
use crate::errors::AppError;
use crate::logging::SanitizedIpAddr;

/// Tracked clients above which expired windows are swept before counting.
const PRUNE_THRESHOLD: usize = 10_000;

/// Fixed-window request counter keyed by client address.
#[derive(Clone)]
pub struct RateLimiterState {
    max_requests: u32,
    window: Duration,
    trusted_proxies: Arc<[IpAddr]>,
    prune_threshold: usize,
    buckets: Arc<DashMap<IpAddr, RateWindow>>,
}

impl RateLimiterState {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_requests: config.burst.get(),
            window: config.window,
            trusted_proxies: config.trusted_proxies.into(),
            prune_threshold: PRUNE_THRESHOLD,
            buckets: Arc::new(DashMap::new()),
        }
    }

    #[cfg(test)]
    fn with_prune_threshold(mut self, threshold: usize) -> Self {
        self.prune_threshold = threshold;
        self
    }

    fn register(&self, ip: IpAddr, now: Instant) -> Result<(), Duration> {
        if self.buckets.len() >= self.prune_threshold {
            self.prune_expired(now);
        }

        match self.buckets.entry(ip) {
            Entry::Occupied(mut entry) => {
                let bucket = entry.get_mut();
                let elapsed = now.saturating_duration_since(bucket.started_at);

                if elapsed >= self.window {
                    bucket.started_at = now;
                    bucket.hits = 0;
                }

                if bucket.hits >= self.max_requests {
                    let retry_after = self.window.saturating_sub(elapsed.min(self.window));
                    return Err(retry_after);
                }

                bucket.hits += 1;
                Ok(())
            }
            Entry::Vacant(entry) => {
                entry.insert(RateWindow {
                    started_at: now,
                    hits: 1,
                });
                Ok(())
            }
        }
    }

    /// Must not run while an entry guard is held; `retain` locks every shard.
    fn prune_expired(&self, now: Instant) {
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| now.saturating_duration_since(bucket.started_at) < self.window);
        tracing::debug!(
            before,
            after = self.buckets.len(),
            "Pruned expired rate limit windows"
        );
    }
}

pub async fn enforce_rate_limit(
    State(state): State<RateLimiterState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_ip = select_client_ip(request.headers(), addr.ip(), &state.trusted_proxies);

    if let Err(retry_after) = state.register(client_ip, Instant::now()) {
        tracing::debug!(
            client_ip = %SanitizedIpAddr::new(client_ip),
            "Client exhausted its request window"
        );

        return Err(AppError::RateLimitExceeded {
            retry_after: Some(retry_after.max(Duration::from_secs(1))),
        });
    }

    Ok(next.run(request).await)
}

/// Forwarding headers are only believed when the connecting peer is a trusted proxy.
fn select_client_ip(headers: &HeaderMap, peer: IpAddr, trusted: &[IpAddr]) -> IpAddr {
    if !trusted.contains(&peer) {
        return peer;
    }

    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| nearest_untrusted_hop(raw, trusted));

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .and_then(|ip| ip.trim().parse().ok());

    forwarded.or(real_ip).unwrap_or(peer)
}

/// Walks the chain from the right; everything left of an untrusted hop is client-supplied.
fn nearest_untrusted_hop(raw: &str, trusted: &[IpAddr]) -> Option<IpAddr> {
    for hop in raw.rsplit(',') {
        let ip = hop.trim().parse::<IpAddr>().ok()?;
        if !trusted.contains(&ip) {
            return Some(ip);
        }
    }
    None
}

#[derive(Debug)]
struct RateWindow {
    started_at: Instant,
    hits: u32,
}

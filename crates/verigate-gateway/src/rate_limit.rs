use crate::error::AppError;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;
use jiff::Timestamp;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;
use verigate_core::{Clock, SystemClock};

#[derive(Debug, Clone, TypedBuilder)]
pub struct RateLimitSettings {
    /// Requests admitted per key within one window.
    #[builder(default = 60)]
    pub limit: u32,
    #[builder(default = Duration::from_secs(60))]
    pub window: Duration,
    /// Key count above which the oldest half of the table is dropped.
    #[builder(default = 10_000)]
    pub max_keys: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted { remaining: u32 },
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Timestamp,
    count: u32,
    /// Insertion order, used for compaction.
    seq: u64,
}

/// Fixed-window request counter keyed by client address.
///
/// Each key's window starts at its first request and resets on its own
/// wall clock. Concurrent requests on one key may under-count slightly.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    next_seq: AtomicU64,
    settings: RateLimitSettings,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: RateLimitSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            windows: DashMap::new(),
            next_seq: AtomicU64::new(0),
            settings,
            clock,
        }
    }

    /// Counts one request for `key` and decides whether to admit it.
    pub fn check(&self, key: &str) -> Admission {
        let now = self.clock.now();
        let admission = {
            let mut window = self.windows.entry(key.to_owned()).or_insert_with(|| Window {
                started_at: now,
                count: 0,
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            });

            let elapsed = now.duration_since(window.started_at);
            let window_len = jiff::SignedDuration::try_from(self.settings.window)
                .unwrap_or(jiff::SignedDuration::MAX);
            if elapsed >= window_len || elapsed.is_negative() {
                window.started_at = now;
                window.count = 0;
            }

            if window.count < self.settings.limit {
                window.count += 1;
                Admission::Admitted {
                    remaining: self.settings.limit - window.count,
                }
            } else {
                let remaining = window_len - now.duration_since(window.started_at);
                Admission::Limited {
                    retry_after: Duration::try_from(remaining).unwrap_or(Duration::ZERO),
                }
            }
        };

        if self.windows.len() > self.settings.max_keys {
            self.compact();
        }
        admission
    }

    /// Drops the older half of the keys by insertion order.
    fn compact(&self) {
        let mut seqs: Vec<u64> = self.windows.iter().map(|entry| entry.seq).collect();
        seqs.sort_unstable();
        let Some(&cutoff) = seqs.get(seqs.len() / 2) else {
            return;
        };
        self.windows.retain(|_, window| window.seq >= cutoff);
        debug!(before = seqs.len(), after = self.windows.len(), "rate limit table compacted");
    }

    /// Number of tracked keys.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

/// Picks the client key: first `X-Forwarded-For` entry, else the peer address.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|first| !first.is_empty())
        .map(str::to_owned)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Middleware admitting requests through the [`RateLimiter`].
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), peer);

    match limiter.check(&key) {
        Admission::Admitted { .. } => next.run(request).await,
        Admission::Limited { retry_after } => {
            warn!(client = %key, "rate limit exceeded");
            AppError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            }
            .into_response()
        }
    }
}

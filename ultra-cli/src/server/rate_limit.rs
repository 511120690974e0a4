//! Fixed-window request limiting per client identity.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tracing::warn;

use super::error::ApiError;
use super::AppContext;

/// Shared hit counter. `hit` must increment and read in one atomic step so
/// concurrent instances sharing the store agree on the count.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Record one request for `key` and return the count in its current
    /// window. A window older than `window` restarts at 1.
    async fn hit(&self, key: &str, now: DateTime<Utc>, window: Duration) -> Result<u32>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: DateTime<Utc>,
    count: u32,
}

#[derive(Debug, Default)]
struct Counters {
    windows: HashMap<String, Window>,
    hits_since_prune: u32,
}

const PRUNE_EVERY: u32 = 100;

/// Process-local store; updates are serialized behind one mutex.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    inner: Mutex<Counters>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_keys(&self) -> usize {
        self.inner.lock().map(|c| c.windows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn hit(&self, key: &str, now: DateTime<Utc>, window: Duration) -> Result<u32> {
        let mut counters = self.inner.lock().map_err(|_| anyhow!("rate limit counters poisoned"))?;

        counters.hits_since_prune += 1;
        if counters.hits_since_prune >= PRUNE_EVERY {
            counters.hits_since_prune = 0;
            counters.windows.retain(|_, w| now - w.start <= window);
        }

        let entry = counters
            .windows
            .entry(key.to_string())
            .or_insert(Window { start: now, count: 0 });
        if now - entry.start > window {
            *entry = Window { start: now, count: 0 };
        }
        entry.count += 1;
        Ok(entry.count)
    }
}

pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, max_requests: u32, window_secs: u64) -> Self {
        Self {
            store,
            max_requests,
            window: Duration::seconds(window_secs as i64),
        }
    }

    pub fn in_memory(max_requests: u32, window_secs: u64) -> Self {
        Self::new(Arc::new(MemoryCounterStore::new()), max_requests, window_secs)
    }

    /// A failing store lets the request through.
    pub async fn check(&self, client: &str, now: DateTime<Utc>) -> Result<(), ApiError> {
        match self.store.hit(client, now, self.window).await {
            Ok(count) if count > self.max_requests => {
                warn!(client, count, "rate limit exceeded");
                Err(ApiError::RateLimited {
                    retry_after_secs: self.window.num_seconds().max(1) as u64,
                })
            }
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(error = %e, "rate limit store unavailable");
                Ok(())
            }
        }
    }
}

/// First `x-forwarded-for` entry, else the peer address, else "unknown".
pub fn client_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn enforce(State(ctx): State<AppContext>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_identity(req.headers(), peer);

    match ctx.limiter.check(&client, Utc::now()).await {
        Ok(()) => next.run(req).await,
        Err(e) => e.into_response(),
    }
}

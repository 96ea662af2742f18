//! Fixed-window limiter for `/api/chat`, keyed by client IP.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use tokio::sync::Mutex;

use super::handlers::error_response;

/// Tracked clients above which expired windows are swept before admitting a
/// new address.
const SWEEP_THRESHOLD: usize = 10_000;
const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    Allowed,
    Limited { retry_after: Duration },
}

#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    opened: Instant,
    requests: u32,
}

#[derive(Clone)]
pub(crate) struct ChatRateLimiter {
    per_minute: u32,
    window: Duration,
    clients: Arc<Mutex<HashMap<IpAddr, ClientWindow>>>,
}

impl ChatRateLimiter {
    /// `per_minute == 0` admits everything.
    pub(crate) fn new(per_minute: u32) -> Self {
        Self::with_window(per_minute, WINDOW)
    }

    fn with_window(per_minute: u32, window: Duration) -> Self {
        Self {
            per_minute,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.per_minute == 0
    }

    pub(crate) async fn admit(&self, ip: IpAddr, now: Instant) -> Admission {
        if self.is_disabled() {
            return Admission::Allowed;
        }

        let mut clients = self.clients.lock().await;
        if clients.len() >= SWEEP_THRESHOLD && !clients.contains_key(&ip) {
            let window = self.window;
            clients.retain(|_, w| now.duration_since(w.opened) < window);
        }

        let slot = clients.entry(ip).or_insert(ClientWindow {
            opened: now,
            requests: 0,
        });
        let elapsed = now.duration_since(slot.opened);
        if elapsed >= self.window {
            *slot = ClientWindow {
                opened: now,
                requests: 0,
            };
        }
        if slot.requests >= self.per_minute {
            return Admission::Limited {
                retry_after: self.window.saturating_sub(now.duration_since(slot.opened)),
            };
        }
        slot.requests += 1;
        Admission::Allowed
    }
}

fn client_ip(req: &Request<Body>) -> IpAddr {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ci| ci.0.ip())
}

pub(crate) async fn limit_chat_requests(
    State(limiter): State<ChatRateLimiter>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = client_ip(&req);
    match limiter.admit(ip, Instant::now()).await {
        Admission::Allowed => next.run(req).await,
        Admission::Limited { retry_after } => {
            let secs = retry_after.as_secs().max(1);
            tracing::warn!(%ip, retry_after_secs = secs, "chat request rejected by rate limit");
            let mut resp = error_response(
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests",
                Some(format!(
                    "limit is {} chat requests per minute",
                    limiter.per_minute
                )),
            );
            resp.headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            resp
        }
    }
}

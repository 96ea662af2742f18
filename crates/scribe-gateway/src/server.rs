use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

use scribe_core::ChatService;
use scribe_core::config::GatewayConfig;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::limiter::ChatRateLimiter;
use crate::router::build_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub chat: ChatService,
    pub started_at: Instant,
}

/// HTTP front end for a [`ChatService`].
pub struct GatewayServer {
    addr: SocketAddr,
    limiter: ChatRateLimiter,
    max_body_size: usize,
    chat: ChatService,
    shutdown_rx: watch::Receiver<bool>,
}

/// An unparsable bind address falls back to loopback on the same port.
fn resolve_addr(bind: &str, port: u16) -> SocketAddr {
    match bind.parse::<IpAddr>() {
        Ok(ip) => {
            if ip.is_unspecified() {
                tracing::info!(%ip, "chat gateway exposed on all interfaces");
            }
            SocketAddr::new(ip, port)
        }
        Err(e) => {
            tracing::warn!(bind, error = %e, "invalid gateway bind address, using loopback");
            SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
        }
    }
}

/// Resolves once `rx` reads `true`. A dropped sender never resolves.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            break;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
    tracing::info!("chat gateway draining connections");
}

impl GatewayServer {
    #[must_use]
    pub fn new(
        config: &GatewayConfig,
        chat: ChatService,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            addr: resolve_addr(&config.bind, config.port),
            limiter: ChatRateLimiter::new(config.rate_limit),
            max_body_size: config.max_body_size,
            chat,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until the shutdown channel flips to `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind or the server hits a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(self.addr.to_string(), e))?;
        let local = listener.local_addr().unwrap_or(self.addr);
        tracing::info!(
            addr = %local,
            max_body_size = self.max_body_size,
            "chat gateway listening"
        );

        let state = AppState {
            chat: self.chat,
            started_at: Instant::now(),
        };
        let app = build_router(state, self.limiter, self.max_body_size)
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(self.shutdown_rx))
            .await
            .map_err(|e| GatewayError::Server(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use scribe_docs::IndexHandle;
    use scribe_llm::any::AnyProvider;
    use scribe_llm::mock::MockProvider;

    use super::*;

    fn chat() -> ChatService {
        ChatService::new(
            IndexHandle::new(),
            Arc::new(AnyProvider::Mock(MockProvider::default())),
        )
    }

    fn gateway_config(bind: &str, port: u16) -> GatewayConfig {
        GatewayConfig {
            bind: bind.into(),
            port,
            ..GatewayConfig::default()
        }
    }

    #[test]
    fn settings_come_from_config() {
        let (_tx, rx) = watch::channel(false);
        let config = GatewayConfig {
            rate_limit: 0,
            max_body_size: 512,
            ..gateway_config("0.0.0.0", 3000)
        };
        let server = GatewayServer::new(&config, chat(), rx);

        assert!(server.limiter.is_disabled());
        assert_eq!(server.max_body_size, 512);
        assert_eq!(server.addr(), SocketAddr::from(([0, 0, 0, 0], 3000)));
    }

    #[test]
    fn invalid_bind_falls_back_to_loopback() {
        assert_eq!(
            resolve_addr("not_an_ip", 9999),
            SocketAddr::from(([127, 0, 0, 1], 9999))
        );
        assert_eq!(
            resolve_addr("::1", 8080),
            "[::1]:8080".parse::<SocketAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn shutdown_waits_for_true() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_shutdown(rx));
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn stops_on_shutdown_signal() {
        let (tx, rx) = watch::channel(false);
        let server = GatewayServer::new(&gateway_config("127.0.0.1", 0), chat(), rx);
        let handle = tokio::spawn(server.serve());
        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}

//! HTTP server with bounded graceful shutdown

use crate::middleware::{apply_middleware, MiddlewareConfig};
use crate::{Result, ServerError};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

pub struct HttpServer {
    addr: SocketAddr,
    router: Router,
}

impl HttpServer {
    pub fn builder() -> HttpServerBuilder {
        HttpServerBuilder::new()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind and serve in the background until `shutdown` is cancelled
    pub async fn spawn(self, shutdown: CancellationToken) -> Result<ServerHandle> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(ServerError::BindError)?;
        Ok(self.spawn_on(listener, shutdown))
    }

    /// Serve on an already bound listener in the background
    pub fn spawn_on(self, listener: TcpListener, shutdown: CancellationToken) -> ServerHandle {
        let task = tokio::spawn(self.serve_on(listener, shutdown.clone()));
        ServerHandle { task, shutdown }
    }

    /// Serve until `shutdown` is cancelled and every open connection has
    /// closed. Nothing bounds the second part; use [`ServerHandle::wait`]
    /// when the caller needs a deadline.
    pub async fn serve_on(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        info!("HTTP server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(ServerError::BindError)?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// A server running in the background
pub struct ServerHandle {
    task: JoinHandle<Result<()>>,
    shutdown: CancellationToken,
}

impl ServerHandle {
    /// Wait for the server to stop.
    ///
    /// Returns as soon as the server exits on its own. Once the shutdown
    /// token is cancelled, open connections get up to `grace` to finish;
    /// the server is aborted after that. Returns false if it was aborted.
    pub async fn wait(mut self, grace: Duration) -> Result<bool> {
        tokio::select! {
            joined = &mut self.task => return joined?.map(|()| true),
            _ = self.shutdown.cancelled() => {}
        }

        match tokio::time::timeout(grace, &mut self.task).await {
            Ok(joined) => joined?.map(|()| true),
            Err(_) => {
                warn!("HTTP connections still open after {:?}, aborting", grace);
                self.task.abort();
                Ok(false)
            }
        }
    }
}

pub struct HttpServerBuilder {
    bind: String,
    router: Option<Router>,
    middleware_config: MiddlewareConfig,
}

impl HttpServerBuilder {
    pub fn new() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            router: None,
            middleware_config: MiddlewareConfig::default(),
        }
    }

    /// Set bind address (`host:port`)
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = addr.into();
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn middleware(mut self, config: MiddlewareConfig) -> Self {
        self.middleware_config = config;
        self
    }

    pub fn build(self) -> Result<HttpServer> {
        let addr: SocketAddr = self
            .bind
            .parse()
            .map_err(|_| ServerError::InvalidBind(self.bind.clone()))?;

        let router = apply_middleware(self.router.unwrap_or_default(), self.middleware_config);

        Ok(HttpServer { addr, router })
    }
}

impl Default for HttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{create_router, AppState};
    use ps_cache::{CacheKey, DescriptorStore, MemoryCache};
    use ps_core::Descriptor;
    use std::sync::Arc;
    use std::time::Instant;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    async fn server_with_one_descriptor() -> HttpServer {
        let cache = Arc::new(MemoryCache::new());
        cache
            .set(
                CacheKey::Available,
                vec![Descriptor::parse("vless://u@1.2.3.4:443?security=tls#A").unwrap()],
            )
            .await;

        HttpServer::builder()
            .router(create_router(AppState::new(cache)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_invalid_bind_rejected() {
        let result = HttpServer::builder().bind("not an address").build();
        assert!(matches!(result, Err(ServerError::InvalidBind(_))));
    }

    #[test]
    fn test_default_bind() {
        let server = HttpServer::builder().build().unwrap();
        assert_eq!(server.addr().port(), 8080);
    }

    #[tokio::test]
    async fn test_serves_until_cancelled() {
        let server = server_with_one_descriptor().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let handle = server.spawn_on(listener, token.clone());

        let body: Vec<String> = reqwest::get(format!("http://{}/configs", addr))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body, vec!["vless://u@1.2.3.4:443?security=tls#A"]);

        token.cancel();
        assert!(handle.wait(Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_half_written_request_does_not_block_shutdown() {
        let server = server_with_one_descriptor().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let token = CancellationToken::new();
        let handle = server.spawn_on(listener, token.clone());

        // Headers never terminated, so the connection stays busy
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /configs HTTP/1.1\r\nHost: x\r\n")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let start = Instant::now();
        token.cancel();
        let drained = tokio::time::timeout(
            Duration::from_secs(5),
            handle.wait(Duration::from_millis(300)),
        )
        .await
        .expect("server kept running past its grace period")
        .unwrap();

        assert!(!drained);
        assert!(start.elapsed() < Duration::from_secs(2));
        drop(stream);
    }

    #[tokio::test]
    async fn test_wait_returns_when_server_exits_without_cancel() {
        let server = server_with_one_descriptor().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let token = CancellationToken::new();
        let handle = server.spawn_on(listener, token.clone());
        handle.task.abort();

        // An aborted task surfaces as a task error, not a hang
        let result = tokio::time::timeout(Duration::from_secs(5), handle.wait(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(matches!(result, Err(ServerError::Task(_))));
    }
}

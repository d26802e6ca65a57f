//! Test utilities for fcr-client
//!
//! Provides helpers for running integration tests against a fake backend
//! served from an axum router.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::{FcrClient, Result};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: FcrClient,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve an axum Router on an ephemeral local port
    ///
    /// # Example
    ///
    /// ```ignore
    /// use axum::{routing::post, Json, Router};
    /// use fcr_client::testing::TestServer;
    ///
    /// let router = Router::new().route(
    ///     "/rosco/heartbeat",
    ///     post(|| async { Json(serde_json::json!({})) }),
    /// );
    /// let server = TestServer::start(router).await?;
    /// server.client.heartbeat().await?;
    /// ```
    pub async fn start<S>(router: axum::Router<S>) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        Self::start_with_timeout(router, Duration::from_secs(5), Duration::from_secs(2)).await
    }

    /// Serve a router with custom client timeouts
    pub async fn start_with_timeout<S>(
        router: axum::Router<S>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self>
    where
        S: Clone + Send + Sync + 'static,
        axum::Router<S>: Into<axum::Router>,
    {
        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let router: axum::Router = router.into();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        let base_url = format!("http://{}", addr);
        let client = FcrClient::with_config(&base_url, timeout, connect_timeout)?;

        Ok(Self {
            addr,
            client,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Get the base URL of the test server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get a reference to the client
    pub fn client(&self) -> &FcrClient {
        &self.client
    }

    /// Shutdown the server gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;

    #[tokio::test]
    async fn test_server_serves_router() {
        let router = axum::Router::new().route("/config/ports", get(|| async {
            axum::Json(serde_json::json!({"ports": ["/dev/ttyUSB0"]}))
        }));
        let server = TestServer::start(router).await.unwrap();
        assert!(server.base_url().starts_with("http://127.0.0.1:"));

        let ports = server.client().list_ports().await.unwrap();
        assert_eq!(ports.ports, vec!["/dev/ttyUSB0".to_string()]);
        server.shutdown().await;
    }
}

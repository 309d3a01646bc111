//! The standalone HTTP bridge: serves the default registry's exposition
//! text on `/metrics` (spec §4.7, §6). Feature-gated behind `standalone`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

use crate::registry::Registry;

/// Configuration for the standalone server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The port to bind to (default: 9090).
    pub port: u16,
    /// The host to bind to (default: `"0.0.0.0"`).
    pub host: String,
    /// Path for the metrics endpoint (default: `"/metrics"`).
    pub metrics_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9090,
            host: "0.0.0.0".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

/// Builder for [`StandaloneServer`].
#[derive(Default)]
pub struct StandaloneServerBuilder {
    config: ServerConfig,
}

impl StandaloneServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.config.metrics_path = path.into();
        self
    }

    pub fn build(self, registry: &'static Registry) -> StandaloneServer {
        StandaloneServer {
            config: self.config,
            registry,
        }
    }
}

/// A standalone HTTP server that exposes one registry's `bridge()`
/// output on `/metrics`. Any other path is a `404`.
pub struct StandaloneServer {
    config: ServerConfig,
    registry: &'static Registry,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(String),
    #[error("server error: {0}")]
    Serve(String),
}

impl StandaloneServer {
    pub fn builder() -> StandaloneServerBuilder {
        StandaloneServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn run(&self) -> Result<(), ServerError> {
        let app = self.create_router();
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = TcpListener::bind(&addr).await.map_err(|e| ServerError::Bind(e.to_string()))?;

        tracing::info!(addr = %listener.local_addr().unwrap(), "metrics server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        Ok(())
    }

    fn create_router(&self) -> Router {
        let registry = self.registry;
        Router::new().route(&self.config.metrics_path, get(move || metrics_handler(registry)))
    }
}

async fn metrics_handler(registry: &'static Registry) -> Response {
    let body = registry.bridge();
    if body.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults_match_convention() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.metrics_path, "/metrics");
    }

    #[test]
    fn builder_overrides_defaults() {
        static REGISTRY: std::sync::OnceLock<Registry> = std::sync::OnceLock::new();
        let registry = REGISTRY.get_or_init(|| Registry::new("http_test").unwrap());
        let server = StandaloneServer::builder().port(3000).host("127.0.0.1").build(registry);
        assert_eq!(server.config().port, 3000);
        assert_eq!(server.config().host, "127.0.0.1");
    }
}

//! Proxy server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::router::{AppState, create_router};
use crate::cache::SharedCache;
use crate::chat::ChatService;
use crate::config::Config;
use crate::provider::{ChatProvider, OpenAiCompatibleProvider};
use crate::{Error, Result};

/// FlightDesk chat proxy server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Chat dispatcher shared by all handlers
    chat: Arc<ChatService>,
}

impl Gateway {
    /// Create a gateway talking to the configured upstream provider
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream provider cannot be configured.
    pub fn new(config: Config) -> Result<Self> {
        let provider = Arc::new(OpenAiCompatibleProvider::new(&config.upstream)?);
        Ok(Self::with_provider(config, provider))
    }

    /// Create a gateway around an explicit provider
    #[must_use]
    pub fn with_provider(config: Config, provider: Arc<dyn ChatProvider>) -> Self {
        let cache = SharedCache::from_config(&config.cache);
        let chat = Arc::new(ChatService::from_config(&config, cache, provider));
        Self { config, chat }
    }

    /// Router serving this gateway's endpoints
    #[must_use]
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            chat: Arc::clone(&self.chat),
        });
        create_router(state, &self.config.server)
    }

    /// Run the gateway until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let app = self.router();
        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("FLIGHTDESK CHAT PROXY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(
            base_url = %self.config.upstream.base_url,
            model = %self.config.upstream.model,
            "Upstream provider"
        );
        if self.config.cache.enabled {
            info!(
                max_entries = self.config.cache.max_entries,
                ttl_secs = self.config.cache.ttl.as_secs(),
                "Response cache enabled"
            );
        } else {
            warn!("Response cache disabled - every question goes upstream");
        }
        info!(
            "  POST http://{}:{}/api/chat",
            self.config.server.host, self.config.server.port
        );
        info!("============================================================");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| Error::Internal(e.to_string()))?;

        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}

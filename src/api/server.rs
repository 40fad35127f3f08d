//! API server using Axum

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::Config;
use crate::database::Database;
use crate::error::{Result, TallyError};
use crate::live::{BroadcastDispatcher, ConnectionRegistry};
use crate::store::{PollStore, ViewerStore};
use crate::voting::VoteSessionGuard;

use super::middleware::{cors_layer, SessionAuth};
use super::routes;

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub session: SessionAuth,
    pub store: Arc<dyn PollStore>,
    pub viewers: Arc<dyn ViewerStore>,
    pub guard: Arc<VoteSessionGuard>,
    pub registry: Arc<ConnectionRegistry>,
    pub dispatcher: Arc<BroadcastDispatcher>,
}

/// The polling server
pub struct TallyServer {
    state: AppState,
}

impl TallyServer {
    /// Wire up shared state
    ///
    /// The registry is owned here and reaches handlers only through the
    /// dispatcher and the state, never via ambient lookup.
    pub fn new(
        config: Config,
        db: Database,
        store: Arc<dyn PollStore>,
        viewers: Arc<dyn ViewerStore>,
    ) -> Self {
        let session = SessionAuth::new(&config.auth.jwt_secret);
        let guard = Arc::new(VoteSessionGuard::new(store.clone()));
        let registry = Arc::new(ConnectionRegistry::new());
        let dispatcher = Arc::new(BroadcastDispatcher::new(registry.clone()));

        let state = AppState {
            db,
            config,
            session,
            store,
            viewers,
            guard,
            registry,
            dispatcher,
        };

        Self { state }
    }

    /// Build the router
    fn build_router(&self) -> Router {
        let cors = cors_layer(&self.state.config.server.cors_origins);

        routes::create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal flips
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.state.config.server.host, self.state.config.server.port
        )
        .parse()
        .map_err(|_| TallyError::InvalidConfig("invalid server address".into()))?;

        let router = self.build_router();

        info!("Server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| TallyError::Internal(e.to_string()))?;

        info!("Server shut down");
        Ok(())
    }
}

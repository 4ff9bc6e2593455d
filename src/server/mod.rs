//! HTTP surface for the analysis service.
//!
//! - `POST /generate-content` streams analysis events over SSE
//! - `GET /history` lists the caller's recent analyses
//! - `GET /health` for container orchestration

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Settings;
use crate::identity::IdentityResolver;
use crate::services::AnalysisService;

/// Default number of history entries returned when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Largest history page a client may request.
pub const MAX_HISTORY_LIMIT: usize = 100;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
    pub identity: Arc<dyn IdentityResolver>,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
}

impl AppState {
    pub fn new(service: Arc<AnalysisService>, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            service,
            identity,
            body_limit: crate::config::ServerConfig::default().body_limit,
        }
    }

    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let service = AnalysisService::from_settings(settings)?;
        let identity: Arc<dyn IdentityResolver> = Arc::from(settings.identity.build());
        Ok(Self::new(Arc::new(service), identity).with_body_limit(settings.server.body_limit))
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::from_settings(settings)?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! Server crate provides HTTP server functionality.
//!
//! This module implements the JSON API of the restringing marketplace on top of
//! [`service::MarketplaceService`]: cookie sessions, role gates, error mapping,
//! the static frontend and Prometheus metrics.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use auth::SessionKeys;
use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use model::Actor;
use service::MarketplaceService;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod session;

use error::ApiError;
use handlers::{account, admin, assets, orders, partner};
pub use metrics::Metrics;

/// Application state shared between request handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: MarketplaceService,
    pub sessions: Arc<SessionKeys>,
    pub static_dir: PathBuf,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// # Errors
    /// Fails if the metrics registry cannot be built.
    pub fn new(service: MarketplaceService, sessions: SessionKeys, static_dir: impl Into<PathBuf>) -> Result<Self> {
        let metrics = Metrics::new().context("Failed to create metrics registry")?;
        Ok(Self {
            service,
            sessions: Arc::new(sessions),
            static_dir: static_dir.into(),
            metrics: Arc::new(metrics),
        })
    }

    /// Signs a session for `actor` and renders it as a `Set-Cookie` value.
    pub(crate) fn session_cookie(&self, actor: Actor) -> Result<String, ApiError> {
        let token = self.sessions.issue(actor).map_err(ApiError::internal)?;
        Ok(self.sessions.session_cookie(&token))
    }
}

/// Builds the full route table over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth/register", post(account::register))
        .route("/api/auth/login", post(account::login))
        .route("/api/auth/logout", post(account::logout))
        .route("/api/auth/me", get(account::me))
        .route("/api/services", get(orders::list_services))
        .route("/api/orders", post(orders::create_order))
        .route("/api/orders/my", get(orders::my_orders))
        .route("/api/orders/{id}", get(orders::order_detail))
        .route("/api/coupons/validate", post(orders::validate_coupon))
        .route("/api/partner/register", post(partner::register))
        .route("/api/partner/orders", get(partner::orders))
        .route("/api/partner/orders/{id}/status", put(partner::update_status))
        .route("/api/admin/partners", get(admin::partners))
        .route("/api/admin/partners/{id}/approve", put(admin::approve_partner))
        .route("/api/admin/orders", get(admin::orders))
        .route("/api/admin/orders/{id}/assign", put(admin::assign_partner))
        .route("/api/admin/analytics", get(admin::analytics))
        .route("/health", get(assets::health))
        .route("/metrics", get(assets::metrics))
        .fallback(assets::serve)
        .layer(middleware::from_fn_with_state(state.metrics.clone(), metrics::track))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Server represents the HTTP server of the marketplace.
pub struct Server {
    state: AppState,
    port: u16,
}

impl Server {
    /// Creates a new Server instance.
    ///
    /// # Arguments
    ///
    /// * `port` - The port on which the server will listen
    /// * `state` - Service, session keys, static directory and metrics
    pub fn new(port: u16, state: AppState) -> Self {
        info!("Initializing HTTP server on port {}", port);
        Self { state, port }
    }

    /// Starts the server and blocks until it's shut down.
    pub async fn start(&self) -> Result<()> {
        let app = router(self.state.clone());

        let listener = TcpListener::bind(("0.0.0.0", self.port))
            .await
            .context("Failed to bind to port")?;

        info!("HTTP server listening on port {}", self.port);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

//! REST API for the exchange service.
//!
//! Provides HTTP endpoints for:
//! - Exchange request creation, listing and decisions
//! - Catalog seeding for standalone runs
//! - Notification listing
//!
//! Clients see the other party's changes on their next poll. Nothing is
//! pushed.

pub mod handlers;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::catalog::SledCatalog;
use crate::config::ServiceConfig;
use crate::notify::NotificationLog;
use crate::service::ExchangeService;
use crate::store::ExchangeRequestStore;

/// Shared state for API handlers.
pub struct ApiState {
    /// The exchange workflow.
    pub service: ExchangeService,

    /// Catalog backing the workflow's book lookups.
    pub catalog: Arc<SledCatalog>,

    /// Notification log the workflow writes to.
    pub notifications: Arc<NotificationLog>,
}

impl ApiState {
    pub fn new(
        service: ExchangeService,
        catalog: Arc<SledCatalog>,
        notifications: Arc<NotificationLog>,
    ) -> Self {
        Self {
            service,
            catalog,
            notifications,
        }
    }

    /// Open the sled database under the configured data directory.
    pub fn open(config: ServiceConfig) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let db = Arc::new(sled::open(config.db_path())?);
        Self::from_db(db, config)
    }

    /// Wire the workflow, catalog and notification log to one database.
    pub fn from_db(db: Arc<sled::Db>, config: ServiceConfig) -> anyhow::Result<Self> {
        let catalog = Arc::new(SledCatalog::open(&db)?);
        let notifications = Arc::new(NotificationLog::open(&db)?);
        let store = ExchangeRequestStore::open(&db)?;
        let service = ExchangeService::new(store, catalog.clone(), notifications.clone(), config);

        Ok(Self::new(service, catalog, notifications))
    }
}

/// Build the API router with all routes.
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status", get(handlers::status::health))
        // Exchange workflow
        .route("/exchange/request", post(handlers::exchange::create_request))
        .route("/exchange/requests", get(handlers::exchange::list_requests))
        .route("/exchange/:id", get(handlers::exchange::get_request))
        .route("/exchange/:id/status", post(handlers::exchange::update_status))
        // Catalog
        .route(
            "/books/:id",
            put(handlers::books::put_book)
                .get(handlers::books::get_book)
                .delete(handlers::books::delete_book),
        )
        // Notifications
        .route("/notifications", get(handlers::notifications::list_notifications))
        // Middleware
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                })
                // Only log responses that are not a success
                .on_request(())
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        let status = response.status();
                        if !status.is_success() {
                            tracing::warn!(
                                status = %status,
                                latency_ms = latency.as_millis(),
                                "request failed"
                            );
                        }
                    },
                ),
        )
        .with_state(state)
}

/// Start the API server.
pub async fn serve(state: Arc<ApiState>, bind_addr: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;

    tracing::info!("Exchange API listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}

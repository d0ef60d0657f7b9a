//! HTTP API server for Flowdeck.
//!
//! Exposes workflow CRUD, job listing/triggering, and the policy test
//! endpoint used by the editor's policy panel.
//!
//! # Example
//!
//! ```ignore
//! use flowdeck_server::{Server, ServerConfig};
//!
//! let state = AppState::new(store, evaluator, ServerConfig::new(None));
//! Server::from_state(state).run().await?;
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod ratelimit;
pub mod routes;
pub mod state;

pub use auth::{AuthError, auth_middleware};
pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use ratelimit::{rate_limit_middleware, request_logging_middleware};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{Router, middleware};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Flowdeck HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            // Health routes (no auth required)
            .merge(routes::health_routes())
            .nest("/api/v1", self.api_routes())
            // Request logging (inner layer, runs first)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                ratelimit::request_logging_middleware,
            ))
            // Rate limiting (outer layer, runs before request logging)
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                ratelimit::rate_limit_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// API routes (v1). All require authentication via the auth middleware.
    fn api_routes(&self) -> Router<AppState> {
        use axum::routing::{get, post};

        Router::new()
            // Workflow endpoints
            .route(
                "/workflows",
                post(routes::create_workflow_handler).get(routes::list_workflows_handler),
            )
            .route(
                "/workflows/{id}",
                get(routes::get_workflow_handler)
                    .put(routes::update_workflow_handler)
                    .delete(routes::delete_workflow_handler),
            )
            .route(
                "/workflows/{id}/trigger",
                post(routes::trigger_workflow_handler),
            )
            // Job endpoints
            .route("/jobs", get(routes::list_jobs_handler))
            .route("/jobs/{id}", get(routes::get_job_handler))
            .route("/jobs/{id}/cancel", post(routes::cancel_job_handler))
            // Policy test endpoint
            .route("/policy/test", post(routes::policy_test_handler))
            // Auth middleware for all API routes
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                auth::auth_middleware,
            ))
    }

    /// Run the server on the configured bind address.
    pub async fn run(self) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.run_on(addr).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        let router = self.router();

        info!("Starting server on {}", addr);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

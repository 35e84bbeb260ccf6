//! HTTP API server for the helpdesk gateway

pub mod admin;
pub mod auth;
pub mod chat;
pub mod health;
pub mod rate_limit;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, Router, http::StatusCode};
use secrecy::SecretString;
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::Result;
use crate::db::{AnalyticsRepo, ChatRepo, DbPool, KnowledgeRepo};
use crate::pipeline::Pipeline;

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub db: DbPool,
    pub pipeline: Arc<Pipeline>,
    pub knowledge_repo: KnowledgeRepo,
    pub chat_repo: ChatRepo,
    pub analytics_repo: AnalyticsRepo,
    pub admin_key: Option<auth::AdminKey>,
    pub rate_limiter: Option<rate_limit::SharedLimiter>,
}

impl ApiState {
    /// Build state over a database and pipeline
    #[must_use]
    pub fn new(db: DbPool, pipeline: Arc<Pipeline>) -> Self {
        Self {
            knowledge_repo: KnowledgeRepo::new(db.clone()),
            chat_repo: ChatRepo::new(db.clone()),
            analytics_repo: AnalyticsRepo::new(db.clone()),
            db,
            pipeline,
            admin_key: None,
            rate_limiter: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Handler error: status plus JSON body
pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(code: &str, message: &str) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        },
    })
}

fn internal_error(e: &crate::Error, message: &str) -> ApiError {
    tracing::error!(error = %e, "{message}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        error_response("internal_error", message),
    )
}

pub struct ApiServerBuilder {
    db: DbPool,
    pipeline: Arc<Pipeline>,
    port: u16,
    api_key: Option<SecretString>,
    static_dir: Option<PathBuf>,
    rate_limit_per_minute: Option<u32>,
}

impl ApiServerBuilder {
    #[must_use]
    pub const fn new(db: DbPool, pipeline: Arc<Pipeline>, port: u16) -> Self {
        Self {
            db,
            pipeline,
            port,
            api_key: None,
            static_dir: None,
            rate_limit_per_minute: None,
        }
    }

    #[must_use]
    pub fn api_key(mut self, key: Option<SecretString>) -> Self {
        self.api_key = key;
        self
    }

    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    #[must_use]
    pub const fn rate_limit(mut self, requests_per_minute: Option<u32>) -> Self {
        self.rate_limit_per_minute = requests_per_minute;
        self
    }

    #[must_use]
    pub fn build(self) -> ApiServer {
        let mut state = ApiState::new(self.db, self.pipeline);
        state.admin_key = self.api_key.map(auth::AdminKey::new);
        state.rate_limiter = self.rate_limit_per_minute.map(rate_limit::create_limiter);

        ApiServer {
            state: Arc::new(state),
            port: self.port,
            static_dir: self.static_dir,
        }
    }
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(chat::router(self.state.clone()))
            .nest("/api/admin", admin::router(self.state.clone()))
            .merge(health::router())
            .merge(health::ready_router(self.state.clone()));

        // Serve the chat widget if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router.layer(cors).layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(
            port = self.port,
            rate_limited = self.state.rate_limiter.is_some(),
            admin_auth = self.state.admin_key.is_some(),
            "API server listening"
        );

        axum::serve(listener, self.router())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

//! HTTP surface: router, auth middleware, rate limiting, session tokens.

pub mod auth;
pub mod handlers;
pub mod rate_limit;
pub mod session;
pub mod types;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::agent::ChatService;
use crate::config::{AuthConfig, Config};
use crate::history::Store;
use rate_limit::RateLimiter;
use session::SessionTokenStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub chat: ChatService,
    pub sessions: SessionTokenStore,
    pub rate_limiter: Arc<RateLimiter>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(store: Store, chat: ChatService, config: &Config) -> Self {
        Self {
            store,
            chat,
            sessions: SessionTokenStore::new(config.auth.session_ttl),
            rate_limiter: Arc::new(RateLimiter::new(config.rate_limit.clone())),
            auth: config.auth.clone(),
        }
    }
}

/// Build the full router. `/health` is open; everything under `/api`
/// (except its health alias) requires a bearer JWT.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/tasks", post(handlers::tasks::create_task))
        .route("/tasks", get(handlers::tasks::list_tasks))
        .route("/tasks/{id}", get(handlers::tasks::get_task))
        .route("/tasks/{id}", axum::routing::patch(handlers::tasks::update_task))
        .route("/tasks/{id}", delete(handlers::tasks::delete_task))
        .route("/tasks/{id}/complete", post(handlers::tasks::complete_task))
        .route(
            "/conversations",
            get(handlers::conversations::list_conversations),
        )
        .route(
            "/conversations",
            post(handlers::conversations::create_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(handlers::conversations::list_messages),
        )
        .route(
            "/conversations/{id}",
            delete(handlers::conversations::delete_conversation),
        )
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/session", post(handlers::chat::create_session))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        // Routes added after the layer call are not wrapped by it; the
        // health alias stays unauthenticated.
        .route("/health", get(handlers::health::health));

    Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind the listener and serve until shutdown is requested.
pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    // SIGINT or SIGTERM, whichever comes first.
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
    tracing::info!("Shutdown signal received");
}

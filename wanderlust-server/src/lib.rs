//! HTTP front end for the Wanderlust travel matcher.
//!
//! # Endpoints
//! - `POST /api/chat`: one quiz-style chat turn. Scores travel with the
//!   client; the server keeps nothing but the rate-limit table.
//! - `POST /api/assistant`: free-form question or `explain` of the top matches.
//! - `POST /api/match`: rank destinations from scores and/or quiz selections.
//! - `GET /api/quiz`: the quiz definition.
//! - `GET /api/health`
//!
//! Every model failure degrades to a deterministic local reply; only rate
//! limiting (429) and malformed chat/match payloads (400) surface as errors.
//!
//! # Running
//! ```sh
//! wanderlust init-config
//! WANDERLUST_LLM_API_KEY=... RUST_LOG=info wanderlust serve
//! ```
use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
};
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod fallback;
pub mod llm;
pub mod prompt;
pub mod routes;
pub mod state;

use error::panic_response;
use routes::{assistant_handler, chat_handler, health_handler, match_handler, quiz_handler};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/assistant", post(assistant_handler))
        .route("/api/match", post(match_handler))
        .route("/api/quiz", get(quiz_handler))
        .route("/api/health", get(health_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(state: Arc<AppState>) -> Result<()> {
    let address = state.config.address();
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("serve")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
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
}

//! HTTP service mode.
//!
//! This module provides:
//! - Configuration types (`config`)
//! - Client identity derivation (`identity`)
//! - Error-to-response mapping (`error`)
//! - The axum router (`routes`)
//!
//! [`serve`] runs the router until the shutdown future resolves, then
//! cancels in-flight provider calls through the orchestrator's root token.

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::future::Future;

use tokio::net::TcpListener;
use tokio::signal;

pub use error::ApiError;
pub use routes::{AppState, router};

use crate::{Result, SportmlError};

/// Serve `state` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let orchestrator = state.orchestrator().clone();
    let app = router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            orchestrator.shutdown();
        })
        .await
        .map_err(|e| SportmlError::Internal(format!("server error: {e}")))
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, shutting down");
        },
        () = terminate => {
            tracing::info!("received terminate signal, shutting down");
        },
    }
}

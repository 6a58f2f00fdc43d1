//! HTTP snapshot publisher: serves the latest world snapshot as JSON.
//!
//! The simulation thread pushes encoded snapshots into a watch channel;
//! the channel keeps only the latest value, so a slow consumer can never
//! block or lag the simulation.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
struct PublisherState {
    snapshot: watch::Receiver<Arc<String>>,
}

/// Serve `GET /snapshot` and `GET /health` on the given port until the
/// process exits.
pub async fn serve(port: u16, snapshot: watch::Receiver<Arc<String>>) -> anyhow::Result<()> {
    let state = PublisherState { snapshot };
    let app = Router::new()
        .route("/snapshot", get(get_snapshot))
        .route("/health", get(get_health))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("snapshot publisher listening on http://{}/snapshot", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn get_snapshot(State(state): State<PublisherState>) -> impl IntoResponse {
    let json = state.snapshot.borrow().clone();
    if json.is_empty() {
        return (StatusCode::SERVICE_UNAVAILABLE, String::new());
    }
    (StatusCode::OK, json.as_ref().clone())
}

async fn get_health() -> &'static str {
    "ok"
}

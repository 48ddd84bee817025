use actix_web::{dev::Server, web, App, HttpServer};
use std::sync::Arc;
use tokio::sync::watch;

use crate::metrics::Metrics;
use crate::store::OrderStore;
use crate::utils::wait_for_shutdown;

mod handlers;

pub use handlers::configure;

// ============================================================================
// Lookup HTTP façade
// ============================================================================
//
// GET /order/{order_uid}  order JSON | 404 | 503
// GET /health
// GET /metrics            Prometheus text format
//
// Read-only: orders only enter the system through the ingest stream.
//
// ============================================================================

pub struct AppState {
    pub store: Arc<OrderStore>,
    pub metrics: Arc<Metrics>,
}

/// Bind the server and return it unstarted. It stops gracefully when the
/// shutdown signal fires; OS signals are left to the caller.
pub fn build_server(
    state: AppState,
    addr: &str,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(addr)?
        .disable_signals()
        .run();

    let handle = server.handle();
    actix_web::rt::spawn(async move {
        wait_for_shutdown(&mut shutdown).await;
        tracing::info!("Stopping HTTP server");
        handle.stop(true).await;
    });

    tracing::info!("Lookup API listening on http://{}", addr);
    Ok(server)
}

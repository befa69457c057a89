pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    BoxError, Router,
    body::Body,
    error_handling::HandleErrorLayer,
    extract::{ConnectInfo, DefaultBodyLimit},
    http::Request,
    middleware::{Next, from_fn},
    response::Response,
    routing::{get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower::timeout::error::Elapsed;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use state::AppState;
use types::ApiError;

/// Access log: one line per request.
async fn access_log(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    // Absent when the router is driven without a socket (tests)
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "-".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        target: "access",
        method = %method,
        path = %path,
        remote = %remote,
        status = response.status().as_u16(),
        latency_us = started.elapsed().as_micros() as u64,
        "request"
    );
    response
}

/// Errors surfacing from the middleware stack (the handlers map their own).
async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::request_timeout()
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        ApiError::internal("Internal error")
    }
}

/// Build the gateway router.
///
/// A request that outlives `request_timeout_ms` is dropped, which rolls back
/// any unit of work it still holds, and answered with 408.
pub fn router(state: Arc<AppState>, config: &GatewayConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/clientes/{id}/transacoes", post(handlers::create_movement))
        .route("/clientes/{id}/extrato", get(handlers::get_statement))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(config.request_timeout()),
        )
        .layer(from_fn(access_log))
}

/// Start HTTP Gateway server
///
/// Runs until ctrl-c; in-flight requests finish before returning.
pub async fn run_server(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = router(state, config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!(%addr, "Gateway listening");
    println!("🚀 Gateway listening on http://{}", addr);
    println!("📖 API Docs: http://{}/docs", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::{extract::FromRef, routing::get, Router};
use prometheus::{Encoder, TextEncoder};
use routes::{categories_router, questions_router, quizzes_router};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::errors::{handle_panic, ApiError};
use super::routes;
use crate::config::ServerSettings;
use crate::db::Store;

const ALLOWED_HEADERS: &str = "Authorization, Content-Type";
const ALLOWED_METHODS: &str = "GET, POST, DELETE, OPTIONS";

#[derive(FromRef, Clone)]
pub struct AppState {
    store: Store,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        .route("/metrics", get(metrics))
        .merge(categories_router())
        .merge(questions_router())
        .merge(quizzes_router())
        .method_not_allowed_fallback(|| async { ApiError::MethodNotAllowed })
        .fallback(|| async {
            tracing::info!("Fallback");
            ApiError::NotFound
        })
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        // replaces the comma-joined lists CorsLayer writes on preflight responses
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(settings: &ServerSettings, state: AppState) -> anyhow::Result<()> {
    let addr = settings.address();
    let listener = TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("Cannot bind to {addr}"))?;

    tracing::info!("Serving on {addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for shutdown signal: {error}");
        std::future::pending::<()>().await;
    }
}

async fn metrics() -> Result<Response, ApiError> {
    let encoder = TextEncoder::new();
    let metrics = prometheus::gather();
    let mut buf = vec![];
    encoder
        .encode(&metrics, &mut buf)
        .map_err(|e| ApiError::Internal(e.into()))?;
    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_owned())],
        buf,
    )
        .into_response())
}

use std::sync::Arc;

use anyhow::{Error, Result};
use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clients::health::HealthChecker,
    error::NotificationError,
    models::{health::HealthStatus, request::NotificationRequest, response::MessageResponse},
    publisher::NotificationPublisher,
};

pub struct AppState {
    pub publisher: NotificationPublisher,
    pub health_checker: HealthChecker,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/notifications",
            get(trigger_test_notification)
                .post(ingest_notification)
                .fallback(bad_request),
        )
        .route("/health", get(health_check))
        .fallback(bad_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_api_server(
    listener: TcpListener,
    state: Arc<AppState>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), Error> {
    let addr = listener.local_addr()?;
    info!(address = %addr, "Notification API server started");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await?;

    info!("Notification API server stopped");
    Ok(())
}

async fn trigger_test_notification(State(state): State<Arc<AppState>>) -> Response {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id = %request_id, "Trigger-test notification requested");

    publish(&state, NotificationRequest::TriggerTest { request_id }).await
}

async fn ingest_notification(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request_id = Uuid::new_v4().to_string();
    info!(request_id = %request_id, "Notification request received");

    match NotificationRequest::from_body(&body, &request_id) {
        Ok(request) => publish(&state, request).await,
        Err(e) => error_response(e),
    }
}

async fn publish(state: &AppState, request: NotificationRequest) -> Response {
    match state.publisher.publish(request).await {
        Ok(receipt) => (StatusCode::OK, Json(MessageResponse::sent(receipt.message_id))).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(error: NotificationError) -> Response {
    if error.is_client_error() {
        info!(error = %error, "Rejected notification request");
        return bad_request_response();
    }

    warn!(error = %error, "Notification request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(MessageResponse::publish_failed()),
    )
        .into_response()
}

async fn bad_request() -> Response {
    bad_request_response()
}

fn bad_request_response() -> Response {
    (StatusCode::BAD_REQUEST, Json(MessageResponse::bad_request())).into_response()
}

async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_checker.check_all();

    let status_code = match health.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

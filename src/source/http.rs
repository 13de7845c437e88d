use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::error::PanelError;
use crate::scheduler::{DisplayRequest, Scheduler, SchedulerStatus};
use crate::source::{dispatch, Dispatched, InboundEvent};

#[derive(Clone)]
pub struct SourceState {
    pub scheduler: Arc<Scheduler>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub origin: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandRequest {
    pub command: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResponse {
    /// False when the token was not a recognised command
    pub applied: bool,
    pub state: String,
}

pub fn router(state: SourceState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/messages", post(submit_message_handler))
        .route("/api/commands", post(command_handler))
        .route("/api/status", get(status_handler))
        .layer(cors)
        .with_state(state)
}

/// Serve the HTTP source until `shutdown` is cancelled.
pub async fn serve(
    addr: SocketAddr,
    state: SourceState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Message source listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

fn rejection(status: StatusCode, error: &PanelError) -> (StatusCode, Json<SubmitResponse>) {
    (
        status,
        Json(SubmitResponse {
            success: false,
            origin: None,
            error: Some(error.to_string()),
        }),
    )
}

async fn submit_message_handler(
    State(state): State<SourceState>,
    Json(request): Json<DisplayRequest>,
) -> impl IntoResponse {
    match dispatch(&state.scheduler, InboundEvent::Display(request)).await {
        Ok(Dispatched::Enqueued(origin)) => (
            StatusCode::ACCEPTED,
            Json(SubmitResponse {
                success: true,
                origin: Some(origin.to_string()),
                error: None,
            }),
        ),
        Ok(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SubmitResponse {
                success: false,
                origin: None,
                error: Some("request was not enqueued".to_string()),
            }),
        ),
        Err(e @ PanelError::MalformedRequest(_)) => rejection(StatusCode::BAD_REQUEST, &e),
        Err(e @ PanelError::QueueFull(_)) => rejection(StatusCode::SERVICE_UNAVAILABLE, &e),
        Err(e @ PanelError::SchedulerEnded) => rejection(StatusCode::CONFLICT, &e),
        Err(e) => rejection(StatusCode::INTERNAL_SERVER_ERROR, &e),
    }
}

async fn command_handler(
    State(state): State<SourceState>,
    Json(payload): Json<CommandRequest>,
) -> impl IntoResponse {
    let event = InboundEvent::Control {
        command: payload.command,
    };
    let applied = matches!(
        dispatch(&state.scheduler, event).await,
        Ok(Dispatched::Applied(_))
    );
    let current = state.scheduler.state().await;

    (
        StatusCode::ACCEPTED,
        Json(CommandResponse {
            applied,
            state: current.to_string(),
        }),
    )
}

async fn status_handler(State(state): State<SourceState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

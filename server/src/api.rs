use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use relay::config::Listener as ListenerConfig;
use relay::{Relay, SubmitError};
use serde::Serialize;
use tokio::net::TcpListener;

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub fn router(relay: Relay) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/waitlist", post(submit))
        .with_state(relay)
}

pub async fn serve(listener: ListenerConfig, relay: Relay) -> Result<(), ApiError> {
    let addr = format!("{}:{}", listener.host, listener.port);
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(relay)).await?;
    Ok(())
}

#[derive(Serialize)]
struct ApiResponse {
    ok: bool,
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Serialize)]
struct ApiErrorResponse {
    ok: bool,
    error: String,
    /// Operator-facing excerpt of the upstream body, only on upstream
    /// failures. Bounded upstream of this type; never the primary message.
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

/// Newtype so the relay's error can carry an HTTP mapping.
struct SubmitFailure(SubmitError);

impl IntoResponse for SubmitFailure {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SubmitError::Misconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            SubmitError::Rejected(_) => StatusCode::BAD_REQUEST,
            SubmitError::Upstream(_) => StatusCode::BAD_GATEWAY,
        };
        let details = match &self.0 {
            SubmitError::Upstream(err) => err.detail().map(str::to_owned),
            _ => None,
        };

        let body = Json(ApiErrorResponse {
            ok: false,
            error: self.0.to_string(),
            details,
        });
        (status, body).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn submit(State(relay): State<Relay>, body: Bytes) -> Result<ApiResponse, SubmitFailure> {
    relay.submit(&body).await.map_err(SubmitFailure)?;
    Ok(ApiResponse { ok: true })
}

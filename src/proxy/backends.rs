//! Runtime backend registration endpoints.
//!
//! Only routed when `--enable-dynamic-backends` is set; in static mode
//! the registry is populated once at startup and these handlers are
//! unreachable. Runtime-registered backends are intentionally lost on
//! restart.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::proxy::registry::{RegisterOutcome, UnregisterOutcome};
use crate::proxy::SprayProxy;

#[derive(Debug, Deserialize)]
pub struct Backend {
    pub url: String,
}

/// `GET /backends` — list the origins currently receiving broadcasts.
pub async fn get_backends(State(proxy): State<Arc<SprayProxy>>) -> String {
    format!(
        "Backend urls: {}",
        proxy.registry().list().await.join(", ")
    )
}

/// `POST /backends` — add an origin to the broadcast set.
pub async fn register_backend(
    State(proxy): State<Arc<SprayProxy>>,
    payload: Result<Json<Backend>, JsonRejection>,
) -> Response {
    let Ok(Json(backend)) = payload else {
        tracing::info!("backend register request rejected, invalid json body");
        return (StatusCode::BAD_REQUEST, "please provide a valid json body").into_response();
    };

    match proxy.registry().register(&backend.url).await {
        Ok(RegisterOutcome::Added) => {
            tracing::info!(backend = %backend.url, "server registered");
            (StatusCode::OK, "registered the backend server").into_response()
        }
        Ok(RegisterOutcome::AlreadyExists) => {
            tracing::info!(backend = %backend.url, "server already registered");
            (StatusCode::FOUND, "backend server already registered").into_response()
        }
        Err(e) => {
            tracing::info!(backend = %backend.url, error = %e, "server register rejected");
            (StatusCode::BAD_REQUEST, "please provide a valid backend url").into_response()
        }
    }
}

/// `DELETE /backends` — remove an origin from the broadcast set.
pub async fn unregister_backend(
    State(proxy): State<Arc<SprayProxy>>,
    payload: Result<Json<Backend>, JsonRejection>,
) -> Response {
    let Ok(Json(backend)) = payload else {
        tracing::info!("backend unregister request rejected, invalid json body");
        return (StatusCode::BAD_REQUEST, "please provide a valid json body").into_response();
    };

    match proxy.registry().unregister(&backend.url).await {
        UnregisterOutcome::Removed => {
            tracing::info!(backend = %backend.url, "server unregistered");
            (StatusCode::OK, "backend server unregistered").into_response()
        }
        UnregisterOutcome::NotFound => {
            tracing::info!(backend = %backend.url, "server not registered");
            (
                StatusCode::NOT_FOUND,
                "backend server not found in the list",
            )
                .into_response()
        }
    }
}

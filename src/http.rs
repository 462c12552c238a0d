//! HTTP surface for atomic batches.
//!
//! Mounts `POST {url_path}` on an axum router. A successful batch answers
//! `200` with the `atomic:results` document; a failed one answers with the
//! error's status and a JSON:API error document.

use crate::atomic::{AtomicOperations, AtomicResponse};
use crate::error::AtomicError;
use crate::operation::AtomicOperationRequest;
use crate::resource::RequestContext;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use log::debug;
use serde_json::Value;

type ErrorResponse = (StatusCode, Json<Value>);

/// Build a router exposing the engine at its configured path.
pub fn router(operations: AtomicOperations) -> Router {
    let path = operations.config().url_path.clone();
    Router::new()
        .route(&path, post(post_operations))
        .with_state(operations)
}

/// Handle one atomic request body.
pub async fn post_operations(
    State(operations): State<AtomicOperations>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AtomicResponse>, ErrorResponse> {
    let context = request_context(&headers);
    debug!(
        "Atomic request of {} byte(s) [{}]",
        body.len(),
        context.request_id
    );

    let request = AtomicOperationRequest::from_slice(&body).map_err(error_response)?;
    operations
        .execute(request, context)
        .await
        .map(Json)
        .map_err(error_response)
}

fn request_context(headers: &HeaderMap) -> RequestContext {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|value| (name, value)))
        .fold(RequestContext::with_generated_id(), |context, (name, value)| {
            context.with_header(name.as_str(), value)
        })
}

fn error_response(error: AtomicError) -> ErrorResponse {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error.to_error_document()))
}

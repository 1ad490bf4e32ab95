//! API error types with HTTP response mapping.
//!
//! This is the only place transport status codes exist; the workflow
//! and store layers never see HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::DomainError;
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or unusable `x-user-id` principal.
    Unauthorized(String),
    /// Checkout workflow error.
    Checkout(CheckoutError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::Internal(msg) => internal_error_response(msg),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, String) {
    match &err {
        CheckoutError::UserNotFound(_)
        | CheckoutError::BookNotFound(_)
        | CheckoutError::OrderNotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CheckoutError::InsufficientInventory { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        CheckoutError::NotAuthorized { .. } => (StatusCode::FORBIDDEN, err.to_string()),
        CheckoutError::AlreadyPaid(_) => (StatusCode::CONFLICT, err.to_string()),
        CheckoutError::Domain(domain_err) => match domain_err {
            DomainError::InvalidStateTransition { .. } => (StatusCode::CONFLICT, err.to_string()),
            _ => (StatusCode::BAD_REQUEST, err.to_string()),
        },
        CheckoutError::Store(_) => internal_error_response(err.to_string()),
    }
}

// Full detail goes to the log; response bodies carry it only in debug
// builds.
fn internal_error_response(detail: String) -> (StatusCode, String) {
    tracing::error!(error = %detail, "internal server error");
    let message = if cfg!(debug_assertions) {
        detail
    } else {
        "Internal server error".to_string()
    };
    (StatusCode::INTERNAL_SERVER_ERROR, message)
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Checkout(CheckoutError::Store(err))
    }
}

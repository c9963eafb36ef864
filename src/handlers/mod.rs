pub mod admin;
pub mod auth;
pub mod blog;
pub mod comment;
pub mod user;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

// Envoltura estándar de error: {"message": "..."} con el status que toque.
// El detalle real queda en los logs, nunca en la respuesta.
pub(crate) fn error_message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

pub(crate) fn bad_request(message: &str) -> Response {
    error_message(StatusCode::BAD_REQUEST, message)
}

pub(crate) fn not_found(message: &str) -> Response {
    error_message(StatusCode::NOT_FOUND, message)
}

pub(crate) fn forbidden(message: &str) -> Response {
    error_message(StatusCode::FORBIDDEN, message)
}

pub(crate) fn internal_error() -> Response {
    error_message(StatusCode::INTERNAL_SERVER_ERROR, "Error interno del servidor")
}

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use paygate_common::error::{body_from_status, ErrorBody, ErrorCode};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

pub fn ok<T: Serialize>(message: &str, data: T) -> Response {
    Json(ApiResponse {
        status: "success",
        message: message.to_string(),
        data,
    })
    .into_response()
}

#[derive(Debug, Serialize)]
pub struct PageMeta {
    pub page: i32,
    pub page_size: i32,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct ApiPageResponse<T: Serialize> {
    pub status: &'static str,
    pub message: String,
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

pub fn page<T: Serialize>(
    message: &str,
    data: Vec<T>,
    page: i32,
    page_size: i32,
    total: i64,
) -> Response {
    Json(ApiPageResponse {
        status: "success",
        message: message.to_string(),
        data,
        pagination: PageMeta {
            page,
            page_size,
            total,
        },
    })
    .into_response()
}

/// Maps the RPC error taxonomy onto the HTTP table: BadRequest 400,
/// Unauthorized 401, NotFound 404, Conflict 409, everything else 500.
pub fn error(status: &tonic::Status) -> Response {
    let body = body_from_status(status);
    let http = StatusCode::from_u16(ErrorCode::from_wire(&body.code).http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (http, Json(body)).into_response()
}

pub fn unauthorized(message: &str) -> Response {
    let body = ErrorBody {
        status: "error".to_string(),
        code: "Unauthorized".to_string(),
        reason: "Unauthorized".to_string(),
        message: message.to_string(),
        correlation_id: uuid::Uuid::new_v4().to_string(),
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

pub fn unhandled_panic() -> Response {
    let body = ErrorBody {
        status: "error".to_string(),
        code: "Internal".to_string(),
        reason: "Unhandled".to_string(),
        message: "internal error".to_string(),
        correlation_id: uuid::Uuid::new_v4().to_string(),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

//! Outbound response envelope.
//!
//! Every terminal outcome, success or failure, leaves the service as
//! ```text
//! { "success": bool, "message": str, "data"?: T, "errors"?: details, "statusCode": int }
//! ```
//! with `statusCode` repeated on the status line.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::ErrorDetails;

/// The JSON body shared by all responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T = ()> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ErrorDetails>,
    pub status_code: u16,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with the default message.
    pub fn ok(data: T) -> Self {
        Self::success(data, "Success", StatusCode::OK)
    }

    pub fn success(data: T, message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            errors: None,
            status_code: status.as_u16(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>, status: StatusCode, errors: Option<ErrorDetails>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            errors,
            status_code: status.as_u16(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

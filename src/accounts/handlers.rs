use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};

use crate::accounts::service::{AuthService, LoginRequest, RegisterRequest, Session};
use crate::accounts::store::UserRecord;
use crate::auth::VerifiedIdentity;
use crate::errors::{ClassifiedError, ErrorDetails, FieldErrors, HandlerError};
use crate::http::response::ApiResponse;

fn body_rejection(rejection: JsonRejection) -> ClassifiedError {
    let mut fields = FieldErrors::new();
    fields.insert("body".into(), rejection.body_text());
    ClassifiedError::validation(ErrorDetails::Fields(fields))
}

pub async fn register(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<ApiResponse<Session>, HandlerError> {
    let Json(request) = payload.map_err(body_rejection)?;
    let session = service.register(request).await?;
    Ok(ApiResponse::success(session, "User registered successfully", StatusCode::CREATED))
}

pub async fn login(
    State(service): State<Arc<AuthService>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<ApiResponse<Session>, HandlerError> {
    let Json(request) = payload.map_err(body_rejection)?;
    let session = service.login(request).await?;
    Ok(ApiResponse::success(session, "Login successful", StatusCode::OK))
}

pub async fn me(
    State(service): State<Arc<AuthService>>,
    identity: VerifiedIdentity,
) -> Result<ApiResponse<UserRecord>, HandlerError> {
    let user = service.current_user(&identity).await?;
    Ok(ApiResponse::ok(user))
}

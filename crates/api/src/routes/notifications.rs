//! Notification CRUD routes.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use courier_common::error::AppError;
use courier_common::response::ApiResponse;
use courier_common::types::Notification;
use courier_engine::validation::{CreateNotificationRequest, UpdateStatusRequest};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/notify", post(create_notification)).route(
        "/notify/{id}",
        get(get_notification)
            .patch(update_notification)
            .delete(delete_notification),
    )
}

/// Path ids arrive as strings so a malformed one gets the JSON envelope
/// instead of axum's plain-text rejection.
fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::Validation("wrong id value".to_string())),
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(v)| v)
        .map_err(|e| AppError::Validation(format!("wrong request body: {}", e.body_text())))
}

/// POST /notify — Validate, persist and schedule a notification.
async fn create_notification(
    State(state): State<AppState>,
    body: Result<Json<CreateNotificationRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<i64>>, AppError> {
    let req = json_body(body)?;
    let notification = req
        .validate(Utc::now(), state.service.min_lead())
        .map_err(AppError::Validation)?;

    let id = state.service.create(notification).await?;
    Ok(Json(ApiResponse::ok(id)))
}

/// GET /notify/:id — Read a notification.
async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Notification>>, AppError> {
    let id = parse_id(&id)?;
    let notification = state.service.get(id).await?;
    Ok(Json(ApiResponse::ok(notification)))
}

/// PATCH /notify/:id — Change the status of a notification.
async fn update_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    let id = parse_id(&id)?;
    let req = json_body(body)?;
    let status = req.validate().map_err(AppError::Validation)?;

    state.service.update_status(status.as_str(), id).await?;
    Ok(Json(ApiResponse::ok("updated")))
}

/// DELETE /notify/:id — Delete a notification and its cached copy.
async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<&'static str>>, AppError> {
    let id = parse_id(&id)?;
    state.service.delete(id).await?;
    Ok(Json(ApiResponse::ok("deleted")))
}

//! `/api/bugs` routes.
//!
//! | Method | Path                      | Success            |
//! |--------|---------------------------|--------------------|
//! | GET    | `/api/bugs`               | 200, newest first  |
//! | POST   | `/api/bugs`               | 201, stored record |
//! | GET    | `/api/bugs/:id`           | 200                |
//! | PUT    | `/api/bugs/:id/status`    | 200                |
//! | PUT    | `/api/bugs/:id/priority`  | 200                |
//! | PUT    | `/api/bugs/:id/metadata`  | 200, keys merged   |
//! | DELETE | `/api/bugs/:id`           | 204                |

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use super::AppState;
use crate::error::{BugError, Result};
use crate::models::{
    BugReport, CreateBugRequest, Metadata, UpdatePriorityRequest, UpdateStatusRequest,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/bugs", get(list_bugs).post(create_bug))
        .route("/api/bugs/:id", get(get_bug).delete(delete_bug))
        .route("/api/bugs/:id/status", put(update_status))
        .route("/api/bugs/:id/priority", put(update_priority))
        .route("/api/bugs/:id/metadata", put(update_metadata))
}

/// Unwrap a JSON body, answering malformed input with the usual error shape.
fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| BugError::validation("body", rejection.body_text()))
}

/// Unwrap the `:id` segment, answering a non-numeric id the same way.
fn bug_id(path: std::result::Result<Path<i64>, PathRejection>) -> Result<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| BugError::validation("id", rejection.body_text()))
}

async fn list_bugs(State(state): State<AppState>) -> Result<Json<Vec<BugReport>>> {
    Ok(Json(state.bugs.list().await?))
}

async fn create_bug(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateBugRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<BugReport>)> {
    let request = body(payload)?;
    let bug = state.bugs.create(request).await?;
    Ok((StatusCode::CREATED, Json(bug)))
}

async fn get_bug(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<Json<BugReport>> {
    let id = bug_id(path)?;
    Ok(Json(state.bugs.get(id).await?))
}

async fn update_status(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<BugReport>> {
    let id = bug_id(path)?;
    let UpdateStatusRequest { status } = body(payload)?;
    Ok(Json(state.bugs.update_status(id, status).await?))
}

async fn update_priority(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<UpdatePriorityRequest>, JsonRejection>,
) -> Result<Json<BugReport>> {
    let id = bug_id(path)?;
    let UpdatePriorityRequest { priority } = body(payload)?;
    Ok(Json(state.bugs.update_priority(id, priority).await?))
}

async fn update_metadata(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
    payload: std::result::Result<Json<Metadata>, JsonRejection>,
) -> Result<Json<BugReport>> {
    let id = bug_id(path)?;
    let metadata = body(payload)?;
    Ok(Json(state.bugs.update_metadata(id, metadata).await?))
}

async fn delete_bug(
    State(state): State<AppState>,
    path: std::result::Result<Path<i64>, PathRejection>,
) -> Result<StatusCode> {
    let id = bug_id(path)?;
    state.bugs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

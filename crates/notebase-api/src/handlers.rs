//! Route handlers for notes and health.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, Span};

use notebase_core::{defaults, logging, ListNotesRequest, Note};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub size: Option<u32>,
    pub after: Option<String>,
}

fn record_note_id(id: &str) {
    Span::current().record(logging::NOTE_ID, id);
}

fn note_body(body: Result<Json<Note>, JsonRejection>) -> Result<Note, ApiError> {
    let Json(note) = body?;
    Ok(note)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn list_notes(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params?;
    if let Some(size) = params.size {
        if size == 0 || size > defaults::PAGE_SIZE_MAX {
            return Err(ApiError::BadRequest(format!(
                "size must be between 1 and {}",
                defaults::PAGE_SIZE_MAX
            )));
        }
    }

    if let Some(after) = params.after.as_deref() {
        if after.is_empty() || !after.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ApiError::BadRequest(format!("after is not a note id: {}", after)));
        }
    }

    let request = ListNotesRequest {
        size: params.size,
        after: params.after,
    };
    let docs = state
        .notes
        .list(request)
        .await
        .map_err(ApiError::list_failed)?;
    Ok(Json(docs))
}

pub async fn create_note(
    State(state): State<AppState>,
    body: Result<Json<Note>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let note = note_body(body)?;
    let doc = state
        .notes
        .insert(note)
        .await
        .map_err(|e| ApiError::write_failed("create", None, e))?;

    record_note_id(doc.id());
    info!(note_id = %doc.id(), "Note created");
    Ok(Json(doc))
}

pub async fn get_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    record_note_id(&id);
    let doc = state
        .notes
        .fetch(&id)
        .await
        .map_err(|e| ApiError::read_failed(&id, e))?;
    Ok(Json(doc))
}

pub async fn update_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Note>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    record_note_id(&id);
    let note = note_body(body)?;
    let doc = state
        .notes
        .update(&id, note)
        .await
        .map_err(|e| ApiError::write_failed("update", Some(&id), e))?;

    info!(note_id = %id, "Note updated");
    Ok(Json(doc))
}

pub async fn delete_note(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    record_note_id(&id);
    let doc = state
        .notes
        .delete(&id)
        .await
        .map_err(|e| ApiError::write_failed("delete", Some(&id), e))?;

    info!(note_id = %id, "Note deleted");
    Ok(Json(doc))
}

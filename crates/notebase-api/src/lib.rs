//! # notebase-api
//!
//! HTTP service exposing note CRUD over a [`NoteRepository`].
//!
//! [`router`] builds the complete application, middleware included, so the
//! binary and the integration tests serve exactly the same stack.

pub mod config;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::field::Empty;
use uuid::Uuid;

use notebase_core::{logging, NoteRepository};

pub use config::ServiceConfig;
pub use error::ApiError;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub notes: Arc<dyn NoteRepository>,
}

impl AppState {
    pub fn new(notes: Arc<dyn NoteRepository>) -> Self {
        Self { notes }
    }
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let span = tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        subsystem = "api",
        request_id = Empty,
        note_id = Empty,
    );
    if let Some(id) = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
    {
        span.record(logging::REQUEST_ID, id);
    }
    span
}

/// Build the application router.
///
/// Layers, outermost first: request id assignment, request id propagation,
/// request tracing, panic recovery. The body limit is enforced by the `Json`
/// extractor, so an oversized body is rejected with the `{"message"}` envelope.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/notes", get(handlers::list_notes).post(handlers::create_note))
        .route(
            "/notes/:id",
            get(handlers::get_note)
                .put(handlers::update_note)
                .patch(handlers::update_note)
                .post(handlers::update_note)
                .delete(handlers::delete_note),
        )
        .route("/notes/:id/delete", get(handlers::delete_note))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(CatchPanicLayer::custom(error::panic_response)),
        )
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

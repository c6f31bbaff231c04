//! Structured logging conventions for notebase.
//!
//! Both binaries log with the same field names so that log aggregation can
//! query the service and the setup tool alike. Fields written through
//! `#[instrument]` and event macros are literal: `subsystem` ("api", "db",
//! "setup"), `component`, `op`, `duration_ms`, `result_count`, `error`,
//! `slow`. The constants below name the fields recorded on a span after it
//! was created, where the name must match the span's declaration.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A request or provisioning step failed |
//! | WARN  | Recoverable issue (duplicate sample, slow query) |
//! | INFO  | Lifecycle events, resources created or found |
//! | DEBUG | Per-query details |

/// Correlation ID propagated from the `x-request-id` header.
pub const REQUEST_ID: &str = "request_id";

/// Note reference id being operated on.
pub const NOTE_ID: &str = "note_id";

//! Core traits for notebase abstractions.
//!
//! Handlers depend on these traits rather than on a concrete gateway, so the
//! HTTP service can be exercised against any backing store.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Note, NoteDocument};

/// Request for listing notes.
#[derive(Debug, Clone, Default)]
pub struct ListNotesRequest {
    /// Page size; the database default applies when `None`.
    pub size: Option<u32>,
    /// Resume after the note with this id. The note itself is not returned,
    /// so passing the last id of one page yields the next page.
    pub after: Option<String>,
}

/// Repository for note CRUD operations.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// List one page of notes.
    async fn list(&self, req: ListNotesRequest) -> Result<Vec<NoteDocument>>;

    /// Fetch a note by reference id.
    async fn fetch(&self, id: &str) -> Result<NoteDocument>;

    /// Create a note with `note` as its data.
    async fn insert(&self, note: Note) -> Result<NoteDocument>;

    /// Replace the data of an existing note.
    async fn update(&self, id: &str, note: Note) -> Result<NoteDocument>;

    /// Delete a note, returning the document as it was before deletion.
    async fn delete(&self, id: &str) -> Result<NoteDocument>;
}

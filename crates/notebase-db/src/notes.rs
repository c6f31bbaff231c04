//! Note repository over the database gateway.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use notebase_core::{defaults, Error, ListNotesRequest, Note, NoteDocument, NoteRepository, Result};

use crate::client::{query, Gateway};
use crate::fql::{self, Expr, PageOptions};

/// One page of a paginated set.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
}

/// Notes stored as documents of one collection, listed through an index
/// covering every document of that collection.
#[derive(Debug, Clone)]
pub struct FaunaNoteRepository<G> {
    gateway: G,
    collection: String,
    index: String,
}

impl<G: Gateway> FaunaNoteRepository<G> {
    /// Repository over the default `notes` collection and `note` index.
    pub fn new(gateway: G) -> Self {
        Self::with_names(gateway, defaults::NOTES_COLLECTION, defaults::NOTES_INDEX)
    }

    pub fn with_names(gateway: G, collection: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            gateway,
            collection: collection.into(),
            index: index.into(),
        }
    }

    fn note_ref(&self, id: &str) -> Result<Expr> {
        // Document ids are decimal strings; anything else cannot address a note.
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::NotFound(format!("{}/{}", self.collection, id)));
        }
        Ok(fql::ref_collection(fql::collection(&self.collection), id))
    }

    fn data_params(note: &Note) -> Result<Expr> {
        Ok(fql::obj([("data", Expr::from_data(note)?)]))
    }
}

#[async_trait]
impl<G: Gateway> NoteRepository for FaunaNoteRepository<G> {
    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "list"))]
    async fn list(&self, req: ListNotesRequest) -> Result<Vec<NoteDocument>> {
        // An `after` cursor is inclusive on the wire: fetch one extra document
        // and drop the cursor note if it is still present.
        let (options, limit) = match req.after.as_deref() {
            Some(id) => {
                let limit = req.size.unwrap_or(defaults::PAGE_SIZE);
                let options = PageOptions {
                    size: Some(limit + 1),
                    after: Some(fql::arr([self.note_ref(id)?])),
                };
                (options, Some(limit as usize))
            }
            None => (
                PageOptions {
                    size: req.size,
                    after: None,
                },
                None,
            ),
        };
        let expr = fql::map(
            fql::paginate(fql::match_index(fql::index(&self.index)), options),
            fql::lambda("X", fql::get(fql::var("X"))),
        );
        let page: Page<NoteDocument> = query(&self.gateway, &expr).await?;
        let mut notes = page.data;
        if let (Some(cursor), Some(limit)) = (req.after.as_deref(), limit) {
            if notes.first().is_some_and(|doc| doc.id() == cursor) {
                notes.remove(0);
            }
            notes.truncate(limit);
        }
        debug!(result_count = notes.len(), "Listed notes");
        Ok(notes)
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "fetch"))]
    async fn fetch(&self, id: &str) -> Result<NoteDocument> {
        let expr = fql::get(self.note_ref(id)?);
        query(&self.gateway, &expr).await
    }

    #[instrument(skip(self, note), fields(subsystem = "db", component = "notes", op = "insert"))]
    async fn insert(&self, note: Note) -> Result<NoteDocument> {
        let expr = fql::create(fql::collection(&self.collection), Self::data_params(&note)?);
        let doc: NoteDocument = query(&self.gateway, &expr).await?;
        debug!(note_id = %doc.id(), "Created note");
        Ok(doc)
    }

    #[instrument(skip(self, note), fields(subsystem = "db", component = "notes", op = "update"))]
    async fn update(&self, id: &str, note: Note) -> Result<NoteDocument> {
        let expr = fql::update(self.note_ref(id)?, Self::data_params(&note)?);
        query(&self.gateway, &expr).await
    }

    #[instrument(skip(self), fields(subsystem = "db", component = "notes", op = "delete"))]
    async fn delete(&self, id: &str) -> Result<NoteDocument> {
        let expr = fql::delete(self.note_ref(id)?);
        query(&self.gateway, &expr).await
    }
}

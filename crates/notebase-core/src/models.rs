//! Domain models shared by the service and the setup tool.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// REFERENCES
// =============================================================================

/// Opaque, database-assigned reference addressing a stored instance.
///
/// References nest: a document ref points at its collection ref, which in
/// turn points at the built-in `collections` ref. Deserializes from the wire
/// form (`{"@ref": {"id": .., "collection": ..}}`) as well as from the flat
/// form the HTTP service emits (`{"id": .., "collection": "notes"}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ref {
    pub id: String,
    pub collection: Option<Box<Ref>>,
    pub database: Option<Box<Ref>>,
}

impl Ref {
    /// Built-in schema ref such as `collections`, `indexes` or `databases`.
    pub fn native(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: None,
            database: None,
        }
    }

    /// Ref of a user collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self::schema(name, "collections")
    }

    /// Ref of a user index.
    pub fn index(name: impl Into<String>) -> Self {
        Self::schema(name, "indexes")
    }

    /// Ref of a child database.
    pub fn database(name: impl Into<String>) -> Self {
        Self::schema(name, "databases")
    }

    /// Ref of a document inside `collection`.
    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            collection: Some(Box::new(Self::collection(collection))),
            database: None,
        }
    }

    fn schema(name: impl Into<String>, kind: &str) -> Self {
        Self {
            id: name.into(),
            collection: Some(Box::new(Self::native(kind))),
            database: None,
        }
    }

    /// Name of the collection (or schema class) this ref belongs to.
    pub fn collection_name(&self) -> Option<&str> {
        self.collection.as_deref().map(|c| c.id.as_str())
    }
}

impl std::fmt::Display for Ref {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.collection_name() {
            Some(collection) => write!(f, "{}/{}", collection, self.id),
            None => f.write_str(&self.id),
        }
    }
}

#[derive(Serialize)]
struct FlatRef<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    collection: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
}

impl Serialize for Ref {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FlatRef {
            id: &self.id,
            collection: self.collection_name(),
            database: self.database.as_deref().map(|d| d.id.as_str()),
        }
        .serialize(serializer)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RefRepr {
    Tagged {
        #[serde(rename = "@ref")]
        inner: TaggedRef,
    },
    Flat {
        id: String,
        #[serde(default)]
        collection: Option<String>,
        #[serde(default)]
        database: Option<String>,
    },
}

#[derive(Deserialize)]
struct TaggedRef {
    id: String,
    #[serde(default)]
    collection: Option<Box<Ref>>,
    #[serde(default)]
    database: Option<Box<Ref>>,
}

impl<'de> Deserialize<'de> for Ref {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RefRepr::deserialize(deserializer)? {
            RefRepr::Tagged { inner } => Ref {
                id: inner.id,
                collection: inner.collection,
                database: inner.database,
            },
            RefRepr::Flat {
                id,
                collection,
                database,
            } => Ref {
                id,
                collection: collection.map(|c| Box::new(Ref::collection(c))),
                database: database.map(|d| Box::new(Ref::database(d))),
            },
        })
    }
}

// =============================================================================
// DOCUMENTS
// =============================================================================

/// A stored document: its reference, last-write timestamp and user data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    #[serde(rename = "ref")]
    pub reference: Ref,
    /// Last write, in microseconds since the Unix epoch.
    pub ts: i64,
    pub data: T,
}

impl<T> Document<T> {
    /// Document id within its collection.
    pub fn id(&self) -> &str {
        &self.reference.id
    }
}

/// The service's single entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub note: String,
}

impl Note {
    pub fn new(note: impl Into<String>) -> Self {
        Self { note: note.into() }
    }
}

/// A note as stored in the database.
pub type NoteDocument = Document<Note>;

/// Record seeded by the setup tool to exercise the unique index.
///
/// Lives in its own collection; its shape is unrelated to [`Note`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleInstance {
    pub id: i64,
    pub name: String,
}

impl SampleInstance {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The four records inserted by every provisioning run.
    pub fn seed() -> Vec<SampleInstance> {
        vec![
            Self::new(1, "Notes 1"),
            Self::new(2, "Notes 2"),
            Self::new(3, "Notes 3"),
            Self::new(4, "Notes 4"),
        ]
    }
}

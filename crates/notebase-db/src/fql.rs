//! FQL expression builder.
//!
//! Every function here returns an [`Expr`] already in the JSON shape the
//! database expects on the wire, so a query is serialized by serializing the
//! expression. Object literals are escaped as `{"object": {...}}`; plain JSON
//! arrays and scalars are passed through.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use notebase_core::{Ref, Result};

/// An FQL expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr(Value);

impl Expr {
    /// The `null` literal.
    pub fn null() -> Self {
        Expr(Value::Null)
    }

    /// Encode arbitrary serializable data as a literal, escaping every
    /// object it contains.
    pub fn from_data<T: Serialize>(data: &T) -> Result<Self> {
        Ok(Self::from(serde_json::to_value(data)?))
    }

    /// The wire JSON of this expression.
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr(Value::String(s.to_string()))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr(Value::String(s))
    }
}

impl From<&String> for Expr {
    fn from(s: &String) -> Self {
        Expr(Value::String(s.clone()))
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr(Value::from(n))
    }
}

impl From<u32> for Expr {
    fn from(n: u32) -> Self {
        Expr(Value::from(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr(Value::Bool(b))
    }
}

impl From<Vec<Expr>> for Expr {
    fn from(items: Vec<Expr>) -> Self {
        Expr(Value::Array(items.into_iter().map(Expr::into_json).collect()))
    }
}

impl From<&Ref> for Expr {
    fn from(r: &Ref) -> Self {
        reference(r)
    }
}

/// Literal JSON; nested objects are escaped so the database does not read
/// them as function calls.
impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr(escape(value))
    }
}

fn escape(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let inner: Map<String, Value> = map.into_iter().map(|(k, v)| (k, escape(v))).collect();
            let mut wrapper = Map::new();
            wrapper.insert("object".to_string(), Value::Object(inner));
            Value::Object(wrapper)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(escape).collect()),
        scalar => scalar,
    }
}

fn call<const N: usize>(fields: [(&str, Expr); N]) -> Expr {
    let map: Map<String, Value> = fields
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into_json()))
        .collect();
    Expr(Value::Object(map))
}

// =============================================================================
// LITERALS
// =============================================================================

/// Object literal.
pub fn obj<K, I>(fields: I) -> Expr
where
    K: Into<String>,
    I: IntoIterator<Item = (K, Expr)>,
{
    let inner: Map<String, Value> = fields
        .into_iter()
        .map(|(k, v)| (k.into(), v.into_json()))
        .collect();
    call([("object", Expr(Value::Object(inner)))])
}

/// Array literal.
pub fn arr<I: IntoIterator<Item = Expr>>(items: I) -> Expr {
    Expr::from(items.into_iter().collect::<Vec<_>>())
}

/// A concrete reference in its tagged wire form.
pub fn reference(r: &Ref) -> Expr {
    let mut inner = Map::new();
    inner.insert("id".to_string(), Value::String(r.id.clone()));
    if let Some(collection) = &r.collection {
        inner.insert("collection".to_string(), reference(collection).into_json());
    }
    if let Some(database) = &r.database {
        inner.insert("database".to_string(), reference(database).into_json());
    }
    let mut tagged = Map::new();
    tagged.insert("@ref".to_string(), Value::Object(inner));
    Expr(Value::Object(tagged))
}

// =============================================================================
// SCHEMA REFERENCES
// =============================================================================

pub fn collection(name: impl Into<Expr>) -> Expr {
    call([("collection", name.into())])
}

pub fn index(name: impl Into<Expr>) -> Expr {
    call([("index", name.into())])
}

pub fn database(name: impl Into<Expr>) -> Expr {
    call([("database", name.into())])
}

/// The set of every key visible to the current secret.
pub fn keys() -> Expr {
    call([("keys", Expr::null())])
}

/// Reference to document `id` of `collection`.
pub fn ref_collection(collection: Expr, id: impl Into<Expr>) -> Expr {
    call([("ref", collection), ("id", id.into())])
}

// =============================================================================
// READS
// =============================================================================

pub fn get(reference: Expr) -> Expr {
    call([("get", reference)])
}

pub fn exists(reference: Expr) -> Expr {
    call([("exists", reference)])
}

/// Every entry of an index without terms.
pub fn match_index(index: Expr) -> Expr {
    call([("match", index)])
}

/// Entries of `index` whose terms equal `terms`.
pub fn match_terms(index: Expr, terms: impl Into<Expr>) -> Expr {
    call([("match", index), ("terms", terms.into())])
}

/// Options for [`paginate`].
#[derive(Debug, Clone, Default)]
pub struct PageOptions {
    pub size: Option<u32>,
    pub after: Option<Expr>,
}

impl PageOptions {
    pub fn size(size: u32) -> Self {
        Self {
            size: Some(size),
            after: None,
        }
    }
}

pub fn paginate(set: Expr, options: PageOptions) -> Expr {
    let mut map = Map::new();
    map.insert("paginate".to_string(), set.into_json());
    if let Some(size) = options.size {
        map.insert("size".to_string(), Value::from(size));
    }
    if let Some(after) = options.after {
        map.insert("after".to_string(), after.into_json());
    }
    Expr(Value::Object(map))
}

/// Apply `lambda` to every element of `collection`.
pub fn map(collection: Expr, lambda: Expr) -> Expr {
    call([("map", lambda), ("collection", collection)])
}

pub fn lambda(param: &str, expr: Expr) -> Expr {
    call([("lambda", Expr::from(param)), ("expr", expr)])
}

pub fn var(name: &str) -> Expr {
    call([("var", Expr::from(name))])
}

// =============================================================================
// WRITES
// =============================================================================

pub fn create(collection: Expr, params: Expr) -> Expr {
    call([("create", collection), ("params", params)])
}

pub fn update(reference: Expr, params: Expr) -> Expr {
    call([("update", reference), ("params", params)])
}

pub fn delete(reference: Expr) -> Expr {
    call([("delete", reference)])
}

pub fn create_database(params: Expr) -> Expr {
    call([("create_database", params)])
}

pub fn create_collection(params: Expr) -> Expr {
    call([("create_collection", params)])
}

pub fn create_index(params: Expr) -> Expr {
    call([("create_index", params)])
}

pub fn create_key(params: Expr) -> Expr {
    call([("create_key", params)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(expr: &Expr) -> Value {
        serde_json::to_value(expr).unwrap()
    }

    #[test]
    fn test_get_document_ref() {
        let expr = get(ref_collection(collection("notes"), "123"));
        assert_eq!(
            wire(&expr),
            json!({ "get": { "ref": { "collection": "notes" }, "id": "123" } })
        );
    }

    #[test]
    fn test_list_query_shape() {
        let expr = map(
            paginate(match_index(index("note")), PageOptions::default()),
            lambda("X", get(var("X"))),
        );
        assert_eq!(
            wire(&expr),
            json!({
                "map": { "lambda": "X", "expr": { "get": { "var": "X" } } },
                "collection": { "paginate": { "match": { "index": "note" } } }
            })
        );
    }

    #[test]
    fn test_paginate_with_size() {
        let expr = paginate(keys(), PageOptions::size(10));
        assert_eq!(wire(&expr), json!({ "paginate": { "keys": null }, "size": 10 }));
    }

    #[test]
    fn test_create_escapes_data() {
        let data = Expr::from_data(&json!({ "note": "buy milk" })).unwrap();
        let expr = create(collection("notes"), obj([("data", data)]));
        assert_eq!(
            wire(&expr),
            json!({
                "create": { "collection": "notes" },
                "params": { "object": { "data": { "object": { "note": "buy milk" } } } }
            })
        );
    }

    #[test]
    fn test_escape_nested_objects_in_arrays() {
        let expr = Expr::from(json!([{ "a": 1 }, 2]));
        assert_eq!(wire(&expr), json!([{ "object": { "a": 1 } }, 2]));
    }

    #[test]
    fn test_match_terms() {
        let expr = get(match_terms(index("note_key"), 3i64));
        assert_eq!(
            wire(&expr),
            json!({ "get": { "match": { "index": "note_key" }, "terms": 3 } })
        );
    }

    #[test]
    fn test_create_index_params() {
        let expr = create_index(obj([
            ("name", Expr::from("note_key")),
            ("source", collection("Notes")),
            ("terms", arr([obj([("field", arr(["data".into(), "id".into()]))])])),
            ("unique", true.into()),
        ]));
        assert_eq!(
            wire(&expr),
            json!({
                "create_index": { "object": {
                    "name": "note_key",
                    "source": { "collection": "Notes" },
                    "terms": [{ "object": { "field": ["data", "id"] } }],
                    "unique": true
                } }
            })
        );
    }

    #[test]
    fn test_reference_round_trips_to_tagged_form() {
        let r = Ref::document("notes", "9");
        assert_eq!(
            wire(&reference(&r)),
            json!({ "@ref": {
                "id": "9",
                "collection": { "@ref": {
                    "id": "notes",
                    "collection": { "@ref": { "id": "collections" } }
                } }
            } })
        );
    }

    #[test]
    fn test_delete_key_ref() {
        let key = Ref {
            id: "55".to_string(),
            collection: Some(Box::new(Ref::native("keys"))),
            database: None,
        };
        assert_eq!(
            wire(&delete(Expr::from(&key))),
            json!({ "delete": { "@ref": { "id": "55", "collection": { "@ref": { "id": "keys" } } } } })
        );
    }
}

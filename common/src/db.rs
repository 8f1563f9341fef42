use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use tracing::info;

use crate::utils::Collection;

/// A loosely-typed stored record. Documents returned by a store always carry
/// their identifier under [`ID_FIELD`].
pub type Document = serde_json::Map<String, Value>;

pub const ID_FIELD: &str = "_id";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Conjunction of field equalities, optionally pinned to one identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    id: Option<String>,
    fields: Document,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            fields: Document::new(),
        }
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn fields(&self) -> &Document {
        &self.fields
    }

    pub fn matches(&self, id: &str, body: &Document) -> bool {
        if let Some(wanted) = &self.id {
            if wanted != id {
                return false;
            }
        }
        self.fields
            .iter()
            .all(|(field, value)| body.get(field) == Some(value))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: u64,
    pub modified: u64,
}

/// The collection-oriented storage the API is written against.
///
/// Every method is a single independent operation; callers get no atomicity
/// across calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores `document` under a freshly generated identifier and returns it.
    /// Any `_id` in the input is discarded.
    async fn insert_one(
        &self,
        collection: Collection,
        document: Document,
    ) -> Result<String, StoreError>;

    /// Returns matching documents in insertion order.
    async fn find(&self, collection: Collection, filter: &Filter)
        -> Result<Vec<Document>, StoreError>;

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError>;

    /// Sets the given fields on the first matching document. `modified` is 0
    /// when every field already held the requested value.
    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateResult, StoreError>;

    /// Deletes the first matching document and returns how many were removed.
    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError>;
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(StoreError::NotAnObject("array")),
        _ => Err(StoreError::NotAnObject("scalar")),
    }
}

pub fn from_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(document))?)
}

/// Copies `set` into `body`, returning whether any value changed.
pub fn apply_set(body: &mut Document, set: Document) -> bool {
    let mut changed = false;
    for (field, value) in set {
        if field == ID_FIELD {
            continue;
        }
        if body.get(&field) != Some(&value) {
            body.insert(field, value);
            changed = true;
        }
    }
    changed
}

pub(crate) fn with_id(id: &str, mut body: Document) -> Document {
    body.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    body
}

const CREATE_DOCUMENTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    body JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, id)
)";

const CREATE_BODY_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS documents_body_idx ON documents USING GIN (body jsonb_path_ops)";

// $2 pins the identifier when set, $3 is a JSONB object the body must contain.
const MATCH_CLAUSE: &str =
    "collection = $1 AND ($2::text IS NULL OR id = $2) AND body @> $3::jsonb";

/// Postgres backed document store. Each collection is a slice of a single
/// `documents` table holding JSONB bodies.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub async fn establish_connection(db_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(db_url)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_DOCUMENTS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_BODY_INDEX).execute(&self.pool).await?;
        info!("Document table ready");
        Ok(())
    }
}

fn body_value(body: Value) -> Result<Document, StoreError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject("stored body")),
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> Result<String, StoreError> {
        document.remove(ID_FIELD);
        let id = new_id();

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(Value::Object(document))
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<(String, Value)> = sqlx::query_as(&format!(
            "SELECT id, body FROM documents WHERE {MATCH_CLAUSE} ORDER BY created_at, id"
        ))
        .bind(collection.as_str())
        .bind(filter.id())
        .bind(Value::Object(filter.fields().clone()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(id, body)| Ok(with_id(&id, body_value(body)?)))
            .collect()
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<(String, Value)> = sqlx::query_as(&format!(
            "SELECT id, body FROM documents WHERE {MATCH_CLAUSE} ORDER BY created_at, id LIMIT 1"
        ))
        .bind(collection.as_str())
        .bind(filter.id())
        .bind(Value::Object(filter.fields().clone()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, body)| Ok(with_id(&id, body_value(body)?)))
            .transpose()
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateResult, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String, Value)> = sqlx::query_as(&format!(
            "SELECT id, body FROM documents WHERE {MATCH_CLAUSE} \
             ORDER BY created_at, id LIMIT 1 FOR UPDATE"
        ))
        .bind(collection.as_str())
        .bind(filter.id())
        .bind(Value::Object(filter.fields().clone()))
        .fetch_optional(&mut *tx)
        .await?;

        let Some((id, body)) = row else {
            tx.commit().await?;
            return Ok(UpdateResult::default());
        };

        let mut body = body_value(body)?;
        if !apply_set(&mut body, set) {
            tx.commit().await?;
            return Ok(UpdateResult {
                matched: 1,
                modified: 0,
            });
        }

        sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(&id)
            .bind(Value::Object(body))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(UpdateResult {
            matched: 1,
            modified: 1,
        })
    }

    async fn delete_one(&self, collection: Collection, filter: &Filter) -> Result<u64, StoreError> {
        let result = sqlx::query(&format!(
            "DELETE FROM documents WHERE collection = $1 AND id = (
                SELECT id FROM documents WHERE {MATCH_CLAUSE} ORDER BY created_at, id LIMIT 1
            )"
        ))
        .bind(collection.as_str())
        .bind(filter.id())
        .bind(Value::Object(filter.fields().clone()))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        to_document(&value).unwrap()
    }

    #[test]
    fn filter_matches_id_and_fields() {
        let body = doc(json!({ "email": "a@x.com", "status": "panding" }));

        assert!(Filter::all().matches("1", &body));
        assert!(Filter::by_id("1").matches("1", &body));
        assert!(!Filter::by_id("2").matches("1", &body));
        assert!(Filter::all().eq("email", "a@x.com").matches("1", &body));
        assert!(!Filter::all()
            .eq("email", "a@x.com")
            .eq("status", "accepted")
            .matches("1", &body));
        assert!(!Filter::all().eq("charityEmail", "c@x.com").matches("1", &body));
    }

    #[test]
    fn apply_set_reports_changes_only() {
        let mut body = doc(json!({ "role": "user", "email": "a@x.com" }));

        assert!(!apply_set(&mut body, doc(json!({ "role": "user" }))));
        assert!(apply_set(&mut body, doc(json!({ "role": "admin" }))));
        assert_eq!(body["role"], json!("admin"));
        assert!(!apply_set(&mut body, doc(json!({ "_id": "other" }))));
        assert!(!body.contains_key(ID_FIELD));
    }

    #[test]
    fn to_document_rejects_non_objects() {
        assert!(matches!(
            to_document(&json!([1, 2])),
            Err(StoreError::NotAnObject("array"))
        ));
        assert!(matches!(
            to_document(&"text"),
            Err(StoreError::NotAnObject("scalar"))
        ));
    }
}

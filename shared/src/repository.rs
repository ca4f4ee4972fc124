use crate::error::ApiError;
use crate::schema::{self, EntitySchema, ValidationMode};
use crate::store::{Document, DocumentStore};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Generic validated CRUD engine over one document kind. The builders and
/// projects collections are two instances of this type with different
/// schemas; nothing else differs between them.
pub struct ResourceRepository {
    schema: &'static EntitySchema,
    store: Arc<dyn DocumentStore>,
}

impl ResourceRepository {
    pub fn new(schema: &'static EntitySchema, store: Arc<dyn DocumentStore>) -> Self {
        Self { schema, store }
    }

    pub async fn list(&self) -> Result<Vec<Document>, ApiError> {
        let docs = self.store.list(self.schema.kind).await?;
        Ok(docs
            .into_iter()
            .map(|(id, doc)| with_id(id, doc))
            .collect())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Document, ApiError> {
        let doc = self
            .store
            .get(self.schema.kind, id)
            .await?
            .ok_or_else(|| self.not_found())?;
        Ok(with_id(id.to_string(), doc))
    }

    /// Validate against the full schema, then write a new document.
    /// Validation failures never reach the store.
    pub async fn create(&self, payload: &Value) -> Result<Document, ApiError> {
        let mut doc = schema::validate(self.schema, payload, ValidationMode::Full)?;

        for counter in self.schema.counters {
            doc.entry(counter.to_string()).or_insert_with(|| Value::from(0));
        }
        doc.insert(
            "createdAt".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        let id = self.store.add(self.schema.kind, doc).await?;
        tracing::info!("Created {} {}", self.schema.label, id);
        self.get_by_id(&id).await
    }

    /// Validate the supplied fields against the partial schema and merge
    /// them; fields absent from the payload are left untouched.
    pub async fn update(&self, id: &str, payload: &Value) -> Result<Document, ApiError> {
        let mut fields = schema::validate(self.schema, payload, ValidationMode::Partial)?;

        if self.store.get(self.schema.kind, id).await?.is_none() {
            return Err(self.not_found());
        }

        fields.insert(
            "updatedAt".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        self.store.merge(self.schema.kind, id, fields).await?;
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        if self.store.get(self.schema.kind, id).await?.is_none() {
            return Err(self.not_found());
        }
        self.store.delete(self.schema.kind, id).await?;
        tracing::info!("Deleted {} {}", self.schema.label, id);
        Ok(())
    }

    fn not_found(&self) -> ApiError {
        ApiError::NotFound(format!("{} not found", self.schema.label))
    }
}

fn with_id(id: String, mut doc: Document) -> Document {
    doc.insert("id".to_string(), Value::String(id));
    doc
}

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use thiserror::Error;

/// A stored document: flat field map, nesting limited to arrays of strings.
pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Request(String),
}

/// Capability interface over the remote document store. One document per
/// (kind, id); writes to a single document are atomic, merges are
/// last-write-wins per field.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, kind: &str) -> Result<Vec<(String, Document)>, StoreError>;
    async fn get(&self, kind: &str, id: &str) -> Result<Option<Document>, StoreError>;
    /// Full write of a document under a caller-chosen id.
    async fn set(&self, kind: &str, id: &str, doc: Document) -> Result<(), StoreError>;
    /// Field-level merge: only the supplied fields are written.
    async fn merge(&self, kind: &str, id: &str, fields: Document) -> Result<(), StoreError>;
    /// Write a document under a freshly assigned id and return it.
    async fn add(&self, kind: &str, doc: Document) -> Result<String, StoreError>;
    async fn delete(&self, kind: &str, id: &str) -> Result<(), StoreError>;
}

/// DynamoDB single-table store. Every document lives at PK = SK = "{KIND}#{id}".
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn key(kind: &str, id: &str) -> String {
        format!("{}#{}", kind, id)
    }
}

fn to_attribute_value(value: &Value) -> AttributeValue {
    match value {
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute_value).collect()),
        Value::Null => AttributeValue::Null(true),
        // Flat documents only; anything nested is stored as its JSON text.
        Value::Object(_) => AttributeValue::S(value.to_string()),
    }
}

fn from_attribute_value(attr: &AttributeValue) -> Value {
    match attr {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => {
            if let Ok(int) = n.parse::<i64>() {
                Value::Number(int.into())
            } else {
                n.parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute_value).collect()),
        _ => Value::Null,
    }
}

fn document_from_item(item: &HashMap<String, AttributeValue>) -> Document {
    item.iter()
        .filter(|(name, _)| name.as_str() != "PK" && name.as_str() != "SK")
        .map(|(name, attr)| (name.clone(), from_attribute_value(attr)))
        .collect()
}

#[async_trait]
impl DocumentStore for DynamoStore {
    async fn list(&self, kind: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let prefix = format!("{}#", kind);
        let mut docs = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&self.table_name)
                .filter_expression("begins_with(PK, :prefix) AND PK = SK")
                .expression_attribute_values(":prefix", AttributeValue::S(prefix.clone()));
            if let Some(key) = start_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let result = request
                .send()
                .await
                .map_err(|e| StoreError::Request(format!("{:?}", e)))?;

            for item in result.items() {
                if let Some(pk) = item.get("PK").and_then(|v| v.as_s().ok()) {
                    if let Some(id) = pk.strip_prefix(&prefix) {
                        docs.push((id.to_string(), document_from_item(item)));
                    }
                }
            }

            match result.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(docs)
    }

    async fn get(&self, kind: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let pk = Self::key(kind, id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("{:?}", e)))?;

        Ok(result.item().map(document_from_item))
    }

    async fn set(&self, kind: &str, id: &str, doc: Document) -> Result<(), StoreError> {
        let pk = Self::key(kind, id);

        let mut request = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(pk.clone()))
            .item("SK", AttributeValue::S(pk));
        for (name, value) in &doc {
            request = request.item(name, to_attribute_value(value));
        }

        request
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("{:?}", e)))?;
        Ok(())
    }

    async fn merge(&self, kind: &str, id: &str, fields: Document) -> Result<(), StoreError> {
        if fields.is_empty() {
            return Ok(());
        }

        let pk = Self::key(kind, id);

        // Alias every attribute name; field names come from user payloads and
        // may collide with DynamoDB reserved words.
        let mut update_expr = Vec::new();
        let mut expr_names = HashMap::new();
        let mut expr_values = HashMap::new();
        for (index, (name, value)) in fields.iter().enumerate() {
            let alias = format!("#f{}", index);
            let placeholder = format!(":v{}", index);
            update_expr.push(format!("{} = {}", alias, placeholder));
            expr_names.insert(alias, name.clone());
            expr_values.insert(placeholder, to_attribute_value(value));
        }

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .update_expression(format!("SET {}", update_expr.join(", ")));

        for (alias, name) in expr_names {
            request = request.expression_attribute_names(alias, name);
        }
        for (placeholder, value) in expr_values {
            request = request.expression_attribute_values(placeholder, value);
        }

        request
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("{:?}", e)))?;
        Ok(())
    }

    async fn add(&self, kind: &str, doc: Document) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.set(kind, &id, doc).await?;
        Ok(id)
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<(), StoreError> {
        let pk = Self::key(kind, id);

        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk.clone()))
            .key("SK", AttributeValue::S(pk))
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("{:?}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store with the same merge semantics as DynamoDB, used by
    /// unit tests across the crate.
    #[derive(Default)]
    pub struct MemoryStore {
        docs: Mutex<HashMap<(String, String), Document>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn list(&self, kind: &str) -> Result<Vec<(String, Document)>, StoreError> {
            let docs = self.docs.lock().unwrap();
            Ok(docs
                .iter()
                .filter(|((k, _), _)| k == kind)
                .map(|((_, id), doc)| (id.clone(), doc.clone()))
                .collect())
        }

        async fn get(&self, kind: &str, id: &str) -> Result<Option<Document>, StoreError> {
            let docs = self.docs.lock().unwrap();
            Ok(docs.get(&(kind.to_string(), id.to_string())).cloned())
        }

        async fn set(&self, kind: &str, id: &str, doc: Document) -> Result<(), StoreError> {
            let mut docs = self.docs.lock().unwrap();
            docs.insert((kind.to_string(), id.to_string()), doc);
            Ok(())
        }

        async fn merge(&self, kind: &str, id: &str, fields: Document) -> Result<(), StoreError> {
            let mut docs = self.docs.lock().unwrap();
            let doc = docs.entry((kind.to_string(), id.to_string())).or_default();
            for (name, value) in fields {
                doc.insert(name, value);
            }
            Ok(())
        }

        async fn add(&self, kind: &str, doc: Document) -> Result<String, StoreError> {
            let id = uuid::Uuid::new_v4().to_string();
            self.set(kind, &id, doc).await?;
            Ok(id)
        }

        async fn delete(&self, kind: &str, id: &str) -> Result<(), StoreError> {
            let mut docs = self.docs.lock().unwrap();
            docs.remove(&(kind.to_string(), id.to_string()));
            Ok(())
        }
    }
}

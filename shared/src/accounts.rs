use crate::error::ApiError;
use crate::store::{Document, DocumentStore};
use crate::types::{Role, UserAccount};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Document kind holding user accounts.
const USER_KIND: &str = "USER";

/// Fields owned by registration step 1. A step-2 merge may not override
/// them, whatever the profile payload carries.
const PROTECTED_FIELDS: &[&str] = &["email", "role", "onboardingStatus", "createdAt", "isVerified"];

/// Manages the per-user account document keyed by the identity-service
/// account id.
pub struct UserAccountStore {
    store: Arc<dyn DocumentStore>,
}

impl UserAccountStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Write the account document created by registration step 1.
    pub async fn create(&self, account_id: &str, email: &str, role: Role) -> Result<(), ApiError> {
        let mut doc = Document::new();
        doc.insert("email".to_string(), Value::String(email.to_string()));
        doc.insert("role".to_string(), Value::String(role.as_str().to_string()));
        doc.insert(
            "onboardingStatus".to_string(),
            Value::String("step1_complete".to_string()),
        );
        doc.insert(
            "createdAt".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        // Builders require manual verification before their listings go live.
        if role == Role::Builder {
            doc.insert("isVerified".to_string(), Value::Bool(false));
        }

        self.store.set(USER_KIND, account_id, doc).await?;
        Ok(())
    }

    pub async fn get(&self, account_id: &str) -> Result<Option<UserAccount>, ApiError> {
        let doc = self.store.get(USER_KIND, account_id).await?;
        Ok(doc.map(|doc| UserAccount::from_document(account_id, doc)))
    }

    /// Merge step-2 profile fields into the account document and mark
    /// onboarding complete. Callers must have confirmed the account exists.
    pub async fn merge_profile(&self, account_id: &str, profile: &Document) -> Result<(), ApiError> {
        let mut fields: Document = profile
            .iter()
            .filter(|(name, _)| !PROTECTED_FIELDS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        fields.insert(
            "onboardingStatus".to_string(),
            Value::String("complete".to_string()),
        );
        fields.insert(
            "updatedAt".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        self.store.merge(USER_KIND, account_id, fields).await?;
        Ok(())
    }
}

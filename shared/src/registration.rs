use crate::accounts::UserAccountStore;
use crate::error::{ApiError, FieldErrors};
use crate::identity::{IdentityError, IdentityProvider};
use crate::types::Role;
use serde_json::Value;
use std::sync::Arc;

/// Minimum accepted password length, the floor shared with the identity
/// service policy.
const MIN_PASSWORD_LEN: usize = 6;

/// Two-step account creation. One workflow serves both the investor and
/// builder paths; the role is the only parameter.
///
/// Per-account states: nonexistent -> step1_complete -> complete.
pub struct RegistrationWorkflow {
    identity: Arc<dyn IdentityProvider>,
    accounts: UserAccountStore,
}

impl RegistrationWorkflow {
    pub fn new(identity: Arc<dyn IdentityProvider>, accounts: UserAccountStore) -> Self {
        Self { identity, accounts }
    }

    /// Step 1: create the upstream credential, then the account document.
    /// The credential goes first so a failure leaves no partial account.
    pub async fn begin(&self, role: Role, email: &str, password: &str) -> Result<String, ApiError> {
        let mut errors = FieldErrors::new();
        if !is_valid_email(email) {
            errors.insert("email".to_string(), "must be a valid email address".to_string());
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.insert(
                "password".to_string(),
                format!("must be at least {} characters", MIN_PASSWORD_LEN),
            );
        }
        if !errors.is_empty() {
            return Err(ApiError::validation(errors));
        }

        let account_id = self
            .identity
            .create_credential(email, password)
            .await
            .map_err(|e| match e {
                IdentityError::EmailTaken => ApiError::CredentialCreation(
                    "An account with this email already exists".to_string(),
                ),
                other => ApiError::Upstream(other.to_string()),
            })?;

        self.accounts.create(&account_id, email, role).await?;
        tracing::info!("Registered {} account {}", role.as_str(), account_id);
        Ok(account_id)
    }

    /// Step 2: merge the deferred profile into the step-1 document and mark
    /// onboarding complete. Idempotent; repeat calls merge again.
    pub async fn complete(&self, account_id: &str, profile: &Value) -> Result<(), ApiError> {
        let profile = profile.as_object().ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.insert("body".to_string(), "must be a JSON object".to_string());
            ApiError::validation(errors)
        })?;

        if self.accounts.get(account_id).await?.is_none() {
            return Err(ApiError::NotFound(
                "User not found. Please complete Step 1 first.".to_string(),
            ));
        }

        self.accounts.merge_profile(account_id, profile).await
    }
}

/// Minimal email shape check: one local part, one dotted domain, no spaces.
fn is_valid_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::stub::StubIdentity;
    use crate::store::memory::MemoryStore;
    use crate::store::DocumentStore;
    use crate::types::OnboardingStatus;
    use serde_json::json;

    fn workflow() -> (RegistrationWorkflow, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let workflow = RegistrationWorkflow::new(
            Arc::new(StubIdentity::new()),
            UserAccountStore::new(store.clone()),
        );
        (workflow, store)
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[tokio::test]
    async fn begin_rejects_bad_credentials_without_upstream_calls() {
        let (workflow, store) = workflow();

        let err = workflow
            .begin(Role::Investor, "nope", "short")
            .await
            .unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => {
                assert_eq!(errors.get("email").unwrap(), "must be a valid email address");
                assert_eq!(errors.get("password").unwrap(), "must be at least 6 characters");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
        assert!(store.list("USER").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn begin_creates_account_in_step1_state() {
        let (workflow, store) = workflow();

        let account_id = workflow
            .begin(Role::Investor, "a@x.com", "secret1")
            .await
            .unwrap();

        let doc = store.get("USER", &account_id).await.unwrap().unwrap();
        assert_eq!(doc.get("role").unwrap(), "investor");
        assert_eq!(doc.get("onboardingStatus").unwrap(), "step1_complete");
        assert!(doc.get("isVerified").is_none());
    }

    #[tokio::test]
    async fn builder_begin_marks_account_unverified() {
        let (workflow, store) = workflow();

        let account_id = workflow
            .begin(Role::Builder, "b@x.com", "secret1")
            .await
            .unwrap();

        let doc = store.get("USER", &account_id).await.unwrap().unwrap();
        assert_eq!(doc.get("role").unwrap(), "builder");
        assert_eq!(doc.get("isVerified").unwrap(), false);
    }

    #[tokio::test]
    async fn duplicate_email_fails_cleanly_with_no_partial_account() {
        let (workflow, store) = workflow();

        workflow
            .begin(Role::Investor, "a@x.com", "secret1")
            .await
            .unwrap();
        let err = workflow
            .begin(Role::Investor, "a@x.com", "secret2")
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::CredentialCreation(_)));
        assert_eq!(store.list("USER").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn complete_before_begin_fails_with_not_found() {
        let (workflow, _) = workflow();

        let err = workflow
            .complete("acct-missing", &json!({"fullName": "Asha"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn complete_merges_and_is_repeatable() {
        let (workflow, _) = workflow();
        let account_id = workflow
            .begin(Role::Investor, "a@x.com", "secret1")
            .await
            .unwrap();

        workflow
            .complete(&account_id, &json!({"fullName": "Asha", "city": "Pune"}))
            .await
            .unwrap();
        workflow
            .complete(&account_id, &json!({"city": "Mumbai"}))
            .await
            .unwrap();

        let account = workflow.accounts.get(&account_id).await.unwrap().unwrap();
        assert_eq!(account.onboarding_status, OnboardingStatus::Complete);
        assert_eq!(account.profile.get("fullName").unwrap(), "Asha");
        assert_eq!(account.profile.get("city").unwrap(), "Mumbai");
    }

    #[tokio::test]
    async fn complete_rejects_non_object_profiles() {
        let (workflow, _) = workflow();
        let account_id = workflow
            .begin(Role::Investor, "a@x.com", "secret1")
            .await
            .unwrap();

        let err = workflow
            .complete(&account_id, &json!("just a string"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }
}

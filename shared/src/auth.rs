use crate::accounts::UserAccountStore;
use crate::error::ApiError;
use crate::identity::{IdentityError, IdentityProvider, RefreshedSession, TokenClaims};
use crate::types::{LoginResponse, Role};
use std::sync::Arc;

/// Credential verification and bearer-token gating. Token issuance stays
/// with the identity service; this type only maps its results onto the
/// application's accounts and errors.
pub struct AuthenticationGateway {
    identity: Arc<dyn IdentityProvider>,
    accounts: UserAccountStore,
}

impl AuthenticationGateway {
    pub fn new(identity: Arc<dyn IdentityProvider>, accounts: UserAccountStore) -> Self {
        Self { identity, accounts }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let verified = self
            .identity
            .verify_password(email, password)
            .await
            .map_err(|e| {
                let message = match &e {
                    IdentityError::InvalidPassword => "Incorrect password",
                    IdentityError::EmailNotFound => "Email not found",
                    other => {
                        tracing::error!("Login verification failed: {}", other);
                        "Login failed"
                    }
                };
                ApiError::Authentication(message.to_string())
            })?;

        let (role, display_name) = match self.accounts.get(&verified.account_id).await? {
            Some(account) => (account.role, account.display_name()),
            None => {
                // Credential exists upstream but no account document does
                // (created outside this system). Serve defaults instead of
                // failing the login.
                tracing::warn!(
                    "No account document for {}; falling back to defaults",
                    verified.account_id
                );
                let local_part = email.split('@').next().unwrap_or(email);
                (Role::Investor, local_part.to_string())
            }
        };

        Ok(LoginResponse {
            account_id: verified.account_id,
            email: verified.email,
            role,
            display_name,
            access_token: verified.access_token,
            refresh_token: verified.refresh_token,
        })
    }

    /// Pure gate for protected routes: checks the Authorization header and
    /// verifies the bearer token upstream. No side effects.
    pub async fn authorize(&self, authorization: Option<&str>) -> Result<TokenClaims, ApiError> {
        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

        self.identity.verify_token(token).await.map_err(|e| match e {
            IdentityError::Unavailable(detail) => ApiError::Upstream(detail),
            _ => ApiError::Unauthorized("Invalid token".to_string()),
        })
    }

    pub async fn refresh(
        &self,
        account_id: &str,
        refresh_token: &str,
    ) -> Result<RefreshedSession, ApiError> {
        self.identity
            .refresh_session(account_id, refresh_token)
            .await
            .map_err(|e| match e {
                IdentityError::Unavailable(detail) => ApiError::Upstream(detail),
                _ => ApiError::Unauthorized("Invalid token".to_string()),
            })
    }
}

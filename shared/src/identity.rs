use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, AuthFlowType};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Outcome of a successful password verification: the upstream subject plus
/// the tokens it issued, passed through verbatim.
#[derive(Debug, Clone)]
pub struct VerifiedCredential {
    pub account_id: String,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
}

/// Claims decoded from a verified bearer token.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub account_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RefreshedSession {
    pub access_token: String,
    pub expires_in: i32,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("incorrect password")]
    InvalidPassword,
    #[error("email not found")]
    EmailNotFound,
    #[error("invalid token")]
    InvalidToken,
    #[error("identity service request failed: {0}")]
    Unavailable(String),
}

/// External identity service capability. The core never talks to the
/// concrete provider directly; everything goes through this interface.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register an email/password credential and return the new account id.
    async fn create_credential(&self, email: &str, password: &str) -> Result<String, IdentityError>;
    /// Check a credential and, on success, return the subject and tokens.
    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<VerifiedCredential, IdentityError>;
    /// Verify a bearer token and return its claims.
    async fn verify_token(&self, access_token: &str) -> Result<TokenClaims, IdentityError>;
    /// Exchange a refresh token for a fresh access token.
    async fn refresh_session(
        &self,
        account_id: &str,
        refresh_token: &str,
    ) -> Result<RefreshedSession, IdentityError>;
}

pub struct CognitoIdentityProvider {
    client: CognitoClient,
    client_id: String,
    client_secret: String,
    user_pool_id: String,
}

impl CognitoIdentityProvider {
    pub fn new(
        client: CognitoClient,
        client_id: String,
        client_secret: String,
        user_pool_id: String,
    ) -> Self {
        Self {
            client,
            client_id,
            client_secret,
            user_pool_id,
        }
    }

    /// Compute the SECRET_HASH Cognito expects alongside the username.
    fn secret_hash(&self, username: &str) -> String {
        let message = format!("{}{}", username, self.client_id);
        let mut mac = HmacSha256::new_from_slice(self.client_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentityProvider {
    async fn create_credential(&self, email: &str, password: &str) -> Result<String, IdentityError> {
        let email_attribute = AttributeType::builder()
            .name("email")
            .value(email)
            .build()
            .map_err(|e| IdentityError::Unavailable(format!("{:?}", e)))?;

        let result = self
            .client
            .sign_up()
            .client_id(&self.client_id)
            .username(email)
            .password(password)
            .secret_hash(self.secret_hash(email))
            .user_attributes(email_attribute)
            .send()
            .await;

        match result {
            Ok(response) => {
                let account_id = response.user_sub().to_string();

                // Password was already vetted locally; confirm the account so
                // the user can log in immediately after step 1.
                if let Err(e) = self
                    .client
                    .admin_confirm_sign_up()
                    .user_pool_id(&self.user_pool_id)
                    .username(email)
                    .send()
                    .await
                {
                    tracing::error!("Failed to auto-confirm account {}: {:?}", account_id, e);
                }

                Ok(account_id)
            }
            Err(e) => {
                let message = format!("{:?}", e);
                tracing::error!("Cognito sign_up error: {}", message);
                if message.contains("UsernameExistsException") {
                    Err(IdentityError::EmailTaken)
                } else {
                    Err(IdentityError::Unavailable(message))
                }
            }
        }
    }

    async fn verify_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<VerifiedCredential, IdentityError> {
        let result = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::UserPasswordAuth)
            .client_id(&self.client_id)
            .auth_parameters("USERNAME", email)
            .auth_parameters("PASSWORD", password)
            .auth_parameters("SECRET_HASH", self.secret_hash(email))
            .send()
            .await;

        match result {
            Ok(response) => {
                let auth = response.authentication_result().ok_or_else(|| {
                    IdentityError::Unavailable("No authentication result returned".to_string())
                })?;
                let access_token = auth.access_token().unwrap_or_default().to_string();
                let refresh_token = auth.refresh_token().unwrap_or_default().to_string();

                // Resolve the subject behind the fresh token.
                let claims = self.verify_token(&access_token).await?;

                Ok(VerifiedCredential {
                    account_id: claims.account_id,
                    email: claims.email.unwrap_or_else(|| email.to_string()),
                    access_token,
                    refresh_token,
                })
            }
            Err(e) => {
                let message = format!("{:?}", e);
                tracing::error!("Cognito authentication error: {}", message);
                if message.contains("UserNotFoundException") {
                    Err(IdentityError::EmailNotFound)
                } else if message.contains("NotAuthorizedException") {
                    Err(IdentityError::InvalidPassword)
                } else {
                    Err(IdentityError::Unavailable(message))
                }
            }
        }
    }

    async fn verify_token(&self, access_token: &str) -> Result<TokenClaims, IdentityError> {
        let result = self.client.get_user().access_token(access_token).send().await;

        match result {
            Ok(response) => {
                let mut account_id = None;
                let mut email = None;
                for attribute in response.user_attributes() {
                    match attribute.name() {
                        "sub" => account_id = attribute.value().map(str::to_string),
                        "email" => email = attribute.value().map(str::to_string),
                        _ => {}
                    }
                }

                Ok(TokenClaims {
                    account_id: account_id.unwrap_or_else(|| response.username().to_string()),
                    email,
                })
            }
            Err(e) => {
                let message = format!("{:?}", e);
                tracing::error!("Cognito token verification error: {}", message);
                if message.contains("NotAuthorizedException") {
                    Err(IdentityError::InvalidToken)
                } else {
                    Err(IdentityError::Unavailable(message))
                }
            }
        }
    }

    async fn refresh_session(
        &self,
        account_id: &str,
        refresh_token: &str,
    ) -> Result<RefreshedSession, IdentityError> {
        // For the refresh flow Cognito derives SECRET_HASH from the subject,
        // not the email.
        let result = self
            .client
            .initiate_auth()
            .auth_flow(AuthFlowType::RefreshTokenAuth)
            .client_id(&self.client_id)
            .auth_parameters("REFRESH_TOKEN", refresh_token)
            .auth_parameters("SECRET_HASH", self.secret_hash(account_id))
            .send()
            .await;

        match result {
            Ok(response) => {
                let auth = response.authentication_result().ok_or_else(|| {
                    IdentityError::Unavailable("No authentication result returned".to_string())
                })?;
                Ok(RefreshedSession {
                    access_token: auth.access_token().unwrap_or_default().to_string(),
                    expires_in: auth.expires_in(),
                })
            }
            Err(e) => {
                let message = format!("{:?}", e);
                tracing::error!("Cognito refresh error: {}", message);
                if message.contains("NotAuthorizedException") {
                    Err(IdentityError::InvalidToken)
                } else {
                    Err(IdentityError::Unavailable(message))
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted identity provider backing the workflow and gateway tests.
    /// Issues "token-{id}" / "refresh-{id}" pairs on verification.
    #[derive(Default)]
    pub struct StubIdentity {
        credentials: Mutex<HashMap<String, (String, String)>>,
        next_id: Mutex<u32>,
    }

    impl StubIdentity {
        pub fn new() -> Self {
            Self::default()
        }

        /// Seed a credential without going through create_credential.
        pub async fn seed(&self, email: &str, password: &str) -> String {
            self.create_credential(email, password).await.unwrap()
        }
    }

    #[async_trait]
    impl IdentityProvider for StubIdentity {
        async fn create_credential(
            &self,
            email: &str,
            password: &str,
        ) -> Result<String, IdentityError> {
            let mut credentials = self.credentials.lock().unwrap();
            if credentials.contains_key(email) {
                return Err(IdentityError::EmailTaken);
            }
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            let account_id = format!("acct-{}", *next_id);
            credentials.insert(email.to_string(), (account_id.clone(), password.to_string()));
            Ok(account_id)
        }

        async fn verify_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<VerifiedCredential, IdentityError> {
            let credentials = self.credentials.lock().unwrap();
            let (account_id, stored) = credentials
                .get(email)
                .ok_or(IdentityError::EmailNotFound)?;
            if stored != password {
                return Err(IdentityError::InvalidPassword);
            }
            Ok(VerifiedCredential {
                account_id: account_id.clone(),
                email: email.to_string(),
                access_token: format!("token-{}", account_id),
                refresh_token: format!("refresh-{}", account_id),
            })
        }

        async fn verify_token(&self, access_token: &str) -> Result<TokenClaims, IdentityError> {
            let account_id = access_token
                .strip_prefix("token-")
                .ok_or(IdentityError::InvalidToken)?;
            let credentials = self.credentials.lock().unwrap();
            let email = credentials
                .iter()
                .find(|(_, (id, _))| id == account_id)
                .map(|(email, _)| email.clone());
            if email.is_none() {
                return Err(IdentityError::InvalidToken);
            }
            Ok(TokenClaims {
                account_id: account_id.to_string(),
                email,
            })
        }

        async fn refresh_session(
            &self,
            account_id: &str,
            refresh_token: &str,
        ) -> Result<RefreshedSession, IdentityError> {
            if refresh_token != format!("refresh-{}", account_id) {
                return Err(IdentityError::InvalidToken);
            }
            Ok(RefreshedSession {
                access_token: format!("token-{}", account_id),
                expires_in: 3600,
            })
        }
    }
}

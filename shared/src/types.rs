use crate::store::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========== ROLES ==========

/// Application role attached to a user account at registration step 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Investor,
    Builder,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Investor => "investor",
            Role::Builder => "builder",
        }
    }

    pub fn parse(value: &str) -> Option<Role> {
        match value {
            "investor" => Some(Role::Investor),
            "builder" => Some(Role::Builder),
            _ => None,
        }
    }
}

/// Progress marker for the deferred-profile registration flow.
/// Monotonic: step1_complete -> complete, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    Step1Complete,
    Complete,
}

impl OnboardingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStatus::Step1Complete => "step1_complete",
            OnboardingStatus::Complete => "complete",
        }
    }

    pub fn parse(value: &str) -> Option<OnboardingStatus> {
        match value {
            "step1_complete" => Some(OnboardingStatus::Step1Complete),
            "complete" => Some(OnboardingStatus::Complete),
            _ => None,
        }
    }
}

// ========== USER ACCOUNT ==========

/// A user account document plus its id. Step-1 fields are typed; everything
/// merged in at step 2 lives in `profile`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub account_id: String,
    pub email: String,
    pub role: Role,
    pub onboarding_status: OnboardingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub profile: Document,
}

impl UserAccount {
    pub fn from_document(account_id: &str, mut doc: Document) -> Self {
        let email = take_string(&mut doc, "email").unwrap_or_default();
        let role = take_string(&mut doc, "role")
            .as_deref()
            .and_then(Role::parse)
            .unwrap_or(Role::Investor);
        let onboarding_status = take_string(&mut doc, "onboardingStatus")
            .as_deref()
            .and_then(OnboardingStatus::parse)
            .unwrap_or(OnboardingStatus::Step1Complete);
        let is_verified = doc.remove("isVerified").and_then(|v| v.as_bool());
        let created_at = take_string(&mut doc, "createdAt").unwrap_or_default();
        let updated_at = take_string(&mut doc, "updatedAt");

        Self {
            account_id: account_id.to_string(),
            email,
            role,
            onboarding_status,
            is_verified,
            created_at,
            updated_at,
            profile: doc,
        }
    }

    /// Display name shown to clients: stored full name, else the email.
    pub fn display_name(&self) -> String {
        self.profile
            .get("fullName")
            .and_then(Value::as_str)
            .unwrap_or(&self.email)
            .to_string()
    }
}

fn take_string(doc: &mut Document, key: &str) -> Option<String> {
    match doc.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

// ========== AUTH ==========

/// Email/password pair shared by login and registration step 1.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub account_id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub account_id: String,
    pub email: String,
    pub role: Role,
    pub display_name: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub account_id: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: i32,
}

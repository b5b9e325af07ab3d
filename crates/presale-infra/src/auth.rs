//! HttpIdentityVerifier -- token verification against a GoTrue-style
//! identity provider.
//!
//! Resolves a session's access token by calling `GET /auth/v1/user` with
//! the token as bearer auth plus the service anon key. The provider
//! answers with the user's id and a `role` claim inside `user_metadata`;
//! both are required for a party identity.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use uuid::Uuid;

use presale_core::verifier::IdentityVerifier;
use presale_types::error::AuthError;
use presale_types::identity::{PartyRole, VerifiedParty};

/// HTTP implementation of [`IdentityVerifier`].
pub struct HttpIdentityVerifier {
    client: reqwest::Client,
    base_url: String,
    service_key: SecretString,
}

/// Response body of `GET /auth/v1/user`.
#[derive(Debug, Deserialize)]
struct UserResponse {
    id: Uuid,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    role: Option<String>,
}

impl HttpIdentityVerifier {
    pub fn new(base_url: String, service_key: SecretString) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to create reqwest client");

        Self { client, base_url, service_key }
    }
}

impl IdentityVerifier for HttpIdentityVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedParty, AuthError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::VerifierUnavailable(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => AuthError::TokenRejected(format!("HTTP {status}")),
                _ => AuthError::VerifierUnavailable(format!("HTTP {status}: {error_body}")),
            });
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| AuthError::VerifierUnavailable(format!("malformed user response: {e}")))?;

        let role_claim = user
            .user_metadata
            .role
            .ok_or_else(|| AuthError::UnknownRole("<missing>".to_string()))?;
        let role: PartyRole = role_claim
            .parse()
            .map_err(|_| AuthError::UnknownRole(role_claim.clone()))?;

        tracing::debug!(party_id = %user.id, %role, "token verified");
        Ok(VerifiedParty { party_id: user.id, role })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_response_parses_role_from_metadata() {
        let json = r#"{
            "id": "2f6e63c8-8c3c-4b2f-9a3e-3c2d1b0a9f8e",
            "aud": "authenticated",
            "user_metadata": {"role": "blogger", "display_name": "Ann"}
        }"#;
        let user: UserResponse = serde_json::from_str(json).unwrap();
        assert_eq!(user.user_metadata.role.as_deref(), Some("blogger"));
    }

    #[test]
    fn user_response_tolerates_missing_metadata() {
        let user: UserResponse =
            serde_json::from_str(r#"{"id": "2f6e63c8-8c3c-4b2f-9a3e-3c2d1b0a9f8e"}"#).unwrap();
        assert!(user.user_metadata.role.is_none());
    }
}

//! Caller-scoped connector to the identity provider.
//!
//! Holds only the publishable key. Every operation here acts on behalf of a
//! single caller, scoped to that caller's credentials or bearer token; the
//! privileged service-role key is deliberately out of reach of this type.

use crate::cli::globals::GlobalArgs;
use crate::supabase::{endpoint_url, provider_error_message};
use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info_span, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum IdentityError {
    /// Wrong email/password. Deliberately carries no detail so callers cannot
    /// tell whether the email exists.
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("missing, invalid, or expired access token")]
    InvalidToken,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected identity provider response: {0}")]
    Unexpected(String),
}

/// Stable principal owned by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: Uuid,
    #[serde(default)]
    pub email: String,
}

/// Bearer token pair issued on successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
pub struct IdentityClient {
    base_url: String,
    anon_key: String,
    client: Client,
}

impl IdentityClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(globals: &GlobalArgs) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        Ok(Self {
            base_url: globals.supabase_url.clone(),
            anon_key: globals.anon_key.clone(),
            client,
        })
    }

    /// Validate credentials and obtain a session plus the caller's identity.
    ///
    /// # Errors
    /// Returns `InvalidCredentials` when the provider rejects the pair, or a
    /// transport/parse error otherwise.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Identity, Session), IdentityError> {
        let url = endpoint_url(&self.base_url, "/auth/v1/token")
            .map_err(|err| IdentityError::Unexpected(err.to_string()))?;

        let span = info_span!(
            "identity.sign_in",
            http.method = "POST",
            url = %url
        );
        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .instrument(span)
            .await?;

        let status = response.status();

        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(IdentityError::InvalidCredentials);
        }

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(IdentityError::Unexpected(format!(
                "{status}, {}",
                provider_error_message(&body)
            )));
        }

        let body: Value = response.json().await?;

        let session = Session {
            access_token: required_str(&body, "access_token")?.to_string(),
            refresh_token: required_str(&body, "refresh_token")?.to_string(),
        };

        let identity = parse_identity(body.get("user").unwrap_or(&Value::Null))?;

        Ok((identity, session))
    }

    /// Resolve an opaque bearer token to the identity it belongs to.
    ///
    /// # Errors
    /// Returns `InvalidToken` when the provider does not recognize the token.
    pub async fn get_user(&self, access_token: &str) -> Result<Identity, IdentityError> {
        let url = endpoint_url(&self.base_url, "/auth/v1/user")
            .map_err(|err| IdentityError::Unexpected(err.to_string()))?;

        let span = info_span!(
            "identity.get_user",
            http.method = "GET",
            url = %url
        );
        let response = self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(IdentityError::InvalidToken);
        }

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(IdentityError::Unexpected(format!(
                "{status}, {}",
                provider_error_message(&body)
            )));
        }

        let body: Value = response.json().await?;

        parse_identity(&body)
    }

    /// Revoke the session behind `access_token` (sign out).
    ///
    /// # Errors
    /// Returns `InvalidToken` when the token is already unusable.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let url = endpoint_url(&self.base_url, "/auth/v1/logout")
            .map_err(|err| IdentityError::Unexpected(err.to_string()))?;

        let span = info_span!(
            "identity.sign_out",
            http.method = "POST",
            url = %url
        );
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(IdentityError::InvalidToken);
        }

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(IdentityError::Unexpected(format!(
                "{status}, {}",
                provider_error_message(&body)
            )));
        }

        Ok(())
    }

    /// Reachability probe for `/health`.
    pub async fn health(&self) -> bool {
        let Ok(url) = endpoint_url(&self.base_url, "/auth/v1/health") else {
            return false;
        };

        match self
            .client
            .get(&url)
            .header("apikey", &self.anon_key)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

fn required_str<'a>(body: &'a Value, key: &str) -> Result<&'a str, IdentityError> {
    body.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| IdentityError::Unexpected(format!("no {key} in response")))
}

fn parse_identity(user: &Value) -> Result<Identity, IdentityError> {
    let id = user
        .get("id")
        .and_then(Value::as_str)
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| IdentityError::Unexpected("no user id in response".to_string()))?;

    let email = user
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(Identity { id, email })
}

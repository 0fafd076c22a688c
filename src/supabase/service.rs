//! Privileged connector to the profile store and identity administration.
//!
//! The profile store's own access policies would have to read the `role`
//! column of the row being authorized to decide whether that read is allowed,
//! which the store cannot evaluate. This connector therefore authenticates
//! with the service-role key, which is exempt from those policies. Its use is
//! confined to role lookup, profile creation/update, and identity
//! administration (bootstrap, password change); it must never satisfy a
//! general query on behalf of an end user.
//!
//! The key is optional at construction and checked on every call: a missing
//! key yields [`ServiceError::Configuration`], which call sites surface as a
//! server error, never as "not admin".

use crate::cli::globals::GlobalArgs;
use crate::supabase::{endpoint_url, profiles::Profile, provider_error_message, Identity, Role};
use anyhow::Result;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{info_span, Instrument};
use uuid::Uuid;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("service-role key is not configured")]
    Configuration,
    /// The lookup matched no row. Distinct from every other failure so
    /// callers can heal first-login absence without masking real errors.
    #[error("no matching profile row")]
    ProfileNotFound,
    /// The provider rejected the request (4xx) with a message worth
    /// forwarding, e.g. "email address already registered".
    #[error("identity provider rejected the request: {0}")]
    Rejected(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected profile store response: {0}")]
    Unexpected(String),
}

#[derive(Debug, Clone)]
pub struct ServiceClient {
    base_url: String,
    service_role_key: Option<SecretString>,
    client: Client,
}

impl ServiceClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(globals: &GlobalArgs) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()?;

        Ok(Self {
            base_url: globals.supabase_url.clone(),
            service_role_key: globals.service_role_key.clone(),
            client,
        })
    }

    /// Whether the service-role key is present, for operational reporting.
    /// Does not validate the key against the provider.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.service_role_key.is_some()
    }

    /// Per-call key check; a missing key surfaces here, not at startup.
    fn key(&self) -> Result<&str, ServiceError> {
        self.service_role_key
            .as_ref()
            .map(ExposeSecret::expose_secret)
            .ok_or(ServiceError::Configuration)
    }

    fn url_for(&self, path: &str) -> Result<String, ServiceError> {
        endpoint_url(&self.base_url, path).map_err(|err| ServiceError::Unexpected(err.to_string()))
    }

    /// Read the profile row for `id`, bypassing row-level security.
    ///
    /// # Errors
    /// `ProfileNotFound` when no row matches; `Configuration` when the
    /// service-role key is absent.
    pub async fn fetch_profile(&self, id: Uuid) -> Result<Profile, ServiceError> {
        let key = self.key()?;
        let url = self.url_for("/rest/v1/profiles")?;

        let span = info_span!(
            "service.fetch_profile",
            http.method = "GET",
            url = %url,
            user_id = %id
        );
        let response = self
            .client
            .get(&url)
            .query(&[("id", format!("eq.{id}")), ("select", "*".to_string())])
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .instrument(span)
            .await?;

        let rows: Vec<Profile> = parse_rows(response).await?;

        rows.into_iter().next().ok_or(ServiceError::ProfileNotFound)
    }

    /// Insert a profile row for `id` with the given role.
    ///
    /// # Errors
    /// `Configuration` when the service-role key is absent; `Rejected` when
    /// the store refuses the insert (e.g. duplicate row).
    pub async fn create_profile(&self, id: Uuid, role: Role) -> Result<Profile, ServiceError> {
        let key = self.key()?;
        let url = self.url_for("/rest/v1/profiles")?;

        let span = info_span!(
            "service.create_profile",
            http.method = "POST",
            url = %url,
            user_id = %id,
            role = %role
        );
        let response = self
            .client
            .post(&url)
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=representation")
            .json(&json!({ "id": id, "role": role }))
            .send()
            .instrument(span)
            .await?;

        let rows: Vec<Profile> = parse_rows(response).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| ServiceError::Unexpected("insert returned no row".to_string()))
    }

    /// Guarantee a profile row exists for the identity; create a
    /// least-privileged one on first contact.
    ///
    /// Returns the profile and whether it was created by this call. Only a
    /// no-matching-row lookup triggers creation; every other failure
    /// propagates untouched.
    ///
    /// # Errors
    /// Same failure modes as [`Self::fetch_profile`] and
    /// [`Self::create_profile`].
    pub async fn ensure_profile(&self, identity: &Identity) -> Result<(Profile, bool), ServiceError> {
        match self.fetch_profile(identity.id).await {
            Ok(profile) => Ok((profile, false)),
            Err(ServiceError::ProfileNotFound) => {
                let profile = self.create_profile(identity.id, Role::User).await?;
                Ok((profile, true))
            }
            Err(err) => Err(err),
        }
    }

    /// Update the optional name fields on a profile.
    ///
    /// # Errors
    /// `ProfileNotFound` when no row matches.
    pub async fn update_profile_names(
        &self,
        id: Uuid,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<Profile, ServiceError> {
        let key = self.key()?;
        let url = self.url_for("/rest/v1/profiles")?;

        let span = info_span!(
            "service.update_profile",
            http.method = "PATCH",
            url = %url,
            user_id = %id
        );
        let response = self
            .client
            .patch(&url)
            .query(&[("id", format!("eq.{id}"))])
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=representation")
            .json(&json!({
                "first_name": first_name,
                "last_name": last_name,
                "updated_at": Utc::now().to_rfc3339(),
            }))
            .send()
            .instrument(span)
            .await?;

        let rows: Vec<Profile> = parse_rows(response).await?;

        rows.into_iter().next().ok_or(ServiceError::ProfileNotFound)
    }

    /// Create an identity directly at the provider (bootstrap only).
    ///
    /// # Errors
    /// `Rejected` with the provider's message when creation is refused.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<Identity, ServiceError> {
        let key = self.key()?;
        let url = self.url_for("/auth/v1/admin/users")?;

        let span = info_span!(
            "service.create_user",
            http.method = "POST",
            url = %url
        );
        let response = self
            .client
            .post(&url)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or_default();

        if status.is_client_error() {
            return Err(ServiceError::Rejected(
                provider_error_message(&body).to_string(),
            ));
        }

        if !status.is_success() {
            return Err(ServiceError::Unexpected(format!(
                "{status}, {}",
                provider_error_message(&body)
            )));
        }

        let id = body
            .get("id")
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| ServiceError::Unexpected("no user id in response".to_string()))?;

        let email = body
            .get("email")
            .and_then(Value::as_str)
            .unwrap_or(email)
            .to_string();

        Ok(Identity { id, email })
    }

    /// Delete an identity at the provider (bootstrap rollback only).
    ///
    /// # Errors
    /// `Configuration` when the service-role key is absent.
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let key = self.key()?;
        let url = self.url_for(&format!("/auth/v1/admin/users/{id}"))?;

        let span = info_span!(
            "service.delete_user",
            http.method = "DELETE",
            url = %url,
            user_id = %id
        );
        let response = self
            .client
            .delete(&url)
            .header("apikey", key)
            .bearer_auth(key)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(ServiceError::Unexpected(format!(
                "{status}, {}",
                provider_error_message(&body)
            )));
        }

        Ok(())
    }

    /// Set a new password on an existing identity.
    ///
    /// # Errors
    /// `Rejected` when the provider refuses the new password.
    pub async fn update_user_password(
        &self,
        id: Uuid,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let key = self.key()?;
        let url = self.url_for(&format!("/auth/v1/admin/users/{id}"))?;

        let span = info_span!(
            "service.update_user_password",
            http.method = "PUT",
            url = %url,
            user_id = %id
        );
        let response = self
            .client
            .put(&url)
            .header("apikey", key)
            .bearer_auth(key)
            .json(&json!({ "password": new_password }))
            .send()
            .instrument(span)
            .await?;

        let status = response.status();

        if status.is_client_error() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(ServiceError::Rejected(
                provider_error_message(&body).to_string(),
            ));
        }

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(ServiceError::Unexpected(format!(
                "{status}, {}",
                provider_error_message(&body)
            )));
        }

        Ok(())
    }
}

/// Decode a PostgREST row set, surfacing store errors with their message.
async fn parse_rows(response: reqwest::Response) -> Result<Vec<Profile>, ServiceError> {
    let status = response.status();

    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or_default();

        if status.is_client_error() {
            return Err(ServiceError::Rejected(
                provider_error_message(&body).to_string(),
            ));
        }

        return Err(ServiceError::Unexpected(format!(
            "{status}, {}",
            provider_error_message(&body)
        )));
    }

    let body: Value = response.json().await?;

    match body {
        Value::Array(rows) => rows
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|err| ServiceError::Unexpected(err.to_string()))
            })
            .collect(),
        // Single-object representation, e.g. from an object-mode insert.
        row @ Value::Object(_) => Ok(vec![serde_json::from_value(row)
            .map_err(|err| ServiceError::Unexpected(err.to_string()))?]),
        other => Err(ServiceError::Unexpected(format!(
            "expected rows, got: {other}"
        ))),
    }
}

//! Caller-scoped connector to the content store (blogs, events).
//!
//! Reads use the publishable key alone, which is enough for public rows.
//! Mutations attach the caller's bearer token so the store applies its own
//! row-level policies to the write; the privileged key is never involved.

use crate::cli::globals::GlobalArgs;
use crate::supabase::{endpoint_url, provider_error_message};
use anyhow::Result;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{info_span, Instrument};

#[derive(thiserror::Error, Debug)]
pub enum ContentError {
    #[error("no matching row")]
    NotFound,
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("content store error: {0}")]
    Store(String),
}

#[derive(Debug, Clone)]
pub struct ContentClient {
    base_url: String,
    anon_key: String,
    client: Client,
}

impl ContentClient {
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

    fn table_url(&self, table: &str) -> Result<String, ContentError> {
        endpoint_url(&self.base_url, &format!("/rest/v1/{table}"))
            .map_err(|err| ContentError::Store(err.to_string()))
    }

    /// Anonymous request, for public reads.
    fn anon(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
    }

    /// Caller-scoped request, for mutations after gateway admission.
    fn scoped(&self, builder: RequestBuilder, access_token: &str) -> RequestBuilder {
        builder
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }

    /// List all rows of a table, ordered.
    ///
    /// # Errors
    /// `Store` with the provider's message on any non-success status.
    pub async fn list(&self, table: &str, order: &str) -> Result<Vec<Value>, ContentError> {
        let url = self.table_url(table)?;

        let span = info_span!("content.list", http.method = "GET", url = %url);
        let response = self
            .anon(self.client.get(&url))
            .query(&[("select", "*"), ("order", order)])
            .send()
            .instrument(span)
            .await?;

        parse_rows(response).await
    }

    /// Fetch one row by id.
    ///
    /// # Errors
    /// `NotFound` when no row matches.
    pub async fn get(&self, table: &str, id: &str) -> Result<Value, ContentError> {
        let url = self.table_url(table)?;

        let id_filter = format!("eq.{id}");
        let span = info_span!("content.get", http.method = "GET", url = %url);
        let response = self
            .anon(self.client.get(&url))
            .query(&[("select", "*"), ("id", id_filter.as_str())])
            .send()
            .instrument(span)
            .await?;

        parse_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(ContentError::NotFound)
    }

    /// Events with `date >= today`, soonest (then earliest start time) first.
    ///
    /// # Errors
    /// `Store` with the provider's message on any non-success status.
    pub async fn list_upcoming_events(&self, today: &str) -> Result<Vec<Value>, ContentError> {
        let url = self.table_url("events")?;

        let date_filter = format!("gte.{today}");
        let span = info_span!("content.list_upcoming", http.method = "GET", url = %url);
        let response = self
            .anon(self.client.get(&url))
            .query(&[
                ("select", "*"),
                ("date", date_filter.as_str()),
                ("order", "date.asc,start_time.asc"),
            ])
            .send()
            .instrument(span)
            .await?;

        parse_rows(response).await
    }

    /// Insert a row with the caller's token and return it.
    ///
    /// # Errors
    /// `Store` when the provider refuses the insert.
    pub async fn insert(
        &self,
        table: &str,
        access_token: &str,
        row: &Value,
    ) -> Result<Value, ContentError> {
        let url = self.table_url(table)?;

        let span = info_span!("content.insert", http.method = "POST", url = %url);
        let response = self
            .scoped(self.client.post(&url), access_token)
            .header("Prefer", "return=representation")
            .json(row)
            .send()
            .instrument(span)
            .await?;

        parse_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::Store("insert returned no row".to_string()))
    }

    /// Apply changes to the row with `id` and return the updated row.
    ///
    /// # Errors
    /// `NotFound` when no row matches.
    pub async fn update(
        &self,
        table: &str,
        access_token: &str,
        id: &str,
        changes: &Value,
    ) -> Result<Value, ContentError> {
        let url = self.table_url(table)?;

        let span = info_span!("content.update", http.method = "PATCH", url = %url);
        let response = self
            .scoped(self.client.patch(&url), access_token)
            .query(&[("id", &format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(changes)
            .send()
            .instrument(span)
            .await?;

        parse_rows(response)
            .await?
            .into_iter()
            .next()
            .ok_or(ContentError::NotFound)
    }

    /// Delete the row with `id`. Deleting an absent row is not an error.
    ///
    /// # Errors
    /// `Store` when the provider refuses the delete.
    pub async fn delete(
        &self,
        table: &str,
        access_token: &str,
        id: &str,
    ) -> Result<(), ContentError> {
        let url = self.table_url(table)?;

        let span = info_span!("content.delete", http.method = "DELETE", url = %url);
        let response = self
            .scoped(self.client.delete(&url), access_token)
            .query(&[("id", &format!("eq.{id}"))])
            .send()
            .instrument(span)
            .await?;

        let status = response.status();

        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or_default();
            return Err(ContentError::Store(format!(
                "{status}, {}",
                provider_error_message(&body)
            )));
        }

        Ok(())
    }
}

async fn parse_rows(response: reqwest::Response) -> Result<Vec<Value>, ContentError> {
    let status = response.status();

    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or_default();
        return Err(ContentError::Store(format!(
            "{status}, {}",
            provider_error_message(&body)
        )));
    }

    let body: Value = response.json().await?;

    match body {
        Value::Array(rows) => Ok(rows),
        row @ Value::Object(_) => Ok(vec![row]),
        other => Err(ContentError::Store(format!("expected rows, got: {other}"))),
    }
}

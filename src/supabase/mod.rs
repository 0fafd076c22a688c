//! Connectors to the external Supabase-style provider.
//!
//! The provider hosts two APIs behind one base URL: a GoTrue-compatible auth
//! API (`/auth/v1`) that owns identities and issues opaque bearer tokens, and
//! a PostgREST-compatible data API (`/rest/v1`) that stores profiles and
//! content behind row-level security.
//!
//! Three connectors, three trust levels:
//!
//! - [`IdentityClient`]: publishable key, caller-scoped token operations.
//! - [`ServiceClient`]: service-role key, exempt from row-level security.
//!   Used only for role resolution and profile/identity mutation; the key is
//!   validated lazily so a misconfigured deployment fails closed at first use
//!   instead of crashing at startup.
//! - [`ContentClient`]: publishable key plus the caller's own bearer token
//!   for mutations; never touches the privileged key.

pub mod content;
pub mod identity;
pub mod profiles;
pub mod service;

pub use content::{ContentClient, ContentError};
pub use identity::{Identity, IdentityClient, IdentityError, Session};
pub use profiles::{Profile, Role};
pub use service::{ServiceClient, ServiceError};

use anyhow::{anyhow, Result};
use serde_json::Value;
use url::Url;

/// # Errors
/// Returns an error if `base` cannot be parsed, has no host, or uses an
/// unsupported scheme.
pub(crate) fn endpoint_url(base: &str, path: &str) -> Result<String> {
    let url = Url::parse(base)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(anyhow!("Error parsing URL: unsupported scheme {scheme}")),
        },
    };

    Ok(format!("{scheme}://{host}:{port}{path}"))
}

/// Pull a human-readable message out of a provider error body.
///
/// GoTrue uses `msg`, `message`, or `error_description` depending on the
/// endpoint; PostgREST uses `message`.
pub(crate) fn provider_error_message(body: &Value) -> &str {
    for key in ["msg", "message", "error_description", "error"] {
        if let Some(message) = body.get(key).and_then(Value::as_str) {
            return message;
        }
    }

    ""
}

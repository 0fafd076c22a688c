//! # Redakto (Content Back Office API)
//!
//! `redakto` is the administrative backend for a content site: staff sign in,
//! then create, edit, and delete blogs and events, and manage their own
//! profile. Public readers browse the same content without credentials.
//!
//! ## Authorization Model
//!
//! Identities live in an external Supabase-style provider; `redakto` keeps a
//! `profiles` row per identity carrying a single `role` (`user` or `admin`).
//! Only admins may mutate anything. Every privileged request runs the same
//! decision procedure: resolve the bearer token to an identity, read the role
//! through a privileged connector, admit only when the role is `admin`.
//!
//! ## Dual Credentials
//!
//! The profile store enforces row-level security; evaluating those policies
//! with a caller-scoped credential would require reading the `role` column of
//! the very row being authorized. Role lookups therefore go through a
//! separate service-role connector that is exempt from the store's policies
//! and is never used for anything beyond role resolution and profile/password
//! mutation. The two connectors are distinct types so the privileged path can
//! never be reached from caller-supplied data.

pub mod api;
pub mod cli;
pub mod supabase;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

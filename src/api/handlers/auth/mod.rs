//! Authentication and authorization handlers.
//!
//! Every privileged route in the API runs the same decision procedure,
//! [`gateway::authorize`]: resolve the bearer token to an identity with the
//! caller-scoped connector, read the role through the privileged connector,
//! admit only admins. Nothing is cached between requests; roles can change
//! and tokens can be revoked at any time.

pub mod check;
pub mod gateway;
pub mod login;
pub mod logout;
pub mod setup_admin;
pub mod types;

pub use gateway::{authorize, AdminIdentity, AuthError};

//! Request/response types for auth endpoints.

use crate::supabase::{Identity, Role, Session};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub user: Identity,
    pub session: Session,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CheckResponse {
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
    pub role: Option<Role>,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetupAdminRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SetupAdminResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub email: String,
}

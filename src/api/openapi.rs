use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::api::handlers::{auth, blogs, events, health, settings, upload};
use crate::supabase::{Identity, Profile, Role, Session};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&BearerAuth),
    paths(
        health::health,
        auth::login::login,
        auth::check::check,
        auth::logout::logout,
        auth::setup_admin::setup_admin,
        settings::get_settings,
        settings::update_settings,
        settings::change_password,
        blogs::list,
        blogs::create,
        blogs::update,
        blogs::remove,
        events::list,
        events::upcoming,
        events::create,
        events::update,
        events::remove,
        upload::upload,
    ),
    components(schemas(
        Identity,
        Session,
        Profile,
        Role,
        health::Health,
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::CheckResponse,
        auth::types::SetupAdminRequest,
        auth::types::SetupAdminResponse,
        settings::SettingsResponse,
        settings::UpdateSettingsRequest,
        blogs::CreateBlogRequest,
        blogs::UpdateBlogRequest,
        events::BuyTicketLink,
        events::CreateEventRequest,
        events::UpdateEventRequest,
        upload::UploadResponse,
        crate::api::handlers::SuccessResponse,
    )),
    tags(
        (name = "auth", description = "Login, logout, admin check, and bootstrap"),
        (name = "content", description = "Blogs, events, and image uploads"),
        (name = "settings", description = "Profile and password self-service"),
        (name = "health", description = "Operational status"),
    )
)]
pub struct ApiDoc;

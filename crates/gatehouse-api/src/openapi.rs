//! OpenAPI documentation for the Gatehouse API

use crate::auth::LoginRequest;
use crate::error::ApiError;
use crate::handlers::auth::{LoginResponse, MeResponse, MessageResponse, UserInfo};
use crate::handlers::health::HealthResponse;
use crate::handlers::users::{CreateUserRequest, UpdateUserRequest};
use gatehouse_core::{PageLinks, PageMeta, PrincipalView};
use utoipa::openapi::security::{
    ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Gatehouse API",
        description = "User accounts with cookie-based JWT sessions. Access tokens live 15 minutes, refresh tokens 7 days; logout revokes tokens for the life of the process."
    ),
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::banner,
        crate::handlers::auth::login_handler,
        crate::handlers::auth::refresh_handler,
        crate::handlers::auth::me_handler,
        crate::handlers::auth::logout_handler,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
    ),
    components(schemas(
        ApiError,
        HealthResponse,
        LoginRequest,
        LoginResponse,
        MeResponse,
        MessageResponse,
        UserInfo,
        CreateUserRequest,
        UpdateUserRequest,
        PrincipalView,
        PageMeta,
        PageLinks,
    )),
    tags(
        (name = "health", description = "Service health checks"),
        (name = "auth", description = "Login, refresh, introspection and logout"),
        (name = "users", description = "User account management"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("access_token"))),
            );
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Access token as a Bearer header"))
                        .build(),
                ),
            );
        }
    }
}

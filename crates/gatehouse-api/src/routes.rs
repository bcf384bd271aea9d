//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, health, users};
use crate::openapi::ApiDoc;
use crate::state::AppState;
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Routes mounted under `/api/v1`
pub fn api_routes(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes; each handler reads its own cookie
    let auth_routes = Router::new()
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let mut user_routes = Router::new()
        .route("/users", post(users::create_user).get(users::list_users))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        );

    if state.config.auth.protect_user_routes {
        user_routes = user_routes.route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));
    }

    Router::new().merge(auth_routes).merge(user_routes)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    // Credentialed CORS forbids wildcards, so everything is listed explicitly
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([ACCEPT, AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true)
}

/// Full application router with CORS, request tracing and Swagger UI
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1", get(health::banner))
        .nest("/api/v1", api_routes(&state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

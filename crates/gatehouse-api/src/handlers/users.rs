//! User management handlers

use crate::audit::{audit_log, AuditEvent};
use crate::auth::{hash_password, AuthenticatedUser};
use crate::error::{ApiResponse, AppError};
use crate::state::AppState;
use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use gatehouse_core::{
    build_page_meta, page_in_range, ListQuery, PageRequest, Principal, PrincipalView, UserFilters,
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

/// New account
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 20, message = "username must be 1-20 characters"))]
    #[schema(example = "johndoe")]
    pub username: String,
    #[validate(length(min = 1, message = "name is required"))]
    #[schema(example = "John Doe")]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    #[schema(example = "johndoe@example.com")]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
}

/// Replacement profile. An empty or absent `password` keeps the current one.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 20, message = "username must be 1-20 characters"))]
    pub username: String,
    #[validate(length(min = 1, max = 20, message = "name must be 1-20 characters"))]
    pub name: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: Option<String>,
}

/// Query parameters for user listing
///
/// `page` and `page_size` arrive as text: an empty or non-numeric value
/// falls back to the default instead of failing the request.
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListUsersQuery {
    /// Page number (1-indexed, values below 1 read as 1)
    #[param(value_type = Option<i64>, default = 1)]
    pub page: Option<String>,

    /// Items per page
    #[param(value_type = Option<u32>, default = 10)]
    pub page_size: Option<String>,

    /// `;`-separated terms matched against username and email
    pub search: Option<String>,

    /// Exact account status
    pub status: Option<i32>,
}

fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Integer query value; `None` when absent, empty or unparsable
fn int_param(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse().ok())
}

fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("invalid user id: {raw}")))
}

async fn hash_blocking(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing aborted: {e}")))?
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// `scheme://host/path` of the current request, used for page links
fn request_base_url(headers: &HeaderMap, uri: &axum::http::Uri) -> String {
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}{}", uri.path())
}

/// Create a user
#[utoipa::path(
    post,
    path = "/api/v1/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "A new record has been stored."),
        (status = 400, description = "Validation failed", body = crate::error::ApiError),
        (status = 409, description = "Username or email already taken", body = crate::error::ApiError),
    ),
    security(("cookie_auth" = []))
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    actor: Option<Extension<AuthenticatedUser>>,
    WithRejection(Json(mut request), _): WithRejection<Json<CreateUserRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    request.username = normalize_username(&request.username);
    request.email = normalize_email(&request.email);
    request.validate()?;

    let hash = hash_blocking(request.password, state.config.auth.bcrypt_cost).await?;
    let principal = Principal::new(request.username, request.name, request.email, hash);

    let created = state.users.create(principal).await?;

    audit_log(&AuditEvent::UserCreated {
        user_id: created.id,
        actor: actor.map(|Extension(u)| u.user_id),
    });

    Ok(ApiResponse::new(StatusCode::CREATED, "A new record has been stored.")
        .with_data(PrincipalView::from(created)))
}

/// List users, paginated
///
/// An empty result or a page past the end answers 200 with `data: []` and
/// no `meta`.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users"),
        (status = 400, description = "Invalid page_size", body = crate::error::ApiError),
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    OriginalUri(uri): OriginalUri,
    WithRejection(Query(params), _): WithRejection<Query<ListUsersQuery>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let limits = &state.config.pagination;
    let page_size = match int_param(params.page_size.as_deref()) {
        None => limits.default_page_size,
        Some(size) if (1..=i64::from(limits.max_page_size)).contains(&size) => size as u32,
        Some(_) => {
            return Err(AppError::BadRequest(format!(
                "page_size must be between 1 and {}",
                limits.max_page_size
            )))
        }
    };

    let page = PageRequest::new(int_param(params.page.as_deref()).unwrap_or(1), page_size)
        .ok_or_else(|| AppError::BadRequest("page_size must be positive".to_string()))?;
    let search = params.search.unwrap_or_default();
    let filters = UserFilters {
        status: params.status,
    };

    let query = ListQuery::for_entity::<Principal>(page, &search, filters.clone());
    let (users, total_count) = state.users.find_all(&query).await?;

    if !page_in_range(page.page(), page.page_size(), total_count) {
        return Ok(ApiResponse::new(StatusCode::OK, "No records found.")
            .with_data(Vec::<PrincipalView>::new()));
    }

    let meta = build_page_meta(
        &request_base_url(&headers, &uri),
        &search,
        page.page(),
        page.page_size(),
        total_count,
        &filters.to_query_pairs(),
    );

    Ok(ApiResponse::new(StatusCode::OK, "Successfully retrieved all records.")
        .with_data(users.into_iter().map(PrincipalView::from).collect())
        .with_meta(meta))
}

/// Find a user by id
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Successfully retrieved selected record.", body = PrincipalView),
        (status = 400, description = "Malformed id", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("cookie_auth" = []))
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let principal = state.users.find_by_id(parse_id(&id)?).await?;

    Ok(ApiResponse::new(StatusCode::OK, "Successfully retrieved selected record.")
        .with_data(PrincipalView::from(principal)))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Selected record has been updated.", body = PrincipalView),
        (status = 400, description = "Validation failed", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
        (status = 409, description = "Username or email already taken", body = crate::error::ApiError),
    ),
    security(("cookie_auth" = []))
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    WithRejection(Json(mut request), _): WithRejection<Json<UpdateUserRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;

    request.username = normalize_username(&request.username);
    request.email = normalize_email(&request.email);
    request.password = request.password.filter(|p| !p.is_empty());
    request.validate()?;

    let mut principal = state.users.find_by_id(id).await?;
    principal.username = request.username;
    principal.name = request.name;
    principal.email = request.email;
    if let Some(password) = request.password {
        principal.password_hash = hash_blocking(password, state.config.auth.bcrypt_cost).await?;
    }
    principal.updated_at = Utc::now();

    let updated = state.users.update(principal).await?;

    Ok(ApiResponse::new(StatusCode::OK, "Selected record has been updated.")
        .with_data(PrincipalView::from(updated)))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Selected record has been deleted."),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    ),
    security(("cookie_auth" = []))
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    actor: Option<Extension<AuthenticatedUser>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id)?;
    state.users.delete(id).await?;

    audit_log(&AuditEvent::UserDeleted {
        user_id: id,
        actor: actor.map(|Extension(u)| u.user_id),
    });

    Ok(ApiResponse::<()>::new(StatusCode::OK, "Selected record has been deleted."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_username(" JohnDoe "), "johndoe");
        assert_eq!(normalize_email("  John@Example.COM "), "john@example.com");
    }

    #[test]
    fn test_int_param_ignores_garbage() {
        assert_eq!(int_param(None), None);
        assert_eq!(int_param(Some("")), None);
        assert_eq!(int_param(Some("abc")), None);
        assert_eq!(int_param(Some(" 3 ")), Some(3));
        assert_eq!(int_param(Some("-5")), Some(-5));
    }

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string()).unwrap(), id);
        assert!(matches!(parse_id("42"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_create_request_validation() {
        let valid = CreateUserRequest {
            username: "johndoe".into(),
            name: "John".into(),
            email: "john@example.com".into(),
            password: "password1".into(),
        };
        assert!(valid.validate().is_ok());

        let too_long = CreateUserRequest {
            username: "a".repeat(21),
            ..valid
        };
        let errors = too_long.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
    }

    #[test]
    fn test_update_password_is_optional() {
        let request = UpdateUserRequest {
            username: "johndoe".into(),
            name: "John".into(),
            email: "john@example.com".into(),
            password: None,
        };
        assert!(request.validate().is_ok());

        let short = UpdateUserRequest {
            password: Some("short".into()),
            ..request
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_request_base_url() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "api.example.com".parse().unwrap());
        let uri: axum::http::Uri = "/api/v1/users?page=2".parse().unwrap();

        assert_eq!(
            request_base_url(&headers, &uri),
            "http://api.example.com/api/v1/users"
        );

        headers.insert("x-forwarded-proto", "https".parse().unwrap());
        assert_eq!(
            request_base_url(&headers, &uri),
            "https://api.example.com/api/v1/users"
        );
    }
}

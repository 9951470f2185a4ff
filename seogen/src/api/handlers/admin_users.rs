//! User management through the hosted auth service's admin API.

use crate::{
    AppState,
    api::handlers::{parse_uuid, required},
    api::json::Json,
    api::models::{
        SuccessResponse,
        users::{CreateUserRequest, DeleteUserRequest, Role, UpdateUserRoleRequest, UserEnvelope, UserListResponse, UserResponse},
    },
    auth::current_user::AdminUser,
    errors::{Error, Result},
    types::abbrev_uuid,
};
use axum::extract::State;
use tracing::info;

fn parse_role(value: Option<String>) -> Result<Role> {
    required("role", value)?.parse().map_err(Error::bad_request)
}

/// List all users
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    summary = "List users",
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
        (status = 500, description = "Auth service error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<UserListResponse>> {
    let users = state.auth.list_users().await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(UserResponse::from).collect(),
    }))
}

/// Create a user with a role
#[utoipa::path(
    post,
    path = "/admin/users",
    tag = "admin",
    summary = "Create user",
    description = "Creates a confirmed user. `role` is one of `admin`, `editor`, `user`.",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "User created", body = UserEnvelope),
        (status = 400, description = "Missing email, password or role, or unknown role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
        (status = 500, description = "Auth service error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserEnvelope>> {
    let email = required("email", request.email)?;
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| Error::missing_field("password"))?;
    let role = parse_role(request.role)?;

    let user = state.auth.create_user(&email, &password, role).await?;
    info!(user_id = %abbrev_uuid(&user.id), %role, by = %abbrev_uuid(&admin.id), "User created");

    Ok(Json(UserEnvelope { user: user.into() }))
}

/// Change a user's role
#[utoipa::path(
    patch,
    path = "/admin/users",
    tag = "admin",
    summary = "Update user role",
    request_body = UpdateUserRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserEnvelope),
        (status = 400, description = "Missing or invalid userId or role"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
        (status = 500, description = "Auth service error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn update_user_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<UpdateUserRoleRequest>,
) -> Result<Json<UserEnvelope>> {
    let user_id = parse_uuid("userId", &required("userId", request.user_id)?)?;
    let role = parse_role(request.role)?;

    let user = state.auth.update_user_role(user_id, role).await?;
    info!(user_id = %abbrev_uuid(&user_id), %role, by = %abbrev_uuid(&admin.id), "User role updated");

    Ok(Json(UserEnvelope { user: user.into() }))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/admin/users",
    tag = "admin",
    summary = "Delete user",
    request_body = DeleteUserRequest,
    responses(
        (status = 200, description = "User deleted", body = SuccessResponse),
        (status = 400, description = "Missing or invalid userId"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires admin role"),
        (status = 500, description = "Auth service error"),
    ),
    security(("BearerAuth" = []), ("CookieAuth" = []))
)]
#[tracing::instrument(skip_all)]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(request): Json<DeleteUserRequest>,
) -> Result<Json<SuccessResponse>> {
    let user_id = parse_uuid("userId", &required("userId", request.user_id)?)?;

    state.auth.delete_user(user_id).await?;
    info!(user_id = %abbrev_uuid(&user_id), by = %abbrev_uuid(&admin.id), "User deleted");

    Ok(Json(SuccessResponse::ok()))
}

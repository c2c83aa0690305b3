//! `/auth` endpoints: login, registration and account management.

use crate::error::{blocking, ApiError};
use crate::extract::{ApiJson, ApiPath, Principal};
use crate::AppState;
use api_shared::{ApiSuccess, ErrorBody, SuccessBody};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use referral_core::{
    Credentials, LoginOutcome, PasswordChange, RecordId, Registration, UserSummary, UserUpdate,
};

#[utoipa::path(
    post,
    path = "/auth/login",
    responses(
        (status = 200, description = "Token and user summary", body = SuccessBody),
        (status = 401, description = "Invalid email or password", body = ErrorBody)
    )
)]
/// Exchange `{email, password}` for a bearer token.
#[axum::debug_handler]
pub(crate) async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<Json<ApiSuccess<LoginOutcome>>, ApiError> {
    let accounts = state.accounts.clone();
    let outcome = blocking(move || accounts.login(credentials)).await?;
    Ok(Json(ApiSuccess::data(outcome)))
}

#[utoipa::path(
    post,
    path = "/auth/register",
    responses(
        (status = 201, description = "User created", body = SuccessBody),
        (status = 400, description = "Invalid input or email already registered", body = ErrorBody),
        (status = 403, description = "ADMIN role requested", body = ErrorBody)
    )
)]
/// Self-registration with role `MEDICO` (default) or `JEFE_SERVICIO`.
#[axum::debug_handler]
pub(crate) async fn register(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<(StatusCode, Json<ApiSuccess<UserSummary>>), ApiError> {
    let accounts = state.accounts.clone();
    let user = blocking(move || accounts.register(registration)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::with_message(user, "User created")),
    ))
}

#[utoipa::path(
    get,
    path = "/auth/users",
    responses(
        (status = 200, description = "All user accounts", body = SuccessBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn list_users(
    State(state): State<AppState>,
    Principal(principal): Principal,
) -> Result<Json<ApiSuccess<Vec<UserSummary>>>, ApiError> {
    let accounts = state.accounts.clone();
    let users = blocking(move || accounts.list_users(&principal)).await?;
    Ok(Json(ApiSuccess::data(users)))
}

#[utoipa::path(
    patch,
    path = "/auth/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User updated", body = SuccessBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
/// Admin edit of role, name, email or service.
#[axum::debug_handler]
pub(crate) async fn update_user(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<Json<ApiSuccess<UserSummary>>, ApiError> {
    let accounts = state.accounts.clone();
    let user = blocking(move || accounts.update_user(&principal, &id, update)).await?;
    Ok(Json(ApiSuccess::with_message(user, "User updated")))
}

#[utoipa::path(
    patch,
    path = "/auth/users/{id}/deactivate",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = SuccessBody),
        (status = 400, description = "Admin tried to deactivate themselves", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn deactivate_user(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Json<ApiSuccess<UserSummary>>, ApiError> {
    let accounts = state.accounts.clone();
    let user = blocking(move || accounts.set_active(&principal, &id, false)).await?;
    Ok(Json(ApiSuccess::with_message(user, "User deactivated")))
}

#[utoipa::path(
    patch,
    path = "/auth/users/{id}/reactivate",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User reactivated", body = SuccessBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn reactivate_user(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Json<ApiSuccess<UserSummary>>, ApiError> {
    let accounts = state.accounts.clone();
    let user = blocking(move || accounts.set_active(&principal, &id, true)).await?;
    Ok(Json(ApiSuccess::with_message(user, "User reactivated")))
}

#[utoipa::path(
    put,
    path = "/auth/password",
    responses(
        (status = 200, description = "Password changed", body = SuccessBody),
        (status = 401, description = "Current password is wrong", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
/// Change the caller's own password.
#[axum::debug_handler]
pub(crate) async fn change_password(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiJson(change): ApiJson<PasswordChange>,
) -> Result<Json<ApiSuccess<()>>, ApiError> {
    let accounts = state.accounts.clone();
    blocking(move || accounts.change_password(&principal, change)).await?;
    Ok(Json(ApiSuccess::message("Password changed")))
}

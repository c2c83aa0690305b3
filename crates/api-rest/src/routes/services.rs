//! `/services` endpoints. Reads are public; writes need an admin token.

use crate::error::{blocking, ApiError};
use crate::extract::{ApiJson, ApiPath, Principal};
use crate::AppState;
use api_shared::{ApiSuccess, ErrorBody, SuccessBody};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use referral_core::{NewService, RecordId, Service, ServiceUpdate};

#[utoipa::path(
    get,
    path = "/services",
    responses(
        (status = 200, description = "All services ordered by name", body = SuccessBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn list_services(
    State(state): State<AppState>,
) -> Result<Json<ApiSuccess<Vec<Service>>>, ApiError> {
    let directory = state.directory.clone();
    let services = blocking(move || directory.list()).await?;
    Ok(Json(ApiSuccess::data(services)))
}

#[utoipa::path(
    get,
    path = "/services/{id}",
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "The service", body = SuccessBody),
        (status = 404, description = "No such service", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn get_service(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Json<ApiSuccess<Service>>, ApiError> {
    let directory = state.directory.clone();
    let service = blocking(move || directory.get(&id)).await?;
    Ok(Json(ApiSuccess::data(service)))
}

#[utoipa::path(
    get,
    path = "/services/search/{name}",
    params(("name" = String, Path, description = "Case-insensitive name fragment")),
    responses(
        (status = 200, description = "Services whose name contains the fragment", body = SuccessBody)
    )
)]
#[axum::debug_handler]
pub(crate) async fn search_services(
    State(state): State<AppState>,
    ApiPath(name): ApiPath<String>,
) -> Result<Json<ApiSuccess<Vec<Service>>>, ApiError> {
    let directory = state.directory.clone();
    let services = blocking(move || directory.search(&name)).await?;
    Ok(Json(ApiSuccess::data(services)))
}

#[utoipa::path(
    post,
    path = "/services",
    responses(
        (status = 201, description = "Service created", body = SuccessBody),
        (status = 400, description = "Invalid input or duplicate name/head email", body = ErrorBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn create_service(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiJson(input): ApiJson<NewService>,
) -> Result<(StatusCode, Json<ApiSuccess<Service>>), ApiError> {
    let directory = state.directory.clone();
    let service = blocking(move || directory.create(&principal, input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::with_message(service, "Service created")),
    ))
}

#[utoipa::path(
    put,
    path = "/services/{id}",
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service updated", body = SuccessBody),
        (status = 404, description = "No such service", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn update_service(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(update): ApiJson<ServiceUpdate>,
) -> Result<Json<ApiSuccess<Service>>, ApiError> {
    let directory = state.directory.clone();
    let service = blocking(move || directory.update(&principal, &id, update)).await?;
    Ok(Json(ApiSuccess::with_message(service, "Service updated")))
}

#[utoipa::path(
    delete,
    path = "/services/{id}",
    params(("id" = String, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service deleted", body = SuccessBody),
        (status = 404, description = "No such service", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn delete_service(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Json<ApiSuccess<()>>, ApiError> {
    let directory = state.directory.clone();
    blocking(move || directory.delete(&principal, &id)).await?;
    Ok(Json(ApiSuccess::message("Service deleted")))
}

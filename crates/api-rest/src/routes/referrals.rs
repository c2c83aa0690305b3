//! `/referrals` endpoints.

use crate::error::{blocking, ApiError};
use crate::extract::{ApiJson, ApiPath, ApiQuery, Principal};
use crate::AppState;
use api_shared::{ApiSuccess, ErrorBody, SuccessBody};
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use referral_core::{FilterParams, NewNote, NewReferral, RecordId, Referral, StatusUpdate};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AdminListQuery {
    #[serde(default)]
    service_id: Option<RecordId>,
}

#[utoipa::path(
    get,
    path = "/referrals/filter",
    params(
        ("status" = Option<String>, Query, description = "PENDING, IN_PROGRESS, COMPLETED or CANCELLED"),
        ("priority" = Option<String>, Query, description = "LOW, MEDIUM, HIGH or URGENT"),
        ("direction" = Option<String>, Query, description = "sent, received or none"),
        ("serviceId" = Option<String>, Query, description = "Service scope; non-admins may only name their own")
    ),
    responses(
        (status = 200, description = "Matching referrals, newest first", body = SuccessBody),
        (status = 403, description = "Scope outside the caller's service", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn filter_referrals(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiQuery(params): ApiQuery<FilterParams>,
) -> Result<Json<ApiSuccess<Vec<Referral>>>, ApiError> {
    let referrals = state.referrals.clone();
    let found = blocking(move || referrals.filter(&principal, &params)).await?;
    Ok(Json(ApiSuccess::data(found)))
}

#[utoipa::path(
    post,
    path = "/referrals",
    responses(
        (status = 201, description = "Referral created as PENDING", body = SuccessBody),
        (status = 400, description = "Invalid input, unknown service or duplicate medical record number", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn create_referral(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiJson(input): ApiJson<NewReferral>,
) -> Result<(StatusCode, Json<ApiSuccess<Referral>>), ApiError> {
    let referrals = state.referrals.clone();
    let referral = blocking(move || referrals.create(&principal, input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::with_message(referral, "Referral created")),
    ))
}

#[utoipa::path(
    get,
    path = "/referrals/{id}",
    params(("id" = String, Path, description = "Referral id")),
    responses(
        (status = 200, description = "The referral", body = SuccessBody),
        (status = 404, description = "No such referral", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn get_referral(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Json<ApiSuccess<Referral>>, ApiError> {
    let referrals = state.referrals.clone();
    let referral = blocking(move || referrals.get(&principal, &id)).await?;
    Ok(Json(ApiSuccess::data(referral)))
}

#[utoipa::path(
    put,
    path = "/referrals/{id}/status",
    params(("id" = String, Path, description = "Referral id")),
    responses(
        (status = 200, description = "Status changed", body = SuccessBody),
        (status = 409, description = "Illegal transition or stale expectedVersion", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
/// Body: `{ "status": "IN_PROGRESS", "expectedVersion"?: 3 }`.
#[axum::debug_handler]
pub(crate) async fn update_status(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<ApiSuccess<Referral>>, ApiError> {
    let referrals = state.referrals.clone();
    let referral = blocking(move || referrals.update_status(&principal, &id, update)).await?;
    Ok(Json(ApiSuccess::with_message(referral, "Status updated")))
}

#[utoipa::path(
    post,
    path = "/referrals/{id}/notes",
    params(("id" = String, Path, description = "Referral id")),
    responses(
        (status = 200, description = "Note appended", body = SuccessBody),
        (status = 404, description = "No such referral", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
/// Body: `{ "content": "...", "authorServiceId"?: "...", "authorName"?: "..." }`.
#[axum::debug_handler]
pub(crate) async fn add_note(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
    ApiJson(note): ApiJson<NewNote>,
) -> Result<Json<ApiSuccess<Referral>>, ApiError> {
    let referrals = state.referrals.clone();
    let referral = blocking(move || referrals.add_note(&principal, &id, note)).await?;
    Ok(Json(ApiSuccess::with_message(referral, "Note added")))
}

#[utoipa::path(
    put,
    path = "/referrals/{id}/notifications/read",
    params(("id" = String, Path, description = "Referral id")),
    responses(
        (status = 200, description = "All notifications read", body = SuccessBody),
        (status = 404, description = "No such referral", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn mark_notifications_read(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(id): ApiPath<RecordId>,
) -> Result<Json<ApiSuccess<Referral>>, ApiError> {
    let referrals = state.referrals.clone();
    let referral = blocking(move || referrals.mark_notifications_read(&principal, &id)).await?;
    Ok(Json(ApiSuccess::with_message(
        referral,
        "Notifications marked as read",
    )))
}

#[utoipa::path(
    get,
    path = "/referrals/search/history/{mrn}",
    params(("mrn" = String, Path, description = "Patient medical record number")),
    responses(
        (status = 200, description = "Referrals for the patient, newest first", body = SuccessBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn search_history(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(mrn): ApiPath<String>,
) -> Result<Json<ApiSuccess<Vec<Referral>>>, ApiError> {
    let referrals = state.referrals.clone();
    let found = blocking(move || referrals.search_history(&principal, &mrn)).await?;
    Ok(Json(ApiSuccess::data(found)))
}

#[utoipa::path(
    get,
    path = "/referrals/sent/{service_id}",
    params(("service_id" = String, Path, description = "Requesting service id")),
    responses(
        (status = 200, description = "Referrals sent by the service, newest first", body = SuccessBody),
        (status = 403, description = "Service is not the caller's own", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn sent_referrals(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(service_id): ApiPath<RecordId>,
) -> Result<Json<ApiSuccess<Vec<Referral>>>, ApiError> {
    let referrals = state.referrals.clone();
    let found = blocking(move || referrals.sent(&principal, service_id)).await?;
    Ok(Json(ApiSuccess::data(found)))
}

#[utoipa::path(
    get,
    path = "/referrals/received/{service_id}",
    params(("service_id" = String, Path, description = "Destination service id")),
    responses(
        (status = 200, description = "Referrals received by the service, newest first", body = SuccessBody),
        (status = 403, description = "Service is not the caller's own", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn received_referrals(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiPath(service_id): ApiPath<RecordId>,
) -> Result<Json<ApiSuccess<Vec<Referral>>>, ApiError> {
    let referrals = state.referrals.clone();
    let found = blocking(move || referrals.received(&principal, service_id)).await?;
    Ok(Json(ApiSuccess::data(found)))
}

#[utoipa::path(
    get,
    path = "/referrals/admin/all",
    params(("serviceId" = Option<String>, Query, description = "Narrow to one service on either side")),
    responses(
        (status = 200, description = "Every referral, newest first", body = SuccessBody),
        (status = 403, description = "Caller is not an admin", body = ErrorBody)
    ),
    security(("bearer" = []))
)]
#[axum::debug_handler]
pub(crate) async fn all_referrals(
    State(state): State<AppState>,
    Principal(principal): Principal,
    ApiQuery(query): ApiQuery<AdminListQuery>,
) -> Result<Json<ApiSuccess<Vec<Referral>>>, ApiError> {
    let referrals = state.referrals.clone();
    let found = blocking(move || referrals.list_all(&principal, query.service_id)).await?;
    Ok(Json(ApiSuccess::data(found)))
}

//! # API REST
//!
//! REST API for the referral tracking system.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Mapping core errors to status codes and the JSON failure envelope
//!
//! Uses `api-shared` for the envelopes and `referral-core` for every rule.

#![warn(rust_2018_idioms)]

pub mod error;
pub mod extract;
mod routes;

use api_shared::{ErrorBody, HealthRes, SuccessBody};
use axum::extract::{Request, State};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use referral_core::{
    AccountService, CoreConfig, CoreError, CoreResult, DirectoryService, IdentityResolver,
    ReferralService, RunMode, Storage, TokenService,
};
use std::sync::Arc;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use error::ApiError;

/// Shared state for every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub referrals: Arc<ReferralService>,
    pub accounts: Arc<AccountService>,
    pub directory: Arc<DirectoryService>,
    pub identity: Arc<IdentityResolver>,
    pub run_mode: RunMode,
}

impl AppState {
    pub fn new(cfg: &CoreConfig, storage: Storage) -> CoreResult<Self> {
        let tokens = Arc::new(TokenService::from_config(cfg)?);
        Ok(Self {
            referrals: Arc::new(ReferralService::new(storage.clone())),
            accounts: Arc::new(AccountService::new(
                storage.users.clone(),
                storage.services.clone(),
                tokens.clone(),
            )),
            directory: Arc::new(DirectoryService::new(storage.services.clone())),
            identity: Arc::new(IdentityResolver::new(tokens, storage.users)),
            run_mode: cfg.run_mode(),
        })
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        routes::auth::login,
        routes::auth::register,
        routes::auth::list_users,
        routes::auth::update_user,
        routes::auth::deactivate_user,
        routes::auth::reactivate_user,
        routes::auth::change_password,
        routes::referrals::filter_referrals,
        routes::referrals::create_referral,
        routes::referrals::get_referral,
        routes::referrals::update_status,
        routes::referrals::add_note,
        routes::referrals::mark_notifications_read,
        routes::referrals::search_history,
        routes::referrals::sent_referrals,
        routes::referrals::received_referrals,
        routes::referrals::all_referrals,
        routes::services::list_services,
        routes::services::get_service,
        routes::services::search_services,
        routes::services::create_service,
        routes::services::update_service,
        routes::services::delete_service,
    ),
    components(schemas(HealthRes, SuccessBody, ErrorBody)),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Registers the `bearer` security scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Builds the full router: API routes, Swagger UI, the not-found fallback and the error layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/users", get(routes::auth::list_users))
        .route("/auth/users/:id", patch(routes::auth::update_user))
        .route("/auth/users/:id/deactivate", patch(routes::auth::deactivate_user))
        .route("/auth/users/:id/reactivate", patch(routes::auth::reactivate_user))
        .route("/auth/password", put(routes::auth::change_password))
        .route("/referrals", post(routes::referrals::create_referral))
        .route("/referrals/filter", get(routes::referrals::filter_referrals))
        .route("/referrals/admin/all", get(routes::referrals::all_referrals))
        .route(
            "/referrals/sent/:service_id",
            get(routes::referrals::sent_referrals),
        )
        .route(
            "/referrals/received/:service_id",
            get(routes::referrals::received_referrals),
        )
        .route(
            "/referrals/search/history/:mrn",
            get(routes::referrals::search_history),
        )
        .route("/referrals/:id", get(routes::referrals::get_referral))
        .route("/referrals/:id/status", put(routes::referrals::update_status))
        .route("/referrals/:id/notes", post(routes::referrals::add_note))
        .route(
            "/referrals/:id/notifications/read",
            put(routes::referrals::mark_notifications_read),
        )
        .route(
            "/services",
            get(routes::services::list_services).post(routes::services::create_service),
        )
        .route(
            "/services/search/:name",
            get(routes::services::search_services),
        )
        .route(
            "/services/:id",
            get(routes::services::get_service)
                .put(routes::services::update_service)
                .delete(routes::services::delete_service),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(route_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            finish_error_response,
        ))
        .with_state(state)
}

fn no_such_route(method: &Method, path: &str) -> ApiError {
    ApiError(CoreError::NotFound(format!("route {method} {path} not found")))
}

async fn route_not_found(method: Method, uri: Uri) -> ApiError {
    no_such_route(&method, uri.path())
}

/// Gives axum's bare method-not-allowed responses the failure envelope and, in development
/// mode, replaces the public failure body with the one carrying `details`.
async fn finish_error_response(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;

    let detailed = response.extensions().get::<error::DetailedError>().is_some();
    if response.status() == StatusCode::METHOD_NOT_ALLOWED && !detailed {
        response = no_such_route(&method, &path).into_response();
    }

    if state.run_mode != RunMode::Development {
        return response;
    }
    match response.extensions().get::<error::DetailedError>().cloned() {
        Some(detailed) => (response.status(), Json(detailed.0)).into_response(),
        None => response,
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint; used for monitoring and load balancer probes.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(api_shared::HealthService::check_health())
}

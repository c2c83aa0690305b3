//! Request extractors that report failures in the standard error envelope.

use crate::error::{blocking, ApiError};
use crate::AppState;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use referral_core::AuthenticatedPrincipal;

/// JSON body; malformed input becomes `VALIDATION_ERROR`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters; malformed identifiers become `VALIDATION_ERROR`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// The caller, resolved from the `Authorization: Bearer` header.
#[derive(Clone, Debug)]
pub struct Principal(pub AuthenticatedPrincipal);

#[axum::async_trait]
impl FromRequestParts<AppState> for Principal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        let token = api_shared::auth::bearer_token(header).map(str::to_owned);

        let identity = state.identity.clone();
        let principal = blocking(move || identity.resolve(token.as_deref())).await?;
        Ok(Self(principal))
    }
}

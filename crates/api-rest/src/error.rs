//! Mapping from core errors to HTTP responses.

use api_shared::ErrorBody;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use referral_core::{CoreError, CoreResult};

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError(pub CoreError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CoreError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::InvalidTransition { .. } | CoreError::Conflict(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(CoreError::Validation(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self(CoreError::Validation(format!(
            "invalid path parameter: {}",
            rejection.body_text()
        )))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(CoreError::Validation(format!(
            "invalid query string: {}",
            rejection.body_text()
        )))
    }
}

/// Full failure body, including details, attached to every error response as an extension.
///
/// The development-mode layer swaps it in for the public body; in production it is dropped.
#[derive(Clone, Debug)]
pub(crate) struct DetailedError(pub ErrorBody);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.0.is_internal() {
            tracing::error!(error = %self.0, "request failed with internal error");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "request rejected");
        }

        let body = ErrorBody::new(self.0.code(), self.0.public_message());
        let detailed = body.clone().with_details(self.0.to_string());

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(DetailedError(detailed));
        response
    }
}

/// Runs a synchronous core call on the blocking pool.
///
/// Core operations touch the filesystem and hash passwords, so they never run on the async
/// workers directly.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> CoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError(CoreError::Internal(format!("worker task failed: {e}"))))?
        .map_err(ApiError)
}

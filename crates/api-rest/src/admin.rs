//! Admin guard for protected routes.

use crate::error::ApiError;
use crate::AppState;
use api_shared::auth::{validate_admin_headers, PASSWORD_HEADER, USERNAME_HEADER};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

/// Extractor that succeeds only when the `x-username`/`x-password` headers match the
/// configured admin credentials. Handlers take it as an argument to become admin-only.
#[derive(Clone, Copy, Debug)]
pub struct AdminGuard;

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminGuard {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
        };

        validate_admin_headers(
            state.services.config().admin(),
            header(USERNAME_HEADER),
            header(PASSWORD_HEADER),
        )
        .map(|()| AdminGuard)
        .map_err(|reason| {
            tracing::warn!(path = %parts.uri.path(), "Admin check failed: {}", reason);
            ApiError::unauthorized(reason)
        })
    }
}

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderValue;
use tracing::warn;

use super::error::ApiError;
use super::AppContext;

pub const SECRET_HEADER: &str = "x-ultra-secret";

/// Shared-secret check. Passes everything when no secret is configured.
pub fn check_secret(expected: Option<&str>, presented: Option<&HeaderValue>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match presented.and_then(|v| v.to_str().ok()) {
        Some(given) if given == expected => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Extractor proving the request carried the shared secret. List it first
/// in a handler so the check runs before the body is read.
#[derive(Debug, Clone, Copy)]
pub struct Authorized;

#[axum::async_trait]
impl FromRequestParts<AppContext> for Authorized {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, ctx: &AppContext) -> Result<Self, Self::Rejection> {
        check_secret(ctx.settings.app_secret.as_deref(), parts.headers.get(SECRET_HEADER)).map_err(|e| {
            warn!(path = %parts.uri.path(), "rejected request without valid secret");
            e
        })?;
        Ok(Authorized)
    }
}

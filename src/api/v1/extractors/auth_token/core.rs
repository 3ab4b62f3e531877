use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;

use super::Token;

/// Extractor giving handlers the token the gate authorized for this request.
///
/// The keystone middleware inserts `Token` into request extensions on the allow
/// path only. If it is missing the route is not gated, so answer 401 rather
/// than run the handler unauthenticated.
pub struct TokenExtractor(pub Token);

impl<S> FromRequestParts<S> for TokenExtractor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Token>()
            .cloned()
            .map(TokenExtractor)
            .ok_or(AppError::Unauthorized)
    }
}

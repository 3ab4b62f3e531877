//! `X-Auth-Token` gate → `Token` in request extensions
//!
//! - Reads the token from `X-Auth-Token` (no `Authorization: Bearer` fallback).
//! - Delegates the allow/deny decision to `TokenGate` (cache-aside protocol).
//! - Allow: inserts `Token` into extensions and runs the next handler.
//! - Deny: 401 `Not Authorized\n`; downstream handlers never run.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::identity::AUTH_TOKEN_HEADER;
use crate::services::auth::{Decision, TokenGate};

/// Put every route of `router` behind the token gate.
///
/// ```ignore
/// let protected = Router::new().route("/whoami", get(whoami));
/// let protected = middleware::auth::keystone::apply(protected, state.gate.clone());
/// ```
pub fn apply<S>(router: Router<S>, gate: Arc<TokenGate>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // route_layer: unmatched paths stay 404 instead of turning into 401
    router.route_layer(middleware::from_fn_with_state(gate, keystone_middleware))
}

async fn keystone_middleware(
    State(gate): State<Arc<TokenGate>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // Opaque token: any UTF-8 value passes through (obs-text included).
    // Absent, empty or non-UTF-8 => "" => MissingToken
    let raw = req
        .headers()
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
        .unwrap_or_default()
        .to_owned();

    match gate.authorize(&raw).await {
        Decision::Authorized { token, source } => {
            tracing::debug!(token_fp = %token.fingerprint(), ?source, "request authorized");
            // middleware → extractor
            req.extensions_mut().insert(token);
            Ok(next.run(req).await)
        }
        Decision::Unauthorized(_) => Err(AppError::Unauthorized),
    }
}

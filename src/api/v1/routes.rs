/*
 * Responsibility
 * - v1 URL layout
 * - /health is public, everything under `protected` sits behind the token gate
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{health::health, whoami::whoami};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new().route("/whoami", get(whoami));
    let protected = middleware::auth::keystone::apply(protected, state.gate.clone());

    Router::new()
        .route("/health", get(health))
        .merge(protected)
}

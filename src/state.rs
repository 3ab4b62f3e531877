/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Cheap to clone (Arc inside)
 */
use std::sync::Arc;

use crate::services::auth::TokenGate;

#[derive(Clone, Debug)]
pub struct AppState {
    pub gate: Arc<TokenGate>,
}

impl AppState {
    pub fn new(gate: Arc<TokenGate>) -> Self {
        Self { gate }
    }
}

/// Factory: build the `TokenGate` (validator + cache backend) from application `Config`.
use std::sync::Arc;

use crate::config::{CacheBackend, Config};
use crate::error::AppError;
use crate::services::auth::{IdentityValidator, TokenGate};
use crate::services::cache::{CacheClient, MemoryCache, ValkeyClient};

pub async fn build_token_gate(config: &Config) -> Result<Arc<TokenGate>, AppError> {
    let validator = IdentityValidator::new(
        &config.auth_url,
        config.auth_connect_timeout,
        config.auth_request_timeout,
    )
    .map_err(|err| {
        tracing::error!(error = %err, "failed to build identity validator");
        AppError::Internal
    })?;

    let cache: Arc<dyn CacheClient> = match config.cache_backend {
        CacheBackend::Valkey => {
            // Connects on first use: a cache down at boot only means re-validating.
            let client = ValkeyClient::from_settings(&config.cache).map_err(|err| {
                tracing::error!(
                    error = %err,
                    host = %config.cache.host,
                    port = config.cache.port,
                    "invalid cache settings"
                );
                AppError::Internal
            })?;
            Arc::new(client)
        }
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
    };

    tracing::info!(
        authority = %validator.base_url(),
        cache = cache.backend_name(),
        token_ttl_secs = config.gate.token_ttl.as_secs(),
        on_authority_failure = ?config.gate.on_authority_failure,
        "token gate configured"
    );

    Ok(Arc::new(TokenGate::new(
        Arc::new(validator),
        cache,
        config.gate,
    )))
}

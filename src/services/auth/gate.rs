//! Cache-aside authorization for opaque tokens.
//!
//! ```text
//! token == ""            -> deny (MissingToken), no backend calls
//! cache hit              -> allow, no validation, no cache write
//! cache miss / failure   -> validate
//!   valid                -> cache.set(token, "authorized", ttl) best-effort -> allow
//!   invalid              -> deny (InvalidToken), no cache write
//!   authority error      -> AuthorityFailurePolicy decides
//! ```
//!
//! The gate keeps no mutable state. Concurrent requests for the same token may
//! both validate and both write; validation is idempotent and the writes are
//! identical overwrites.
use std::{fmt, str::FromStr, sync::Arc, time::Duration};
use thiserror::Error;

use crate::services::auth::token::Token;
use crate::services::auth::validator::TokenValidator;
use crate::services::cache::{CacheClient, CacheError};

/// Value stored for a token the authority accepted.
pub const AUTHORIZED_MARKER: &str = "authorized";

/// Default TTL for a positive cache entry (10 minutes).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(600);

/// Default deadline for a single cache call.
pub const DEFAULT_CACHE_TIMEOUT: Duration = Duration::from_millis(500);

/// What to do when the authority cannot be consulted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorityFailurePolicy {
    /// Deny the request. Authority downtime denies all uncached tokens.
    #[default]
    FailClosed,
    /// Let the request through without caching it.
    FailOpen,
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("unknown authority failure policy: {0}")]
pub struct UnknownPolicy(String);

impl FromStr for AuthorityFailurePolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail_closed" | "closed" => Ok(Self::FailClosed),
            "fail_open" | "open" => Ok(Self::FailOpen),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Tuning knobs of the gate.
#[derive(Debug, Clone, Copy)]
pub struct GatePolicy {
    pub token_ttl: Duration,
    pub cache_timeout: Duration,
    pub on_authority_failure: AuthorityFailurePolicy,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            token_ttl: DEFAULT_TOKEN_TTL,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            on_authority_failure: AuthorityFailurePolicy::FailClosed,
        }
    }
}

/// Where an allow decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    Cache,
    Authority,
    FailOpen,
}

/// Why a request was denied. Internal only: every reason maps to the same 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingToken,
    InvalidToken,
    AuthorityUnreachable,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidToken => "invalid_token",
            Self::AuthorityUnreachable => "authority_unreachable",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Authorized { token: Token, source: AuthSource },
    Unauthorized(DenyReason),
}

impl Decision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }
}

pub struct TokenGate {
    validator: Arc<dyn TokenValidator>,
    cache: Arc<dyn CacheClient>,
    policy: GatePolicy,
}

impl fmt::Debug for TokenGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGate")
            .field("authority", &self.validator.authority_name())
            .field("cache", &self.cache.backend_name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl TokenGate {
    pub fn new(
        validator: Arc<dyn TokenValidator>,
        cache: Arc<dyn CacheClient>,
        policy: GatePolicy,
    ) -> Self {
        Self {
            validator,
            cache,
            policy,
        }
    }

    /// Decide whether `raw` is an authorized token.
    ///
    /// Never fails: cache trouble degrades to re-validation and authority
    /// trouble is resolved by `AuthorityFailurePolicy`.
    pub async fn authorize(&self, raw: &str) -> Decision {
        if raw.is_empty() {
            tracing::warn!(reason = %DenyReason::MissingToken, "request denied");
            return Decision::Unauthorized(DenyReason::MissingToken);
        }

        let token = Token::new(raw);
        let token_fp = token.fingerprint();

        match self.cache_get(raw).await {
            Ok(Some(_)) => {
                tracing::debug!(token_fp = %token_fp, backend = self.cache.backend_name(), "token cache hit");
                return Decision::Authorized {
                    token,
                    source: AuthSource::Cache,
                };
            }
            Ok(None) => {
                tracing::debug!(token_fp = %token_fp, "token cache miss");
            }
            Err(err) => {
                // An outage must never deny by itself; fall through to the authority.
                tracing::warn!(
                    error = %err,
                    backend = self.cache.backend_name(),
                    token_fp = %token_fp,
                    "token cache read failed, re-validating"
                );
            }
        }

        match self.validator.validate(raw).await {
            Ok(true) => {
                tracing::debug!(token_fp = %token_fp, authority = self.validator.authority_name(), "token validated");
                if let Err(err) = self.cache_set(raw).await {
                    tracing::warn!(
                        error = %err,
                        backend = self.cache.backend_name(),
                        token_fp = %token_fp,
                        "token cache write failed"
                    );
                }
                Decision::Authorized {
                    token,
                    source: AuthSource::Authority,
                }
            }
            Ok(false) => {
                tracing::warn!(reason = %DenyReason::InvalidToken, token_fp = %token_fp, "request denied");
                Decision::Unauthorized(DenyReason::InvalidToken)
            }
            Err(err) => match self.policy.on_authority_failure {
                AuthorityFailurePolicy::FailClosed => {
                    tracing::warn!(
                        error = %err,
                        reason = %DenyReason::AuthorityUnreachable,
                        authority = self.validator.authority_name(),
                        token_fp = %token_fp,
                        "request denied"
                    );
                    Decision::Unauthorized(DenyReason::AuthorityUnreachable)
                }
                AuthorityFailurePolicy::FailOpen => {
                    tracing::warn!(
                        error = %err,
                        authority = self.validator.authority_name(),
                        token_fp = %token_fp,
                        "identity authority unreachable, admitting request (fail-open)"
                    );
                    Decision::Authorized {
                        token,
                        source: AuthSource::FailOpen,
                    }
                }
            },
        }
    }

    async fn cache_get(&self, key: &str) -> Result<Option<String>, CacheError> {
        tokio::time::timeout(self.policy.cache_timeout, self.cache.get_string(key))
            .await
            .map_err(|_| CacheError::BackendCommand("GET timed out".into()))?
    }

    async fn cache_set(&self, key: &str) -> Result<(), CacheError> {
        tokio::time::timeout(
            self.policy.cache_timeout,
            self.cache
                .set_with_ttl(key, AUTHORIZED_MARKER, self.policy.token_ttl),
        )
        .await
        .map_err(|_| CacheError::BackendCommand("SET timed out".into()))?
    }
}

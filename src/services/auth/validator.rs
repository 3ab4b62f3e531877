use async_trait::async_trait;
use thiserror::Error;

/// Errors from consulting the identity authority.
///
/// A rejected token is NOT an error: `validate` returns `Ok(false)` for that.
/// This type only covers "we could not get an answer".
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("identity authority unreachable: {0}")]
    Unreachable(String),
}

/// Asks a remote identity authority whether an opaque token is valid right now.
///
/// - Exactly one authority call per `validate` invocation.
/// - No caching here; that is the gate's job.
/// - `Ok(false)` => token rejected, `Err(_)` => authority could not be consulted.
#[async_trait]
pub trait TokenValidator: Send + Sync + 'static {
    // Returns the authority name (for logging).
    fn authority_name(&self) -> &'static str;

    async fn validate(&self, token: &str) -> Result<bool, ValidateError>;
}

use async_trait::async_trait;
use std::{sync::Arc, time::Duration};
use tokio::sync::OnceCell;
use url::Url;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult};

/// Valkey/Redis-backend cache client.
///
/// Only the commands the gate needs are implemented: GET and SET EX.
///
/// The connection is opened lazily on first use, so an unreachable cache at
/// boot does not stop the service: calls fail with `BackendConnection` (which
/// the gate treats as a miss) and the next call tries again. Once up, the
/// connection manager multiplexes over one connection and reconnects on its own.
#[derive(Clone)]
pub struct ValkeyClient {
    client: redis::Client,
    manager: Arc<OnceCell<redis::aio::ConnectionManager>>,
}

/// Connection settings for a Valkey/Redis instance.
#[derive(Clone, Debug)]
pub struct ValkeySettings {
    pub host: String,
    pub port: u16,
    pub password: Option<String>,
    pub database: i64,
}

impl ValkeySettings {
    /// Render `redis://[:password@]host:port/db`.
    ///
    /// The password is percent-encoded by `Url`, so any character is allowed.
    pub fn to_url(&self) -> Result<String, CacheError> {
        let mut url = Url::parse(&format!("redis://{}:{}", self.host, self.port))
            .map_err(|e| CacheError::BackendConnection(format!("invalid cache address: {e}")))?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            url.set_password(Some(password))
                .map_err(|_| CacheError::BackendConnection("invalid cache password".into()))?;
        }

        url.set_path(&format!("/{}", self.database));
        Ok(url.into())
    }
}

impl ValkeyClient {
    // Create a Valkey client from a URL like `redis://localhost:6379/0`.
    // Only the URL is checked here; no connection is made.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        Ok(Self {
            client,
            manager: Arc::new(OnceCell::new()),
        })
    }

    // Create a Valkey client from host/port/password/db.
    pub fn from_settings(settings: &ValkeySettings) -> Result<Self, CacheError> {
        let url = settings.to_url()?;
        Self::new(&url)
    }

    async fn conn(&self) -> CacheResult<redis::aio::ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let manager = self.client.get_connection_manager().await?;
                tracing::info!("cache connection established");
                Ok::<_, redis::RedisError>(manager)
            })
            .await
            .map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        Ok(manager.clone())
    }
}

#[async_trait]
impl CacheClient for ValkeyClient {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.conn().await?;

        // Nil reply maps to None (missing or expired).
        let resp: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        Ok(resp)
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        // Redis/Valkey: `SET key value EX <seconds>`
        let mut conn = self.conn().await?;

        // EX expects integer seconds. We clamp to at least 1 sec.
        let ttl_seconds: u64 = ttl.as_secs().max(1);

        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::TokenGate;
    use crate::services::auth::gate::tests::{Answer, FakeValidator};
    use crate::services::auth::gate::{AuthSource, Decision, GatePolicy};

    fn settings(password: Option<&str>, database: i64) -> ValkeySettings {
        ValkeySettings {
            host: "cache.internal".to_string(),
            port: 6380,
            password: password.map(str::to_string),
            database,
        }
    }

    #[test]
    fn url_without_password() {
        let url = settings(None, 0).to_url().unwrap();
        assert_eq!(url, "redis://cache.internal:6380/0");
    }

    #[test]
    fn url_with_password_and_db() {
        let url = settings(Some("s3cret"), 4).to_url().unwrap();
        assert_eq!(url, "redis://:s3cret@cache.internal:6380/4");
    }

    #[test]
    fn empty_password_is_omitted() {
        let url = settings(Some(""), 1).to_url().unwrap();
        assert_eq!(url, "redis://cache.internal:6380/1");
    }

    #[test]
    fn password_is_percent_encoded() {
        let url = settings(Some("p@ss/word"), 2).to_url().unwrap();
        assert_eq!(url, "redis://:p%40ss%2Fword@cache.internal:6380/2");
    }

    async fn closed_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    fn unreachable(port: u16) -> ValkeySettings {
        ValkeySettings {
            host: "127.0.0.1".to_string(),
            port,
            password: None,
            database: 0,
        }
    }

    #[tokio::test]
    async fn building_client_does_not_need_a_running_cache() {
        let client = ValkeyClient::from_settings(&unreachable(closed_port().await));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn unreachable_cache_reports_backend_error_on_use() {
        let client = ValkeyClient::from_settings(&unreachable(closed_port().await)).unwrap();

        let res = tokio::time::timeout(Duration::from_secs(10), client.get_string("tok")).await;

        // Either refused outright or still retrying; never a silent miss.
        if let Ok(res) = res {
            assert!(matches!(res, Err(CacheError::BackendConnection(_))));
        }
    }

    #[tokio::test]
    async fn gate_over_unreachable_cache_still_authorizes_via_validator() {
        let client = ValkeyClient::from_settings(&unreachable(closed_port().await)).unwrap();
        let validator = FakeValidator::new(Answer::Valid);
        let gate = TokenGate::new(validator.clone(), Arc::new(client), GatePolicy::default());

        let decision = gate.authorize("tok2").await;

        assert_eq!(
            decision,
            Decision::Authorized {
                token: crate::services::auth::Token::new("tok2"),
                source: AuthSource::Authority
            }
        );
        assert_eq!(validator.call_count(), 1);
    }
}

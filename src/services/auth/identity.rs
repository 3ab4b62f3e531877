//! Identity-authority backed token validator.
//!
//! The authority is asked with a single `GET <base_url>` carrying the token in
//! `X-Auth-Token`. Exactly `200 OK` means valid; any other status means invalid.
//! Transport failures (connect, timeout, reset) are surfaced as
//! `ValidateError::Unreachable` so the gate can apply its failure policy.
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::HeaderValue};
use std::time::Duration;

use crate::services::auth::validator::{TokenValidator, ValidateError};

/// Header carrying the token, both inbound and towards the authority.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

#[derive(Clone, Debug)]
pub struct IdentityValidator {
    // Authority URL (no trailing slash).
    base_url: String,
    client: Client,
}

impl IdentityValidator {
    pub fn new(
        base_url: &str,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ValidateError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| ValidateError::Unreachable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TokenValidator for IdentityValidator {
    fn authority_name(&self) -> &'static str {
        "identity"
    }

    async fn validate(&self, token: &str) -> Result<bool, ValidateError> {
        // A token that can't be sent as a header value can never be accepted.
        let Ok(value) = HeaderValue::from_str(token) else {
            return Ok(false);
        };

        let response = self
            .client
            .get(&self.base_url)
            .header(AUTH_TOKEN_HEADER, value)
            .send()
            .await
            .map_err(|e| ValidateError::Unreachable(e.to_string()))?;

        Ok(response.status() == StatusCode::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, extract::State, http::HeaderMap, routing::get};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::sync::oneshot;

    struct AuthorityState {
        valid_token: &'static str,
        rejected_status: axum::http::StatusCode,
        calls: AtomicUsize,
    }

    async fn authority_handler(
        State(state): State<Arc<AuthorityState>>,
        headers: HeaderMap,
    ) -> axum::http::StatusCode {
        state.calls.fetch_add(1, Ordering::SeqCst);
        let token = headers.get(AUTH_TOKEN_HEADER).and_then(|v| v.to_str().ok());
        if token == Some(state.valid_token) {
            axum::http::StatusCode::OK
        } else {
            state.rejected_status
        }
    }

    async fn spawn_authority(
        rejected_status: axum::http::StatusCode,
    ) -> (String, Arc<AuthorityState>, oneshot::Sender<()>) {
        let state = Arc::new(AuthorityState {
            valid_token: "good-token",
            rejected_status,
            calls: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/v3/auth", get(authority_handler))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });
        (format!("http://{addr}/v3/auth"), state, shutdown_tx)
    }

    fn validator(base_url: &str) -> IdentityValidator {
        IdentityValidator::new(
            base_url,
            Duration::from_millis(250),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    #[test]
    fn base_url_trimmed_on_construction() {
        let v = validator("http://identity.local/v3/auth/");
        assert_eq!(v.base_url(), "http://identity.local/v3/auth");
    }

    #[tokio::test]
    async fn status_200_means_valid() {
        let (url, state, shutdown) = spawn_authority(axum::http::StatusCode::UNAUTHORIZED).await;
        let v = validator(&url);

        assert!(v.validate("good-token").await.unwrap());
        assert_eq!(state.calls.load(Ordering::SeqCst), 1);
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn non_200_statuses_mean_invalid() {
        for status in [
            axum::http::StatusCode::UNAUTHORIZED,
            axum::http::StatusCode::FORBIDDEN,
            axum::http::StatusCode::NOT_FOUND,
            axum::http::StatusCode::NO_CONTENT,
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let (url, _state, shutdown) = spawn_authority(status).await;
            let v = validator(&url);
            assert!(
                !v.validate("bad-token").await.unwrap(),
                "status {status} must be treated as invalid"
            );
            let _ = shutdown.send(());
        }
    }

    #[tokio::test]
    async fn unencodable_token_is_invalid_without_calling_authority() {
        let (url, state, shutdown) = spawn_authority(axum::http::StatusCode::UNAUTHORIZED).await;
        let v = validator(&url);

        assert!(!v.validate("bad\ntoken").await.unwrap());
        assert_eq!(state.calls.load(Ordering::SeqCst), 0);
        let _ = shutdown.send(());
    }

    #[tokio::test]
    async fn unreachable_authority_is_an_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let v = validator(&format!("http://{addr}/v3/auth"));
        let err = v.validate("good-token").await.unwrap_err();
        assert!(matches!(err, ValidateError::Unreachable(_)));
    }
}

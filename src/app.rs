/*
 * Responsibility
 * - Load Config → build the token gate → assemble the Router
 * - Apply HTTP-level middleware
 * - Start axum::serve()
 */
use anyhow::Result;
use axum::Router;
use std::{panic, process};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{api, config::Config, middleware, services::auth::build_token_gate, state::AppState};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,keystone_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting keystone gate in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let gate = build_token_gate(&config).await?;
    let state = AppState::new(gate);
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state);

    middleware::http::apply(router, config.request_timeout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::TokenGate;
    use crate::services::auth::gate::tests::{Answer, FakeCache, FakeValidator};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_router(answer: Answer) -> (Router, Arc<FakeValidator>) {
        let config = Config::from_lookup(|key| match key {
            "AUTH_URL" => Some("http://identity.local".to_string()),
            _ => None,
        })
        .unwrap();
        let validator = FakeValidator::new(answer);
        let gate = Arc::new(TokenGate::new(
            validator.clone(),
            Arc::new(FakeCache::default()),
            config.gate,
        ));
        (build_router(AppState::new(gate), &config), validator)
    }

    async fn get(router: Router, uri: &str, token: Option<&str>) -> (StatusCode, String) {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("X-Auth-Token", token);
        }
        let res = router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn health_is_public() {
        let (router, validator) = test_router(Answer::Invalid);

        let (status, body) = get(router, "/api/v1/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("ok"));
        assert_eq!(validator.call_count(), 0);
    }

    #[tokio::test]
    async fn whoami_requires_token() {
        let (router, _) = test_router(Answer::Valid);

        let (status, body) = get(router, "/api/v1/whoami", None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, "Not Authorized\n");
    }

    #[tokio::test]
    async fn whoami_echoes_authorized_token() {
        let (router, validator) = test_router(Answer::Valid);

        let (status, body) = get(router, "/api/v1/whoami", Some("tok2")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "tok2");
        assert_eq!(validator.call_count(), 1);
    }
}

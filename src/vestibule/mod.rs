use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, task::JoinHandle};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, info, info_span, Span};
use ulid::Ulid;

pub mod auth;
pub mod handlers;

use self::auth::AuthState;

/// Build the application router around a shared auth state.
#[must_use]
pub fn router(auth_state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/login", get(handlers::login_form).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/profile", get(handlers::profile))
        .route("/error", get(handlers::error_page))
        .route("/health", get(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(auth_state)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, auth_state: Arc<AuthState>) -> Result<()> {
    let purge = spawn_session_purge(auth_state.clone());

    let app = router(auth_state);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
                return;
            }
            info!("Gracefully shutdown");
        })
        .await?;

    purge.abort();

    Ok(())
}

/// Periodically evict expired sessions so idle browsers do not pile up.
fn spawn_session_purge(auth_state: Arc<AuthState>) -> JoinHandle<()> {
    let period = auth_state.config().session_purge_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = auth_state.machine().store().purge_expired();
            if purged > 0 {
                debug!("Purged {purged} expired sessions");
            }
        }
    })
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vestibule::auth::{AuthConfig, StaticCredentialVerifier};
    use std::time::Duration;

    #[tokio::test]
    async fn purge_task_evicts_expired_sessions() -> Result<()> {
        let config = AuthConfig::new()
            .with_session_ttl_seconds(0)
            .with_session_purge_interval_seconds(1);
        let state = Arc::new(AuthState::in_memory(
            config,
            Arc::new(StaticCredentialVerifier::new()?),
        ));
        state.machine().home(None).await?;

        // The ttl clamps to one second; the second tick sees it expired.
        let purge = spawn_session_purge(state.clone());
        tokio::time::sleep(Duration::from_millis(2500)).await;
        purge.abort();

        assert_eq!(state.machine().store().purge_expired(), 0);
        Ok(())
    }
}

//! GET handlers for the home, profile, error and logout routes.

use axum::{extract::Extension, http::HeaderMap, response::Response};
use std::sync::Arc;
use tracing::instrument;

use super::session::{extract_session_id, respond};
use crate::vestibule::auth::AuthState;

#[instrument(skip_all)]
pub async fn home(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let presented = extract_session_id(&headers);
    let result = auth_state.machine().home(presented.as_deref()).await;
    respond(&auth_state, presented.as_deref(), result)
}

#[instrument(skip_all)]
pub async fn profile(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let presented = extract_session_id(&headers);
    let result = auth_state.machine().profile(presented.as_deref()).await;
    respond(&auth_state, presented.as_deref(), result)
}

#[instrument(skip_all)]
pub async fn error_page(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let presented = extract_session_id(&headers);
    let result = auth_state.machine().error_page(presented.as_deref()).await;
    respond(&auth_state, presented.as_deref(), result)
}

/// Destroys whatever session the cookie names; the response always carries
/// the cookie of the replacement session.
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let presented = extract_session_id(&headers);
    let result = auth_state.machine().logout(presented.as_deref()).await;
    respond(&auth_state, presented.as_deref(), result)
}

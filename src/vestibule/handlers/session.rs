//! Session cookie handling and the shared transition-to-response mapping.

use axum::{
    http::{
        header::{InvalidHeaderValue, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use super::views;
use crate::vestibule::auth::{AuthConfig, AuthError, AuthState, SessionId, Transition};

pub(crate) const SESSION_COOKIE_NAME: &str = "vestibule_session";

/// Build an `HttpOnly` cookie binding the browser to `session_id`.
pub(crate) fn session_cookie(
    config: &AuthConfig,
    session_id: &SessionId,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let ttl_seconds = config.session_ttl_seconds();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={ttl_seconds}",
        session_id.as_str()
    );
    if config.secure_cookies() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Session id presented by the browser, if any.
pub(crate) fn extract_session_id(headers: &HeaderMap) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next().map(str::trim);
            let val = parts.next().map(str::trim);
            if let (Some(SESSION_COOKIE_NAME), Some(val)) = (key, val) {
                if !val.is_empty() {
                    return Some(val.to_string());
                }
            }
        }
    }
    None
}

/// Render a transition; a new cookie is only sent when the live session id
/// differs from the one the browser presented.
pub(super) fn respond(
    auth_state: &AuthState,
    presented: Option<&str>,
    result: Result<Transition, AuthError>,
) -> Response {
    let transition = match result {
        Ok(transition) => transition,
        Err(err) => {
            error!("Auth request failed: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(views::server_error()),
            )
                .into_response();
        }
    };

    let mut headers = HeaderMap::new();
    if presented != Some(transition.session_id.as_str()) {
        match session_cookie(auth_state.config(), &transition.session_id) {
            Ok(cookie) => {
                headers.insert(SET_COOKIE, cookie);
            }
            Err(err) => error!("Failed to build session cookie: {err}"),
        }
    }
    if let Some(location) = transition.location() {
        headers.insert(LOCATION, HeaderValue::from_static(location));
    }

    let body = views::render(&transition.reply);
    (transition.status(), headers, Html(body)).into_response()
}

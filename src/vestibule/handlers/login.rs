//! Login form rendering and submission.

use axum::{
    async_trait,
    extract::{Extension, Form, FromRequest, Request},
    http::{header::CONTENT_TYPE, HeaderMap},
    response::Response,
    Json,
};
use secrecy::SecretString;
use serde::Deserialize;
use std::{convert::Infallible, sync::Arc};
use tracing::{debug, instrument};

use super::session::{extract_session_id, respond};
use crate::vestibule::auth::{AuthState, LoginSubmission};

/// Raw login fields. The token may arrive as `_csrf` or `csrf`.
#[derive(Deserialize, Default)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(rename = "_csrf", default)]
    underscore_csrf: Option<String>,
    #[serde(default)]
    csrf: Option<String>,
}

impl LoginForm {
    /// Collapse both token field names into one; `_csrf` wins when both are sent.
    fn into_submission(self) -> LoginSubmission {
        LoginSubmission {
            csrf: self.underscore_csrf.or(self.csrf),
            username: self.username,
            password: SecretString::from(self.password),
        }
    }
}

/// Accepts urlencoded and JSON bodies. An unreadable body is treated as an
/// empty form, which the state machine rejects as a missing token.
pub struct LoginPayload(pub LoginForm);

#[async_trait]
impl<S> FromRequest<S> for LoginPayload
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("application/json"));

        let form = if is_json {
            match Json::<LoginForm>::from_request(req, state).await {
                Ok(Json(form)) => form,
                Err(rejection) => {
                    debug!("Unreadable JSON login body: {rejection}");
                    LoginForm::default()
                }
            }
        } else {
            match Form::<LoginForm>::from_request(req, state).await {
                Ok(Form(form)) => form,
                Err(rejection) => {
                    debug!("Unreadable login form body: {rejection}");
                    LoginForm::default()
                }
            }
        };

        Ok(Self(form))
    }
}

#[instrument(skip_all)]
pub async fn login_form(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> Response {
    let presented = extract_session_id(&headers);
    let result = auth_state.machine().login_form(presented.as_deref()).await;
    respond(&auth_state, presented.as_deref(), result)
}

#[instrument(skip_all)]
pub async fn login(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
    LoginPayload(form): LoginPayload,
) -> Response {
    let presented = extract_session_id(&headers);
    let result = auth_state
        .machine()
        .login(presented.as_deref(), form.into_submission())
        .await;
    respond(&auth_state, presented.as_deref(), result)
}

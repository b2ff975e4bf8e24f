//! Request-level state machine: session state in, page/redirect/status out.

use axum::http::StatusCode;
use secrecy::SecretString;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{
    error::AuthError,
    session::{Session, SessionId, SessionState, SessionStore},
    token::{CsrfToken, TokenService},
    verifier::{CredentialVerifier, VerifyError},
};

pub const HOME_PATH: &str = "/";
pub const LOGIN_PATH: &str = "/login";
pub const PROFILE_PATH: &str = "/profile";
pub const ERROR_PATH: &str = "/error";

/// Outcome of a login submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthResult {
    Success(Uuid),
    InvalidCsrf,
    MissingCsrf,
    BadCredentials,
}

/// Page the router should render.
#[derive(Debug)]
pub enum View {
    Home,
    Login { csrf: CsrfToken },
    Profile { user_id: Uuid },
    Error,
}

#[derive(Debug)]
pub enum Reply {
    Render(View),
    Redirect(&'static str),
    Forbidden,
}

/// What a request resolved to, plus the session id the client should hold next.
#[derive(Debug)]
pub struct Transition {
    pub session_id: SessionId,
    pub reply: Reply,
    pub auth: Option<AuthResult>,
}

impl Transition {
    fn new(session_id: SessionId, reply: Reply) -> Self {
        Self {
            session_id,
            reply,
            auth: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.reply {
            Reply::Render(_) => StatusCode::OK,
            Reply::Redirect(_) => StatusCode::FOUND,
            Reply::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&'static str> {
        match self.reply {
            Reply::Redirect(location) => Some(location),
            Reply::Render(_) | Reply::Forbidden => None,
        }
    }
}

/// Login form fields after the router has normalized the token field name.
pub struct LoginSubmission {
    pub csrf: Option<String>,
    pub username: String,
    pub password: SecretString,
}

pub struct AuthMachine {
    store: Arc<dyn SessionStore>,
    tokens: TokenService,
    verifier: Arc<dyn CredentialVerifier>,
}

impl AuthMachine {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self {
            store,
            tokens: TokenService::new(),
            verifier,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn SessionStore {
        self.store.as_ref()
    }

    /// Resolve and lock the caller's session.
    ///
    /// A session destroyed while we waited for its lock is followed to the
    /// session that replaced it.
    async fn acquire(&self, session_id: Option<&str>) -> Result<OwnedMutexGuard<Session>, AuthError> {
        let mut handle = self.store.get_or_create(session_id)?;
        loop {
            let session = handle.lock().await;
            if !session.is_revoked() {
                return Ok(session);
            }
            let successor = session.successor().cloned();
            drop(session);
            handle = self
                .store
                .get_or_create(successor.as_ref().map(SessionId::as_str))?;
        }
    }

    /// `GET /`
    ///
    /// # Errors
    /// Returns an error if a session cannot be created.
    pub async fn home(&self, session_id: Option<&str>) -> Result<Transition, AuthError> {
        let session = self.acquire(session_id).await?;
        let reply = match session.state() {
            SessionState::Authenticated(_) => Reply::Redirect(PROFILE_PATH),
            SessionState::Anonymous => Reply::Render(View::Home),
        };
        Ok(Transition::new(session.id().clone(), reply))
    }

    /// `GET /login`: every render issues a fresh token and retires the previous one.
    ///
    /// # Errors
    /// Returns an error if a session or token cannot be generated.
    pub async fn login_form(&self, session_id: Option<&str>) -> Result<Transition, AuthError> {
        let mut session = self.acquire(session_id).await?;
        if let SessionState::Authenticated(_) = session.state() {
            return Ok(Transition::new(
                session.id().clone(),
                Reply::Redirect(PROFILE_PATH),
            ));
        }
        let csrf = self.tokens.issue(&mut session)?;
        Ok(Transition::new(
            session.id().clone(),
            Reply::Render(View::Login { csrf }),
        ))
    }

    /// `POST /login`
    ///
    /// # Errors
    /// Returns `VerifierUnavailable` if the credential verifier fails; the
    /// session and its token are left untouched in that case.
    pub async fn login(
        &self,
        session_id: Option<&str>,
        submission: LoginSubmission,
    ) -> Result<Transition, AuthError> {
        let mut session = self.acquire(session_id).await?;
        let result = self.authenticate(&mut session, submission).await?;

        let reply = match result {
            AuthResult::Success(_) => Reply::Redirect(PROFILE_PATH),
            AuthResult::BadCredentials => Reply::Redirect(ERROR_PATH),
            AuthResult::MissingCsrf | AuthResult::InvalidCsrf => Reply::Forbidden,
        };
        Ok(Transition {
            session_id: session.id().clone(),
            reply,
            auth: Some(result),
        })
    }

    async fn authenticate(
        &self,
        session: &mut Session,
        submission: LoginSubmission,
    ) -> Result<AuthResult, AuthError> {
        // CSRF is settled before the verifier ever sees the credentials.
        let Some(csrf) = submission.csrf else {
            warn!("login rejected: missing CSRF token");
            return Ok(AuthResult::MissingCsrf);
        };
        if !self.tokens.validate(session, Some(&csrf)) {
            warn!("login rejected: invalid CSRF token");
            return Ok(AuthResult::InvalidCsrf);
        }

        let verdict = self
            .verifier
            .verify(&submission.username, &submission.password)
            .await;

        match verdict {
            Ok(user_id) => {
                self.tokens.consume(session);
                self.store.set_authenticated(session, user_id);
                debug!("login succeeded for user {user_id}");
                Ok(AuthResult::Success(user_id))
            }
            Err(VerifyError::InvalidCredentials) => {
                self.tokens.consume(session);
                debug!("login failed: bad credentials");
                Ok(AuthResult::BadCredentials)
            }
            Err(VerifyError::Unavailable(reason)) => {
                error!("credential verifier unavailable: {reason}");
                Err(AuthError::VerifierUnavailable(reason))
            }
        }
    }

    /// `GET /profile`
    ///
    /// # Errors
    /// Returns an error if a session cannot be created.
    pub async fn profile(&self, session_id: Option<&str>) -> Result<Transition, AuthError> {
        let session = self.acquire(session_id).await?;
        let reply = match session.state() {
            SessionState::Authenticated(user_id) => Reply::Render(View::Profile { user_id }),
            SessionState::Anonymous => Reply::Redirect(LOGIN_PATH),
        };
        Ok(Transition::new(session.id().clone(), reply))
    }

    /// `GET /error`
    ///
    /// # Errors
    /// Returns an error if a session cannot be created.
    pub async fn error_page(&self, session_id: Option<&str>) -> Result<Transition, AuthError> {
        let session = self.acquire(session_id).await?;
        Ok(Transition::new(
            session.id().clone(),
            Reply::Render(View::Error),
        ))
    }

    /// `GET /logout`: always ends on a fresh anonymous session.
    ///
    /// # Errors
    /// Returns an error if the replacement session cannot be created.
    pub async fn logout(&self, session_id: Option<&str>) -> Result<Transition, AuthError> {
        let mut session = self.acquire(session_id).await?;
        let fresh = self.store.destroy(&mut session)?;
        debug!("session {:?} destroyed", session.id());
        Ok(Transition::new(fresh.id().clone(), Reply::Redirect(HOME_PATH)))
    }
}

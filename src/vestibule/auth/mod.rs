//! Authentication core: sessions, CSRF tokens, credential verification and the
//! state machine that ties them together.
//!
//! ## Request Flow
//!
//! Every request resolves its session cookie through the [`SessionStore`] and
//! holds that session's lock until a [`Transition`] is produced. A login
//! submission is checked in a fixed order:
//!
//! 1. CSRF token present, otherwise `MissingCsrf` (403).
//! 2. CSRF token bound to this session, otherwise `InvalidCsrf` (403).
//! 3. Credentials, via the injected [`CredentialVerifier`].
//!
//! The token is consumed once step 3 produces an answer, whatever that answer
//! is. A verifier outage leaves the session untouched.

mod error;
mod machine;
mod session;
mod state;
mod token;
mod utils;
mod verifier;

pub use error::AuthError;
pub use machine::{AuthMachine, AuthResult, LoginSubmission, Reply, Transition, View};
pub use session::{MemorySessionStore, Session, SessionHandle, SessionId, SessionState, SessionStore};
pub use state::{AuthConfig, AuthState, MAX_SESSION_TTL_SECONDS};
pub use token::{CsrfToken, TokenService};
pub use verifier::{CredentialVerifier, StaticCredentialVerifier, VerifyError};

//! CSRF token issuance and validation.
//!
//! The raw token only ever leaves the server inside the rendered login form.
//! The session keeps a SHA-256 digest over its own id and the token, so a
//! token copied into another session's submission hashes to a different value
//! and fails, even when the strings are identical.

use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

use super::{
    error::AuthError,
    session::{Session, SessionId},
    utils::random_token,
};

/// Token embedded in the login form as the `_csrf` field.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

/// Session-bound digest of an issued token.
pub(super) struct TokenDigest([u8; 32]);

impl TokenDigest {
    pub(super) fn new(session_id: &SessionId, token: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(session_id.as_str().as_bytes());
        // Separator: ids and tokens are base64url, which never contains NUL.
        hasher.update([0u8]);
        hasher.update(token.as_bytes());
        Self(hasher.finalize().into())
    }

    fn matches(&self, other: &Self) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

impl fmt::Debug for TokenDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenDigest(..)")
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokenService;

impl TokenService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Mint a token for `session`, replacing whatever token it held before.
    ///
    /// # Errors
    /// Returns an error if the OS RNG fails.
    pub fn issue(&self, session: &mut Session) -> Result<CsrfToken, AuthError> {
        let token = random_token()?;
        let digest = TokenDigest::new(session.id(), &token);
        session.set_csrf(digest);
        Ok(CsrfToken(token))
    }

    /// True iff `presented` is non-empty and is the current token of this live session.
    #[must_use]
    pub fn validate(&self, session: &Session, presented: Option<&str>) -> bool {
        let Some(presented) = presented.filter(|token| !token.is_empty()) else {
            return false;
        };
        if session.is_revoked() {
            return false;
        }
        let Some(expected) = session.csrf() else {
            return false;
        };
        expected.matches(&TokenDigest::new(session.id(), presented))
    }

    /// Drop the session's current token so it cannot be submitted again.
    pub fn consume(&self, session: &mut Session) {
        session.clear_csrf();
    }
}

//! Session records and the store that owns them.
//!
//! Flow Overview:
//! - The store hands out a [`SessionHandle`] per live session id.
//! - Callers lock the handle for the duration of one request, which serializes
//!   token issuance and state transitions for that session.
//! - `destroy` revokes the record in place, so a request still holding the old
//!   handle can no longer validate a token against it.
//!
//! Expired sessions are dropped on lookup and by `purge_expired`; the caller
//! then receives a fresh anonymous session exactly as if the id were unknown.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
    time::{Duration, Instant},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::{
    error::AuthError, state::MAX_SESSION_TTL_SECONDS, token::TokenDigest, utils::random_token,
};

/// Opaque session identifier carried in the session cookie.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// # Errors
    /// Returns an error if the OS RNG fails.
    pub fn generate() -> Result<Self, AuthError> {
        Ok(Self(random_token()?))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// The id is a bearer credential; keep it out of logs.
impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionId({prefix}..)")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated(Uuid),
}

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    state: SessionState,
    csrf: Option<TokenDigest>,
    revoked: bool,
    successor: Option<SessionId>,
}

impl Session {
    #[must_use]
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            state: SessionState::Anonymous,
            csrf: None,
            revoked: false,
            successor: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn user_id(&self) -> Option<Uuid> {
        match self.state {
            SessionState::Authenticated(user_id) => Some(user_id),
            SessionState::Anonymous => None,
        }
    }

    /// A revoked session was destroyed while this record was still referenced.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Session that replaced this one when it was destroyed.
    #[must_use]
    pub fn successor(&self) -> Option<&SessionId> {
        self.successor.as_ref()
    }

    #[must_use]
    pub fn has_csrf_token(&self) -> bool {
        self.csrf.is_some()
    }

    pub(super) fn csrf(&self) -> Option<&TokenDigest> {
        self.csrf.as_ref()
    }

    pub(super) fn set_csrf(&mut self, digest: TokenDigest) {
        self.csrf = Some(digest);
    }

    pub(super) fn clear_csrf(&mut self) {
        self.csrf = None;
    }

    pub fn authenticate(&mut self, user_id: Uuid) {
        self.state = SessionState::Authenticated(user_id);
        // Tokens never survive a privilege change.
        self.csrf = None;
    }

    /// Reset to anonymous and mark the record dead for anyone still holding it.
    pub fn revoke(&mut self) {
        self.state = SessionState::Anonymous;
        self.csrf = None;
        self.revoked = true;
    }
}

/// Shared reference to one session record.
#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: SessionId,
    inner: Arc<AsyncMutex<Session>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            id: session.id.clone(),
            inner: Arc::new(AsyncMutex::new(session)),
        }
    }

    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Wait for exclusive access to the session.
    pub async fn lock(&self) -> OwnedMutexGuard<Session> {
        Arc::clone(&self.inner).lock_owned().await
    }
}

pub trait SessionStore: Send + Sync {
    /// Return the live session for `id`, or a new anonymous one when the id is
    /// missing, unknown or expired.
    ///
    /// # Errors
    /// Returns an error if a new session id cannot be generated.
    fn get_or_create(&self, id: Option<&str>) -> Result<SessionHandle, AuthError>;

    /// Bind the session to `user_id` and drop any pending CSRF token.
    fn set_authenticated(&self, session: &mut Session, user_id: Uuid);

    /// Revoke `session` and return the fresh anonymous session replacing it.
    ///
    /// # Errors
    /// Returns an error if a new session id cannot be generated.
    fn destroy(&self, session: &mut Session) -> Result<SessionHandle, AuthError>;

    /// Drop expired sessions, returning how many were removed.
    fn purge_expired(&self) -> usize;
}

struct Slot {
    handle: SessionHandle,
    expires_at: Instant,
}

/// In-process store with sliding idle expiry.
pub struct MemorySessionStore {
    ttl: Duration,
    sessions: Mutex<HashMap<SessionId, Slot>>,
}

impl MemorySessionStore {
    /// `ttl` is capped at `MAX_SESSION_TTL_SECONDS` so expiry deadlines stay
    /// representable as an `Instant`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(Duration::from_secs(MAX_SESSION_TTL_SECONDS)),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Critical sections never await or panic, so a poisoned map is still consistent.
    fn slots(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Slot>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert_fresh(
        &self,
        slots: &mut HashMap<SessionId, Slot>,
        now: Instant,
    ) -> Result<SessionHandle, AuthError> {
        let mut id = SessionId::generate()?;
        while slots.contains_key(&id) {
            id = SessionId::generate()?;
        }
        let handle = SessionHandle::new(Session::new(id.clone()));
        slots.insert(
            id,
            Slot {
                handle: handle.clone(),
                expires_at: now + self.ttl,
            },
        );
        debug!("created session {:?}", handle.id());
        Ok(handle)
    }
}

impl SessionStore for MemorySessionStore {
    fn get_or_create(&self, id: Option<&str>) -> Result<SessionHandle, AuthError> {
        let now = Instant::now();
        let mut slots = self.slots();

        if let Some(id) = id.filter(|id| !id.is_empty()) {
            let key = SessionId(id.to_string());
            let live = match slots.get_mut(&key) {
                Some(slot) if slot.expires_at > now => {
                    slot.expires_at = now + self.ttl;
                    Some(slot.handle.clone())
                }
                _ => None,
            };
            if let Some(handle) = live {
                return Ok(handle);
            }
            if slots.remove(&key).is_some() {
                debug!("session {:?} expired", key);
            }
        }

        self.insert_fresh(&mut slots, now)
    }

    fn set_authenticated(&self, session: &mut Session, user_id: Uuid) {
        session.authenticate(user_id);
    }

    fn destroy(&self, session: &mut Session) -> Result<SessionHandle, AuthError> {
        session.revoke();
        let mut slots = self.slots();
        slots.remove(session.id());
        let fresh = self.insert_fresh(&mut slots, Instant::now())?;
        session.successor = Some(fresh.id().clone());
        Ok(fresh)
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.slots();
        let before = slots.len();
        slots.retain(|_, slot| slot.expires_at > now);
        before - slots.len()
    }
}

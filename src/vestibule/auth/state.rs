//! Auth configuration and the shared state handed to the HTTP handlers.

use std::{sync::Arc, time::Duration};

use super::{
    machine::AuthMachine,
    session::{MemorySessionStore, SessionStore},
    verifier::CredentialVerifier,
};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
const DEFAULT_SESSION_PURGE_INTERVAL_SECONDS: u64 = 5 * 60;
/// Upper bound for the idle session lifetime (30 days).
pub const MAX_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: u64,
    session_purge_interval_seconds: u64,
    secure_cookies: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_purge_interval_seconds: DEFAULT_SESSION_PURGE_INTERVAL_SECONDS,
            secure_cookies: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: u64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_purge_interval_seconds(mut self, seconds: u64) -> Self {
        self.session_purge_interval_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Effective lifetime, clamped to `1..=MAX_SESSION_TTL_SECONDS`.
    #[must_use]
    pub fn session_ttl_seconds(&self) -> u64 {
        self.session_ttl_seconds.clamp(1, MAX_SESSION_TTL_SECONDS)
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds())
    }

    #[must_use]
    pub fn session_purge_interval(&self) -> Duration {
        // tokio intervals panic on a zero period.
        Duration::from_secs(self.session_purge_interval_seconds.max(1))
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

pub struct AuthState {
    config: AuthConfig,
    machine: AuthMachine,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, machine: AuthMachine) -> Self {
        Self { config, machine }
    }

    /// Wire the default in-memory session store to `verifier`.
    #[must_use]
    pub fn in_memory(config: AuthConfig, verifier: Arc<dyn CredentialVerifier>) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(config.session_ttl()));
        Self::new(config, AuthMachine::new(store, verifier))
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn machine(&self) -> &AuthMachine {
        &self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vestibule::auth::StaticCredentialVerifier;
    use anyhow::Result;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();
        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(
            config.session_purge_interval(),
            Duration::from_secs(DEFAULT_SESSION_PURGE_INTERVAL_SECONDS)
        );
        assert!(!config.secure_cookies());

        let config = config
            .with_session_ttl_seconds(120)
            .with_session_purge_interval_seconds(30)
            .with_secure_cookies(true);
        assert_eq!(config.session_ttl(), Duration::from_secs(120));
        assert_eq!(config.session_purge_interval(), Duration::from_secs(30));
        assert!(config.secure_cookies());
    }

    #[test]
    fn session_ttl_is_clamped() {
        let config = AuthConfig::new().with_session_ttl_seconds(0);
        assert_eq!(config.session_ttl(), Duration::from_secs(1));

        let config = AuthConfig::new().with_session_ttl_seconds(u64::MAX);
        assert_eq!(config.session_ttl_seconds(), MAX_SESSION_TTL_SECONDS);
        assert_eq!(
            config.session_ttl(),
            Duration::from_secs(MAX_SESSION_TTL_SECONDS)
        );
    }

    #[test]
    fn purge_interval_is_never_zero() {
        let config = AuthConfig::new().with_session_purge_interval_seconds(0);
        assert_eq!(config.session_purge_interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn in_memory_state_serves_sessions() -> Result<()> {
        let verifier = Arc::new(StaticCredentialVerifier::new()?);
        let state = AuthState::in_memory(AuthConfig::new(), verifier);
        let transition = state.machine().home(None).await?;
        let handle = state
            .machine()
            .store()
            .get_or_create(Some(transition.session_id.as_str()))?;
        assert_eq!(handle.id(), &transition.session_id);
        Ok(())
    }
}

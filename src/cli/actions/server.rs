use crate::{
    cli::telemetry,
    vestibule::{
        self,
        auth::{AuthConfig, AuthState, StaticCredentialVerifier},
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub session_ttl_seconds: u64,
    pub session_purge_interval_seconds: u64,
    pub secure_cookies: bool,
    pub users: Vec<(String, SecretString)>,
}

fn build_verifier(users: &[(String, SecretString)]) -> Result<StaticCredentialVerifier> {
    let mut verifier = StaticCredentialVerifier::new()?;
    for (username, password) in users {
        verifier = verifier
            .with_user(username, password)
            .with_context(|| format!("invalid user entry: {username}"))?;
        debug!("registered user {username}");
    }
    Ok(verifier)
}

fn build_state(args: &Args) -> Result<AuthState> {
    let verifier = build_verifier(&args.users)?;

    let config = AuthConfig::new()
        .with_session_ttl_seconds(args.session_ttl_seconds)
        .with_session_purge_interval_seconds(args.session_purge_interval_seconds)
        .with_secure_cookies(args.secure_cookies);

    info!(
        "{} users loaded, session ttl {}s",
        verifier.len(),
        config.session_ttl_seconds()
    );

    Ok(AuthState::in_memory(config, Arc::new(verifier)))
}

/// Execute the server action.
/// # Errors
/// Returns an error if a user cannot be registered or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_state = Arc::new(build_state(&args)?);

    let result = vestibule::new(args.port, auth_state).await;

    telemetry::shutdown_tracer();

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(users: &[(&str, &str)]) -> Args {
        Args {
            port: 8080,
            session_ttl_seconds: 60,
            session_purge_interval_seconds: 5,
            secure_cookies: true,
            users: users
                .iter()
                .map(|(u, p)| ((*u).to_string(), SecretString::from((*p).to_string())))
                .collect(),
        }
    }

    #[test]
    fn build_state_applies_config() -> Result<()> {
        let state = build_state(&args(&[("username", "password")]))?;
        assert_eq!(state.config().session_ttl_seconds(), 60);
        assert!(state.config().secure_cookies());
        Ok(())
    }

    #[test]
    fn build_verifier_registers_every_user() -> Result<()> {
        let verifier = build_verifier(&args(&[("alice", "a"), ("bob", "b")]).users)?;
        assert_eq!(verifier.len(), 2);
        assert!(verifier.user_id("alice").is_some());
        assert!(verifier.user_id("carol").is_none());
        Ok(())
    }

    #[test]
    fn build_verifier_rejects_blank_username() {
        assert!(build_verifier(&args(&[(" ", "a")]).users).is_err());
    }
}

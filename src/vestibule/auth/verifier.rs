//! Credential verification contract and the bundled in-memory implementation.

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum VerifyError {
    /// Unknown user or wrong password; callers must not be able to tell which.
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("credential verifier unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Resolve a username/password pair to a user id.
    ///
    /// # Errors
    /// `InvalidCredentials` for any mismatch, `Unavailable` when the backing
    /// lookup itself fails.
    async fn verify(&self, username: &str, password: &SecretString) -> Result<Uuid, VerifyError>;
}

struct StoredUser {
    id: Uuid,
    phc: String,
}

/// Users configured at startup, each password stored as an argon2 PHC string.
pub struct StaticCredentialVerifier {
    users: HashMap<String, StoredUser>,
    // Verified against for unknown users so both failure paths cost the same.
    dummy_phc: String,
}

impl StaticCredentialVerifier {
    /// # Errors
    /// Returns an error if the placeholder hash cannot be computed.
    pub fn new() -> Result<Self> {
        let dummy_phc = hash_password("vestibule-placeholder-password")?;
        Ok(Self {
            users: HashMap::new(),
            dummy_phc,
        })
    }

    /// Add a user, hashing the password immediately.
    ///
    /// # Errors
    /// Returns an error if the username is empty or hashing fails.
    pub fn with_user(mut self, username: &str, password: &SecretString) -> Result<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(anyhow!("username must not be empty"));
        }
        let phc = hash_password(password.expose_secret())
            .with_context(|| format!("failed to hash password for {username}"))?;
        self.users.insert(
            username.to_string(),
            StoredUser {
                id: Uuid::new_v4(),
                phc,
            },
        );
        Ok(self)
    }

    #[must_use]
    pub fn user_id(&self, username: &str) -> Option<Uuid> {
        self.users.get(username).map(|user| user.id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[cfg(test)]
    fn with_stored_hash(mut self, username: &str, phc: &str) -> Self {
        self.users.insert(
            username.to_string(),
            StoredUser {
                id: Uuid::new_v4(),
                phc: phc.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl CredentialVerifier for StaticCredentialVerifier {
    async fn verify(&self, username: &str, password: &SecretString) -> Result<Uuid, VerifyError> {
        let (phc, user_id) = match self.users.get(username) {
            Some(user) => (user.phc.clone(), Some(user.id)),
            None => (self.dummy_phc.clone(), None),
        };
        let password = SecretString::from(password.expose_secret().to_owned());

        // argon2 is deliberately slow; keep it off the async workers.
        let matched =
            tokio::task::spawn_blocking(move || verify_password(&phc, password.expose_secret()))
                .await
                .map_err(|err| VerifyError::Unavailable(format!("verifier task failed: {err}")))??;

        match (matched, user_id) {
            (true, Some(user_id)) => Ok(user_id),
            _ => {
                debug!("credential mismatch");
                Err(VerifyError::InvalidCredentials)
            }
        }
    }
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut salt_bytes)
        .context("failed to generate password salt")?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

fn verify_password(phc: &str, password: &str) -> Result<bool, VerifyError> {
    let parsed = PasswordHash::new(phc)
        .map_err(|err| VerifyError::Unavailable(format!("stored hash is malformed: {err}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(err) => Err(VerifyError::Unavailable(err.to_string())),
    }
}

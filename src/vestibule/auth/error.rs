use thiserror::Error;

/// Failures that abort a request instead of producing a [`super::Transition`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credential verifier unavailable: {0}")]
    VerifierUnavailable(String),
    #[error("failed to gather randomness: {0}")]
    Entropy(#[from] rand::Error),
}

//! Random identifiers for sessions and CSRF tokens.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

const RANDOM_BYTES: usize = 32;

/// 32 bytes from the OS RNG, base64url encoded without padding.
///
/// Used for both session ids and CSRF tokens; neither is derivable from the other.
pub(super) fn random_token() -> Result<String, rand::Error> {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_token_decodes_to_32_bytes() -> anyhow::Result<()> {
        let token = random_token()?;
        let decoded = Base64UrlUnpadded::decode_vec(&token)
            .map_err(|err| anyhow::anyhow!("decode random token: {err}"))?;
        assert_eq!(decoded.len(), RANDOM_BYTES);
        Ok(())
    }

    #[test]
    fn random_token_is_url_safe() -> anyhow::Result<()> {
        let token = random_token()?;
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        Ok(())
    }

    #[test]
    fn random_tokens_differ() -> anyhow::Result<()> {
        assert_ne!(random_token()?, random_token()?);
        Ok(())
    }
}

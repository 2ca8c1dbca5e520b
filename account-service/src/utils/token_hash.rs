use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Keyed one-way transform for refresh tokens at rest.
///
/// Only `hash_token(raw)` is ever persisted, so a copy of the sessions table
/// is useless without the process secret.
#[derive(Clone)]
pub struct TokenHasher {
    mac: HmacSha256,
}

impl TokenHasher {
    pub fn new(secret: &str) -> Result<Self, anyhow::Error> {
        if secret.is_empty() {
            return Err(anyhow::anyhow!("Token hash secret must not be empty"));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
        Ok(Self { mac })
    }

    /// HMAC-SHA256 of the raw token, hex encoded.
    pub fn hash_token(&self, raw_token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(raw_token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Recompute and compare in constant time. Length mismatch is a plain
    /// non-match.
    pub fn verify_token_hash(&self, stored_hash: &str, raw_token: &str) -> bool {
        let expected = self.hash_token(raw_token);
        let expected_bytes = expected.as_bytes();
        let stored_bytes = stored_hash.as_bytes();

        if expected_bytes.len() != stored_bytes.len() {
            return false;
        }

        expected_bytes.ct_eq(stored_bytes).into()
    }
}

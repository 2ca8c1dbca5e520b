use std::fmt;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Newtype for password to prevent accidental logging
#[derive(Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Newtype for password hash (PHC string)
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Salted one-way password hashing with a constant-time verifier.
///
/// Argon2id runs on the blocking pool so request workers are never stalled.
/// Verification never errors: a malformed hash, a wrong password and a
/// missing user are all just `false`.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy_hash: Arc<str>,
}

impl CredentialHasher {
    /// Argon2id with the library's default cost.
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_argon2(Argon2::default())
    }

    /// Explicit cost parameters (memory KiB, iterations, lanes).
    pub fn with_cost(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, anyhow::Error> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))?;
        Self::from_argon2(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn from_argon2(argon2: Argon2<'static>) -> Result<Self, anyhow::Error> {
        // Verified against when the user does not exist, so both paths cost the same.
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"account-service-dummy-password", &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();

        Ok(Self {
            argon2,
            dummy_hash: Arc::from(dummy_hash),
        })
    }

    /// Hash a password with a fresh random salt.
    pub async fn hash(&self, password: &Password) -> Result<PasswordHashString, anyhow::Error> {
        let argon2 = self.argon2.clone();
        let password = password.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_str().as_bytes(), &salt)
                .map(|hash| PasswordHashString::new(hash.to_string()))
                .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        })
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))?
    }

    /// Check a password against a stored hash. Salt and cost come from the
    /// hash itself.
    pub async fn verify(&self, password: &Password, password_hash: &PasswordHashString) -> bool {
        let argon2 = self.argon2.clone();
        let password = password.clone();
        let password_hash = password_hash.as_str().to_string();

        tokio::task::spawn_blocking(move || verify_blocking(&argon2, &password, &password_hash))
            .await
            .unwrap_or(false)
    }

    /// Burn one verification against a throwaway hash. Always `false`.
    pub async fn verify_absent(&self, password: &Password) -> bool {
        let dummy = PasswordHashString::new(self.dummy_hash.to_string());
        let _ = self.verify(password, &dummy).await;
        false
    }
}

fn verify_blocking(argon2: &Argon2<'_>, password: &Password, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => argon2
            .verify_password(password.as_str().as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

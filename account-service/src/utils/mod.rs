pub mod password;
pub mod slug;
pub mod token_hash;
pub mod validation;

pub use password::{CredentialHasher, Password, PasswordHashString};
pub use slug::{build_suggestions, generate_slug};
pub use token_hash::TokenHasher;
pub use validation::ValidatedJson;

/// Lowercase and trim an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
